pub mod clarity;
pub mod ga4;
pub mod pagespeed;
pub mod search_console;
pub mod sync;
