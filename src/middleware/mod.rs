pub mod auth;
pub mod cors;
pub mod sync_request;

pub use auth::RequireSyncKey;
pub use sync_request::SyncInvocation;
