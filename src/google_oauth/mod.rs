//! Service-account token acquisition: PEM decoding, RS256 assertions,
//! credential precedence and the JWT-bearer token exchange.

pub mod credentials;
pub mod endpoints;
pub mod jwt;
pub mod pem;
pub mod service;

pub use credentials::{ScopeFamily, ServiceAccountCredential};
pub use endpoints::AccessToken;
pub use service::{GoogleAuth, mask_secret};
