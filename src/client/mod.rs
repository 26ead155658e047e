pub mod api;
pub mod mirror;

pub use api::{ApiClient, ClientError};
pub use mirror::{CartBackend, CartMirror, PendingChange};
