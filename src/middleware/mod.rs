//! HTTP middleware: token authentication and policy enforcement.

pub mod auth;
pub mod enforce;

pub use auth::{AuthLayer, CurrentUser};
pub use enforce::EnforceLayer;
