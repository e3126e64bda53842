//! # gatekit
//!
//! Authorization and permission resolution core for an administrative
//! backend. The crate covers five concerns:
//!
//! - **Token store** ([`auth::store`]): pluggable validity store for issued
//!   tokens (in-memory or Redis), making revocation effective before JWT
//!   expiry.
//! - **Token service** ([`auth`]): HMAC-signed JWT issue/parse/revoke
//!   bridged to the store.
//! - **Roles and grants** ([`role`], [`db`]): transactional role lifecycle
//!   with a linear-pass grant diff and explicit transaction-handle
//!   threading.
//! - **Policy engine** ([`policy`]): immutable rule snapshot swapped
//!   atomically after each committed mutation; `enforce(subject, path,
//!   method)` decisions.
//! - **Menu resolution** ([`account`]): per-user navigation tree with
//!   ancestor backfill and superuser bypass.
//!
//! HTTP glue lives in [`middleware`]: a bearer-token authentication layer
//! and a policy-enforcement layer in the tower `Layer`/`Service` idiom.

pub mod account;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod role;
pub mod schema;
pub mod telemetry;

pub use account::AccountService;
pub use auth::{JwtAuth, MemoryStore, RedisStore, TokenStore};
pub use config::Config;
pub use db::Database;
pub use error::{ErrorCode, GateError, Result};
pub use middleware::{AuthLayer, CurrentUser, EnforceLayer};
pub use policy::{PolicyEngine, PolicySnapshot, PolicySynchronizer};
pub use role::{Grant, RoleService};
pub use schema::{Status, Superuser, TokenInfo};
