//! Domain entities shared across the crate.
//!
//! Identifiers are strings minted from UUIDv4 at creation time. Row structs
//! derive `sqlx::FromRow` and map one-to-one onto the tables in
//! `migrations/0001_init.sql`.

pub mod tree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Mint a new entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Row status shared by users, roles, and menus.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i16)]
pub enum Status {
    Enabled = 1,
    Disabled = 2,
}

impl Status {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Status::Enabled)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Users and Roles
// ═══════════════════════════════════════════════════════════════════════════════

/// A stored user account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub real_name: String,
    /// Hex-encoded password digest. Never serialized to clients.
    #[serde(skip_serializing)]
    pub password: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Binding between a user and a role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    pub id: String,
    pub user_id: String,
    pub role_id: String,
}

/// A role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[sqlx(default)]
    pub memo: Option<String>,
    /// Display ordering weight, larger sorts first.
    pub sequence: i32,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A grant row: role → (menu, action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoleMenu {
    pub id: String,
    pub role_id: String,
    pub menu_id: String,
    pub action_id: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Menus
// ═══════════════════════════════════════════════════════════════════════════════

/// A navigation menu node.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Menu {
    pub id: String,
    /// Parent node id; `None` for top-level entries.
    pub parent_id: Option<String>,
    pub name: String,
    #[sqlx(default)]
    pub icon: Option<String>,
    #[sqlx(default)]
    pub router: Option<String>,
    /// Display ordering weight, larger sorts first.
    pub sequence: i32,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An action attached to a menu (e.g. add, edit, del, query).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuAction {
    pub id: String,
    pub menu_id: String,
    /// Short action code, unique within the menu.
    pub code: String,
    pub name: String,
}

/// An HTTP resource an action maps to. These rows are the raw material for
/// the enforcement rule set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuActionResource {
    pub id: String,
    pub action_id: String,
    /// HTTP method, uppercase.
    pub method: String,
    /// Path pattern; `:param` segments and a trailing `*` are supported.
    pub path: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Token
// ═══════════════════════════════════════════════════════════════════════════════

/// Issued-token envelope returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub token_type: String,
    /// Absolute expiry as a Unix timestamp.
    pub expires_at: i64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Superuser
// ═══════════════════════════════════════════════════════════════════════════════

/// The reserved superuser identity, resolved from configuration.
///
/// The superuser never exists in the user table; its id is a fixed sentinel
/// so that `is` works on ids recovered from tokens.
#[derive(Debug, Clone)]
pub struct Superuser {
    pub user_name: String,
    pub password: String,
    pub real_name: String,
}

/// Sentinel id carried in tokens issued to the superuser.
pub const SUPERUSER_ID: &str = "root";

impl Superuser {
    pub fn from_config(config: &crate::config::SuperuserConfig) -> Self {
        Self {
            user_name: config.user_name.clone(),
            password: config.password.clone(),
            real_name: config.real_name.clone(),
        }
    }

    /// Whether the given subject id is the superuser.
    pub fn is(&self, user_id: &str) -> bool {
        user_id == SUPERUSER_ID
    }
}
