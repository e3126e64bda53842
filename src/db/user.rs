//! User and user-role row access.

use crate::error::Result;
use crate::schema::{User, UserRole};
use sqlx::PgConnection;

pub async fn find_by_id(conn: &mut PgConnection, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, user_name, real_name, password, status, created_at, updated_at
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

pub async fn find_by_user_name(conn: &mut PgConnection, user_name: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, user_name, real_name, password, status, created_at, updated_at
         FROM users WHERE user_name = $1",
    )
    .bind(user_name)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

pub async fn update_password(conn: &mut PgConnection, id: &str, digest: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(digest)
        .execute(conn)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// User-role bindings
// ─────────────────────────────────────────────────────────────────────────────

pub async fn roles_for_user(conn: &mut PgConnection, user_id: &str) -> Result<Vec<UserRole>> {
    let bindings = sqlx::query_as::<_, UserRole>(
        "SELECT id, user_id, role_id FROM user_roles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(bindings)
}

pub async fn all_bindings(conn: &mut PgConnection) -> Result<Vec<UserRole>> {
    let bindings =
        sqlx::query_as::<_, UserRole>("SELECT id, user_id, role_id FROM user_roles")
            .fetch_all(conn)
            .await?;
    Ok(bindings)
}

/// How many users hold the role. Used as the delete guard.
pub async fn count_with_role(conn: &mut PgConnection, role_id: &str) -> Result<i64> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_roles WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(conn)
            .await?;
    Ok(count.0)
}
