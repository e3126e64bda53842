//! Role and grant row access.
//!
//! Grant rows (`role_menus`) are the role→(menu, action) edges. The table
//! carries a unique index on `(role_id, menu_id, action_id)`, so duplicate
//! grants are impossible even under concurrent writers.

use crate::error::Result;
use crate::schema::{Role, RoleMenu, Status};
use sqlx::PgConnection;

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

pub async fn find_by_id(conn: &mut PgConnection, id: &str) -> Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, memo, sequence, status, created_at, updated_at
         FROM roles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(role)
}

pub async fn find_by_name(conn: &mut PgConnection, name: &str) -> Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, memo, sequence, status, created_at, updated_at
         FROM roles WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?;
    Ok(role)
}

pub async fn list(conn: &mut PgConnection, status: Option<Status>) -> Result<Vec<Role>> {
    let roles = match status {
        Some(status) => {
            sqlx::query_as::<_, Role>(
                "SELECT id, name, memo, sequence, status, created_at, updated_at
                 FROM roles WHERE status = $1
                 ORDER BY sequence DESC, id",
            )
            .bind(status)
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, Role>(
                "SELECT id, name, memo, sequence, status, created_at, updated_at
                 FROM roles ORDER BY sequence DESC, id",
            )
            .fetch_all(conn)
            .await?
        }
    };
    Ok(roles)
}

pub async fn insert(conn: &mut PgConnection, role: &Role) -> Result<()> {
    sqlx::query(
        "INSERT INTO roles (id, name, memo, sequence, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(&role.id)
    .bind(&role.name)
    .bind(&role.memo)
    .bind(role.sequence)
    .bind(role.status)
    .bind(role.created_at)
    .bind(role.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update(conn: &mut PgConnection, role: &Role) -> Result<()> {
    sqlx::query(
        "UPDATE roles SET name = $2, memo = $3, sequence = $4, status = $5, updated_at = $6
         WHERE id = $1",
    )
    .bind(&role.id)
    .bind(&role.name)
    .bind(&role.memo)
    .bind(role.sequence)
    .bind(role.status)
    .bind(role.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_status(conn: &mut PgConnection, id: &str, status: Status) -> Result<()> {
    sqlx::query("UPDATE roles SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut PgConnection, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Grants
// ─────────────────────────────────────────────────────────────────────────────

pub async fn grants_for_role(conn: &mut PgConnection, role_id: &str) -> Result<Vec<RoleMenu>> {
    let grants = sqlx::query_as::<_, RoleMenu>(
        "SELECT id, role_id, menu_id, action_id FROM role_menus WHERE role_id = $1",
    )
    .bind(role_id)
    .fetch_all(conn)
    .await?;
    Ok(grants)
}

pub async fn grants_for_roles(
    conn: &mut PgConnection,
    role_ids: &[String],
) -> Result<Vec<RoleMenu>> {
    let grants = sqlx::query_as::<_, RoleMenu>(
        "SELECT id, role_id, menu_id, action_id FROM role_menus WHERE role_id = ANY($1)",
    )
    .bind(role_ids)
    .fetch_all(conn)
    .await?;
    Ok(grants)
}

pub async fn all_grants(conn: &mut PgConnection) -> Result<Vec<RoleMenu>> {
    let grants = sqlx::query_as::<_, RoleMenu>(
        "SELECT id, role_id, menu_id, action_id FROM role_menus",
    )
    .fetch_all(conn)
    .await?;
    Ok(grants)
}

pub async fn insert_grant(conn: &mut PgConnection, grant: &RoleMenu) -> Result<()> {
    sqlx::query(
        "INSERT INTO role_menus (id, role_id, menu_id, action_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(&grant.id)
    .bind(&grant.role_id)
    .bind(&grant.menu_id)
    .bind(&grant.action_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_grant(conn: &mut PgConnection, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM role_menus WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_grants_for_role(conn: &mut PgConnection, role_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
        .bind(role_id)
        .execute(conn)
        .await?;
    Ok(())
}
