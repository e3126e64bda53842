//! Menu, action, and resource row access.

use crate::error::Result;
use crate::schema::{Menu, MenuAction, MenuActionResource, Status};
use sqlx::PgConnection;

/// Fetch menus by id. `status` narrows the result; pass `None` to fetch rows
/// regardless of status (the ancestor backfill needs disabled parents too).
pub async fn find_by_ids(
    conn: &mut PgConnection,
    ids: &[String],
    status: Option<Status>,
) -> Result<Vec<Menu>> {
    let menus = match status {
        Some(status) => {
            sqlx::query_as::<_, Menu>(
                "SELECT id, parent_id, name, icon, router, sequence, status, created_at, updated_at
                 FROM menus WHERE id = ANY($1) AND status = $2",
            )
            .bind(ids)
            .bind(status)
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, Menu>(
                "SELECT id, parent_id, name, icon, router, sequence, status, created_at, updated_at
                 FROM menus WHERE id = ANY($1)",
            )
            .bind(ids)
            .fetch_all(conn)
            .await?
        }
    };
    Ok(menus)
}

pub async fn list_enabled(conn: &mut PgConnection) -> Result<Vec<Menu>> {
    let menus = sqlx::query_as::<_, Menu>(
        "SELECT id, parent_id, name, icon, router, sequence, status, created_at, updated_at
         FROM menus WHERE status = $1",
    )
    .bind(Status::Enabled)
    .fetch_all(conn)
    .await?;
    Ok(menus)
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

pub async fn actions_by_ids(
    conn: &mut PgConnection,
    action_ids: &[String],
) -> Result<Vec<MenuAction>> {
    let actions = sqlx::query_as::<_, MenuAction>(
        "SELECT id, menu_id, code, name FROM menu_actions WHERE id = ANY($1)",
    )
    .bind(action_ids)
    .fetch_all(conn)
    .await?;
    Ok(actions)
}

pub async fn all_actions(conn: &mut PgConnection) -> Result<Vec<MenuAction>> {
    let actions =
        sqlx::query_as::<_, MenuAction>("SELECT id, menu_id, code, name FROM menu_actions")
            .fetch_all(conn)
            .await?;
    Ok(actions)
}

// ─────────────────────────────────────────────────────────────────────────────
// Action resources
// ─────────────────────────────────────────────────────────────────────────────

pub async fn all_resources(conn: &mut PgConnection) -> Result<Vec<MenuActionResource>> {
    let resources = sqlx::query_as::<_, MenuActionResource>(
        "SELECT id, action_id, method, path FROM menu_action_resources",
    )
    .fetch_all(conn)
    .await?;
    Ok(resources)
}
