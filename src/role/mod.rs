//! Role lifecycle and grant management.
//!
//! Every mutation follows the same sequence: validate, apply inside one
//! transaction, commit, then ask the synchronizer to republish the policy
//! snapshot. The reload happens strictly after commit so the engine never
//! serves rules for uncommitted data; a reload failure leaves the data
//! change durable and surfaces as a backend error the operator can resolve
//! by re-triggering a reload.

use crate::db::{self, Database};
use crate::error::{GateError, Result};
use crate::policy::PolicySynchronizer;
use crate::schema::{self, Role, RoleMenu, Status};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

// ═══════════════════════════════════════════════════════════════════════════════
// Inputs and Diff
// ═══════════════════════════════════════════════════════════════════════════════

/// Caller-supplied role fields.
#[derive(Debug, Clone)]
pub struct RoleInput {
    pub name: String,
    pub memo: Option<String>,
    pub sequence: i32,
    pub status: Status,
}

/// A desired grant, identified by `(menu_id, action_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub menu_id: String,
    pub action_id: String,
}

/// Outcome of comparing stored grants against the desired set.
#[derive(Debug, Default)]
pub struct GrantDiff {
    /// Desired grants with no stored counterpart.
    pub additions: Vec<Grant>,
    /// Stored rows with no desired counterpart; carried whole so the delete
    /// can target the row id.
    pub deletions: Vec<RoleMenu>,
}

/// Symmetric diff in a single pass over each side.
///
/// Unchanged grants appear in neither list, so their row ids survive an
/// update untouched.
pub fn diff_grants(existing: &[RoleMenu], desired: &[Grant]) -> GrantDiff {
    let mut remaining: HashMap<(&str, &str), &RoleMenu> = existing
        .iter()
        .map(|row| ((row.menu_id.as_str(), row.action_id.as_str()), row))
        .collect();

    let mut additions = Vec::new();
    for grant in desired {
        if remaining
            .remove(&(grant.menu_id.as_str(), grant.action_id.as_str()))
            .is_none()
        {
            additions.push(grant.clone());
        }
    }

    GrantDiff {
        additions,
        deletions: remaining.into_values().cloned().collect(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Role mutations with commit-then-reload sequencing.
pub struct RoleService {
    db: Database,
    sync: Arc<PolicySynchronizer>,
}

impl RoleService {
    pub fn new(db: Database, sync: Arc<PolicySynchronizer>) -> Self {
        Self { db, sync }
    }

    /// Create a role with its initial grants.
    pub async fn create(&self, input: RoleInput, grants: Vec<Grant>) -> Result<Role> {
        let mut tx = self.db.begin().await?;

        if db::role::find_by_name(&mut tx, &input.name).await?.is_some() {
            return Err(GateError::duplicate_name(&input.name));
        }

        let now = Utc::now();
        let role = Role {
            id: schema::new_id(),
            name: input.name,
            memo: input.memo,
            sequence: input.sequence,
            status: input.status,
            created_at: now,
            updated_at: now,
        };
        db::role::insert(&mut tx, &role).await?;

        for grant in &grants {
            let row = RoleMenu {
                id: schema::new_id(),
                role_id: role.id.clone(),
                menu_id: grant.menu_id.clone(),
                action_id: grant.action_id.clone(),
            };
            db::role::insert_grant(&mut tx, &row).await?;
        }

        tx.commit().await?;
        self.sync.reload().await?;

        info!(role_id = %role.id, grants = grants.len(), "role created");
        Ok(role)
    }

    /// Update a role's fields and replace its grant set.
    ///
    /// Grants shared between the stored and desired sets keep their rows;
    /// only the symmetric difference touches storage.
    pub async fn update(&self, id: &str, input: RoleInput, grants: Vec<Grant>) -> Result<Role> {
        let mut tx = self.db.begin().await?;

        let current = db::role::find_by_id(&mut tx, id)
            .await?
            .ok_or_else(|| GateError::not_found("role"))?;

        // Name uniqueness is re-checked only when the name actually changes.
        if current.name != input.name
            && db::role::find_by_name(&mut tx, &input.name).await?.is_some()
        {
            return Err(GateError::duplicate_name(&input.name));
        }

        let existing = db::role::grants_for_role(&mut tx, id).await?;
        let diff = diff_grants(&existing, &grants);

        for grant in &diff.additions {
            let row = RoleMenu {
                id: schema::new_id(),
                role_id: id.to_string(),
                menu_id: grant.menu_id.clone(),
                action_id: grant.action_id.clone(),
            };
            db::role::insert_grant(&mut tx, &row).await?;
        }
        for row in &diff.deletions {
            db::role::delete_grant(&mut tx, &row.id).await?;
        }

        let updated = Role {
            id: id.to_string(),
            name: input.name,
            memo: input.memo,
            sequence: input.sequence,
            status: input.status,
            created_at: current.created_at,
            updated_at: Utc::now(),
        };
        db::role::update(&mut tx, &updated).await?;

        tx.commit().await?;
        self.sync.reload().await?;

        info!(
            role_id = %id,
            added = diff.additions.len(),
            removed = diff.deletions.len(),
            "role updated"
        );
        Ok(updated)
    }

    /// Delete a role and its grants. Refused while any user holds the role;
    /// the count runs inside the delete transaction so a concurrent
    /// assignment cannot slip between check and delete.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.db.begin().await?;

        if db::role::find_by_id(&mut tx, id).await?.is_none() {
            return Err(GateError::not_found("role"));
        }
        if db::user::count_with_role(&mut tx, id).await? > 0 {
            return Err(GateError::role_in_use());
        }

        db::role::delete_grants_for_role(&mut tx, id).await?;
        db::role::delete(&mut tx, id).await?;

        tx.commit().await?;
        self.sync.reload().await?;

        info!(role_id = %id, "role deleted");
        Ok(())
    }

    /// Flip a role's status.
    pub async fn update_status(&self, id: &str, status: Status) -> Result<()> {
        let mut tx = self.db.begin().await?;

        if db::role::find_by_id(&mut tx, id).await?.is_none() {
            return Err(GateError::not_found("role"));
        }
        db::role::update_status(&mut tx, id, status).await?;

        tx.commit().await?;
        self.sync.reload().await?;
        Ok(())
    }

    /// A role with its grants, for edit screens.
    pub async fn get(&self, id: &str) -> Result<(Role, Vec<RoleMenu>)> {
        let mut conn = self.db.acquire().await?;
        let role = db::role::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| GateError::not_found("role"))?;
        let grants = db::role::grants_for_role(&mut conn, id).await?;
        Ok((role, grants))
    }

    /// List roles, optionally narrowed by status.
    pub async fn list(&self, status: Option<Status>) -> Result<Vec<Role>> {
        let mut conn = self.db.acquire().await?;
        db::role::list(&mut conn, status).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
