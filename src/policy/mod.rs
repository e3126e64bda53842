//! Policy engine and synchronizer.
//!
//! The engine answers `enforce(subject, path, method)` from an immutable
//! in-memory [`PolicySnapshot`]. Writers never mutate a published snapshot:
//! the synchronizer rebuilds a fresh one from storage and swaps it in behind
//! a `parking_lot::RwLock<Arc<_>>`, so concurrent readers observe either the
//! old rule set or the new one, never a mixture.
//!
//! Rules are `(role, path pattern, method)` triples derived from grants
//! joined to their HTTP resources; subjects map to roles through the
//! user-role bindings read in the same pass.

use crate::db::{self, Database};
use crate::error::Result;
use crate::schema::{MenuActionResource, RoleMenu, Superuser, UserRole};
use metrics::counter;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════════
// Snapshot
// ═══════════════════════════════════════════════════════════════════════════════

/// A single allow rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    /// Path pattern. `:param` segments match any one segment; a trailing `*`
    /// matches the remainder of the path.
    pub path: String,
    /// HTTP method, uppercase, or `*` for any.
    pub method: String,
}

/// Immutable rule set. Built once, swapped atomically, never mutated.
#[derive(Debug, Default)]
pub struct PolicySnapshot {
    /// role id → allow rules.
    rules: HashMap<String, Vec<PolicyRule>>,
    /// user id → role ids.
    bindings: HashMap<String, Vec<String>>,
}

impl PolicySnapshot {
    /// Assemble a snapshot from raw storage rows.
    pub fn build(
        grants: &[RoleMenu],
        resources: &[MenuActionResource],
        bindings: &[UserRole],
    ) -> Self {
        let mut by_action: HashMap<&str, Vec<&MenuActionResource>> = HashMap::new();
        for resource in resources {
            by_action.entry(&resource.action_id).or_default().push(resource);
        }

        let mut rules: HashMap<String, Vec<PolicyRule>> = HashMap::new();
        for grant in grants {
            if let Some(action_resources) = by_action.get(grant.action_id.as_str()) {
                let role_rules = rules.entry(grant.role_id.clone()).or_default();
                for resource in action_resources {
                    let rule = PolicyRule {
                        path: resource.path.clone(),
                        method: resource.method.to_uppercase(),
                    };
                    if !role_rules.contains(&rule) {
                        role_rules.push(rule);
                    }
                }
            }
        }

        let mut binding_map: HashMap<String, Vec<String>> = HashMap::new();
        for binding in bindings {
            binding_map
                .entry(binding.user_id.clone())
                .or_default()
                .push(binding.role_id.clone());
        }

        Self {
            rules,
            bindings: binding_map,
        }
    }

    /// Total rule count across roles.
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    fn allows(&self, subject: &str, path: &str, method: &str) -> bool {
        let Some(role_ids) = self.bindings.get(subject) else {
            return false;
        };
        let method = method.to_uppercase();
        role_ids.iter().any(|role_id| {
            self.rules
                .get(role_id)
                .map(|rules| {
                    rules.iter().any(|rule| {
                        (rule.method == "*" || rule.method == method)
                            && path_matches(&rule.path, path)
                    })
                })
                .unwrap_or(false)
        })
    }
}

/// Segment-wise path pattern match.
fn path_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.trim_matches('/').split('/');
    let mut path_segments = path.trim_matches('/').split('/');

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (Some("*"), _) => return true,
            (Some(p), Some(s)) => {
                if !(p.starts_with(':') || p == s) {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared policy decision point.
pub struct PolicyEngine {
    snapshot: RwLock<Arc<PolicySnapshot>>,
    superuser: Superuser,
}

impl PolicyEngine {
    /// Start with an empty snapshot: everything except the superuser denied
    /// until the first reload publishes rules.
    pub fn new(superuser: Superuser) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(PolicySnapshot::default())),
            superuser,
        }
    }

    /// Whether `subject` may call `method path`.
    pub fn enforce(&self, subject: &str, path: &str, method: &str) -> bool {
        if self.superuser.is(subject) {
            return true;
        }
        let snapshot = self.snapshot.read().clone();
        let allowed = snapshot.allows(subject, path, method);
        counter!(
            "gatekit_policy_decisions_total",
            "decision" => if allowed { "allow" } else { "deny" },
        )
        .increment(1);
        allowed
    }

    /// Publish a new snapshot. Readers holding the old `Arc` finish their
    /// decision against the old rules.
    pub fn swap(&self, snapshot: PolicySnapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.snapshot.read().clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Synchronizer
// ═══════════════════════════════════════════════════════════════════════════════

/// Rebuilds the snapshot from storage. Called after every committed grant
/// mutation and once at startup.
pub struct PolicySynchronizer {
    db: Database,
    engine: Arc<PolicyEngine>,
}

impl PolicySynchronizer {
    pub fn new(db: Database, engine: Arc<PolicyEngine>) -> Self {
        Self { db, engine }
    }

    /// Full re-read and atomic swap. Idempotent; safe to re-trigger after a
    /// failure.
    pub async fn reload(&self) -> Result<()> {
        let mut conn = self.db.acquire().await?;

        let grants = db::role::all_grants(&mut conn).await?;
        let resources = db::menu::all_resources(&mut conn).await?;
        let bindings = db::user::all_bindings(&mut conn).await?;

        let snapshot = PolicySnapshot::build(&grants, &resources, &bindings);
        let rule_count = snapshot.rule_count();
        self.engine.swap(snapshot);

        counter!("gatekit_policy_reloads_total").increment(1);
        info!(rules = rule_count, grants = grants.len(), "policy snapshot reloaded");
        debug!(bindings = bindings.len(), "subject bindings refreshed");
        Ok(())
    }

    /// The engine this synchronizer feeds.
    pub fn engine(&self) -> Arc<PolicyEngine> {
        self.engine.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn superuser() -> Superuser {
        Superuser {
            user_name: "root".into(),
            password: String::new(),
            real_name: "Administrator".into(),
        }
    }

    fn grant(role: &str, menu: &str, action: &str) -> RoleMenu {
        RoleMenu {
            id: format!("{}-{}-{}", role, menu, action),
            role_id: role.into(),
            menu_id: menu.into(),
            action_id: action.into(),
        }
    }

    fn resource(action: &str, method: &str, path: &str) -> MenuActionResource {
        MenuActionResource {
            id: format!("{}-{}", action, method),
            action_id: action.into(),
            method: method.into(),
            path: path.into(),
        }
    }

    fn binding(user: &str, role: &str) -> UserRole {
        UserRole {
            id: format!("{}-{}", user, role),
            user_id: user.into(),
            role_id: role.into(),
        }
    }

    fn engine_with(
        grants: &[RoleMenu],
        resources: &[MenuActionResource],
        bindings: &[UserRole],
    ) -> PolicyEngine {
        let engine = PolicyEngine::new(superuser());
        engine.swap(PolicySnapshot::build(grants, resources, bindings));
        engine
    }

    #[test]
    fn test_path_matches_exact_and_param() {
        assert!(path_matches("/api/v1/users", "/api/v1/users"));
        assert!(path_matches("/api/v1/users/:id", "/api/v1/users/42"));
        assert!(!path_matches("/api/v1/users/:id", "/api/v1/users"));
        assert!(!path_matches("/api/v1/users", "/api/v1/roles"));
    }

    #[test]
    fn test_path_matches_trailing_wildcard() {
        assert!(path_matches("/api/v1/menus/*", "/api/v1/menus/1/actions"));
        assert!(path_matches("/api/*", "/api/v1/anything/at/all"));
        assert!(!path_matches("/api/v1/menus/*/deep", "/api/v1/menus/x/deep"));
    }

    #[test]
    fn test_enforce_allows_granted_rule() {
        let engine = engine_with(
            &[grant("r1", "m1", "a1")],
            &[resource("a1", "GET", "/api/v1/users")],
            &[binding("alice", "r1")],
        );
        assert!(engine.enforce("alice", "/api/v1/users", "GET"));
        assert!(!engine.enforce("alice", "/api/v1/users", "POST"));
        assert!(!engine.enforce("alice", "/api/v1/roles", "GET"));
    }

    #[test]
    fn test_enforce_denies_unbound_subject() {
        let engine = engine_with(
            &[grant("r1", "m1", "a1")],
            &[resource("a1", "GET", "/api/v1/users")],
            &[binding("alice", "r1")],
        );
        assert!(!engine.enforce("bob", "/api/v1/users", "GET"));
    }

    #[test]
    fn test_superuser_always_allowed() {
        let engine = PolicyEngine::new(superuser());
        assert!(engine.enforce(crate::schema::SUPERUSER_ID, "/anything", "DELETE"));
    }

    #[test]
    fn test_empty_snapshot_denies_everyone_else() {
        let engine = PolicyEngine::new(superuser());
        assert!(!engine.enforce("alice", "/api/v1/users", "GET"));
    }

    #[test]
    fn test_method_match_is_case_insensitive() {
        let engine = engine_with(
            &[grant("r1", "m1", "a1")],
            &[resource("a1", "get", "/api/v1/users")],
            &[binding("alice", "r1")],
        );
        assert!(engine.enforce("alice", "/api/v1/users", "get"));
        assert!(engine.enforce("alice", "/api/v1/users", "GET"));
    }

    #[test]
    fn test_wildcard_method() {
        let engine = engine_with(
            &[grant("r1", "m1", "a1")],
            &[resource("a1", "*", "/api/v1/users")],
            &[binding("alice", "r1")],
        );
        assert!(engine.enforce("alice", "/api/v1/users", "PATCH"));
    }

    #[test]
    fn test_swap_is_visible_to_subsequent_enforce() {
        let engine = engine_with(
            &[grant("r1", "m1", "a1")],
            &[resource("a1", "GET", "/api/v1/users")],
            &[binding("alice", "r1")],
        );
        assert!(engine.enforce("alice", "/api/v1/users", "GET"));

        // Revoke by publishing a snapshot without the grant.
        engine.swap(PolicySnapshot::build(&[], &[], &[binding("alice", "r1")]));
        assert!(!engine.enforce("alice", "/api/v1/users", "GET"));
    }

    #[test]
    fn test_grant_without_resources_contributes_no_rules() {
        let snapshot = PolicySnapshot::build(
            &[grant("r1", "m1", "a1")],
            &[],
            &[binding("alice", "r1")],
        );
        assert_eq!(snapshot.rule_count(), 0);
    }

    #[test]
    fn test_duplicate_rules_deduplicated() {
        // Two grants on different menus sharing an action produce one rule.
        let snapshot = PolicySnapshot::build(
            &[grant("r1", "m1", "a1"), grant("r1", "m2", "a1")],
            &[resource("a1", "GET", "/api/v1/users")],
            &[],
        );
        assert_eq!(snapshot.rule_count(), 1);
    }
}
