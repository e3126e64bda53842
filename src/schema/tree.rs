//! Menu tree assembly.
//!
//! Pure functions that turn flat menu rows into a hierarchy. Ordering is by
//! `sequence` descending and the sort is stable, so rows sharing a sequence
//! keep their input order. A node whose parent is absent from the input set
//! becomes a root, which is what makes ancestor backfill (done by the caller)
//! sufficient to produce a fully-rooted tree.

use super::{Menu, MenuAction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A menu node with its actions and children attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub icon: Option<String>,
    pub router: Option<String>,
    pub sequence: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<MenuAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    fn from_menu(menu: Menu, actions: Vec<MenuAction>) -> Self {
        Self {
            id: menu.id,
            parent_id: menu.parent_id,
            name: menu.name,
            icon: menu.icon,
            router: menu.router,
            sequence: menu.sequence,
            actions,
            children: Vec::new(),
        }
    }
}

/// Build the tree from flat rows.
///
/// `actions_by_menu` carries only the actions the caller wants attached; a
/// menu with no entry gets an empty action list.
pub fn build_tree(
    mut menus: Vec<Menu>,
    mut actions_by_menu: HashMap<String, Vec<MenuAction>>,
) -> Vec<MenuNode> {
    // Stable descending sort so equal sequences keep input order.
    menus.sort_by(|a, b| b.sequence.cmp(&a.sequence));

    let present: std::collections::HashSet<String> =
        menus.iter().map(|m| m.id.clone()).collect();

    // Group nodes by parent, preserving the sorted order within each group.
    let mut by_parent: HashMap<Option<String>, Vec<MenuNode>> = HashMap::new();
    for menu in menus {
        let actions = actions_by_menu.remove(&menu.id).unwrap_or_default();
        let parent_key = match &menu.parent_id {
            Some(pid) if present.contains(pid) => Some(pid.clone()),
            // Parent missing from the set: treat as a root.
            _ => None,
        };
        by_parent
            .entry(parent_key)
            .or_default()
            .push(MenuNode::from_menu(menu, actions));
    }

    let roots = by_parent.remove(&None).unwrap_or_default();
    roots
        .into_iter()
        .map(|node| attach_children(node, &mut by_parent))
        .collect()
}

fn attach_children(
    mut node: MenuNode,
    by_parent: &mut HashMap<Option<String>, Vec<MenuNode>>,
) -> MenuNode {
    if let Some(children) = by_parent.remove(&Some(node.id.clone())) {
        node.children = children
            .into_iter()
            .map(|child| attach_children(child, by_parent))
            .collect();
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Status;
    use chrono::Utc;

    fn menu(id: &str, parent: Option<&str>, sequence: i32) -> Menu {
        Menu {
            id: id.to_string(),
            parent_id: parent.map(|p| p.to_string()),
            name: format!("menu-{}", id),
            icon: None,
            router: None,
            sequence,
            status: Status::Enabled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_roots_sorted_descending_by_sequence() {
        let menus = vec![
            menu("a", None, 10),
            menu("b", None, 30),
            menu("c", None, 20),
        ];
        let tree = build_tree(menus, HashMap::new());
        let ids: Vec<&str> = tree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_stable_order_for_equal_sequences() {
        let menus = vec![menu("x", None, 5), menu("y", None, 5), menu("z", None, 5)];
        let tree = build_tree(menus, HashMap::new());
        let ids: Vec<&str> = tree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_children_nest_under_parents() {
        let menus = vec![
            menu("root", None, 1),
            menu("child1", Some("root"), 2),
            menu("child2", Some("root"), 9),
            menu("grandchild", Some("child1"), 1),
        ];
        let tree = build_tree(menus, HashMap::new());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "root");
        let children: Vec<&str> = tree[0].children.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(children, vec!["child2", "child1"]);
        assert_eq!(tree[0].children[1].children[0].id, "grandchild");
    }

    #[test]
    fn test_orphan_becomes_root() {
        // Parent id points at a menu not in the set.
        let menus = vec![menu("stray", Some("missing"), 1), menu("top", None, 2)];
        let tree = build_tree(menus, HashMap::new());
        let ids: Vec<&str> = tree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "stray"]);
    }

    #[test]
    fn test_actions_attach_to_their_menu() {
        let menus = vec![menu("m", None, 1)];
        let mut actions = HashMap::new();
        actions.insert(
            "m".to_string(),
            vec![MenuAction {
                id: "act1".into(),
                menu_id: "m".into(),
                code: "query".into(),
                name: "Query".into(),
            }],
        );
        let tree = build_tree(menus, actions);
        assert_eq!(tree[0].actions.len(), 1);
        assert_eq!(tree[0].actions[0].code, "query");
    }

    #[test]
    fn test_empty_input_yields_empty_tree() {
        let tree = build_tree(Vec::new(), HashMap::new());
        assert!(tree.is_empty());
    }
}
