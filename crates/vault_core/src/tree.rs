//! Reconciles the flat parent-pointer group list into the hierarchical tree
//! the view renders.
//!
//! The rebuild is wholesale: every group push replaces the previous tree
//! instead of patching it, so re-running it on the same input always yields
//! a structurally identical snapshot. Sibling and root order follow the
//! input order of the flat list.

use std::collections::HashMap;

use shared::{domain::GroupId, protocol::Group};

/// Derived view node. `key` is the stringified group id, the shape the tree
/// widget consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTreeNode {
    pub key: String,
    pub label: String,
    pub children: Vec<GroupTreeNode>,
}

/// Result of one full rebuild. `orphaned` lists every group that is not
/// reachable from a root (dangling parent pointer, descendant of one, or a
/// member of a parent cycle) in input order. Such groups are excluded from
/// `roots` but reported rather than silently swallowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    pub roots: Vec<GroupTreeNode>,
    pub orphaned: Vec<GroupId>,
}

pub fn build_tree(groups: &[Group]) -> TreeSnapshot {
    let mut children: HashMap<GroupId, Vec<usize>> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();

    for (index, group) in groups.iter().enumerate() {
        if group.parent_id.is_root() {
            roots.push(index);
        } else {
            children.entry(group.parent_id).or_default().push(index);
        }
    }

    let mut reached = vec![false; groups.len()];
    let roots = roots
        .iter()
        .map(|&index| assemble(index, groups, &children, &mut reached))
        .collect();

    let orphaned = groups
        .iter()
        .enumerate()
        .filter(|(index, _)| !reached[*index])
        .map(|(_, group)| group.id)
        .collect();

    TreeSnapshot { roots, orphaned }
}

fn assemble(
    index: usize,
    groups: &[Group],
    children: &HashMap<GroupId, Vec<usize>>,
    reached: &mut Vec<bool>,
) -> GroupTreeNode {
    reached[index] = true;
    let group = &groups[index];
    let child_nodes = children
        .get(&group.id)
        .map(|indices| {
            indices
                .iter()
                .map(|&child| assemble(child, groups, children, reached))
                .collect()
        })
        .unwrap_or_default();

    GroupTreeNode {
        key: group.id.0.to_string(),
        label: group.name.clone(),
        children: child_nodes,
    }
}
