/// Hierarchy operations over a flat node map: child counting, descendant closure

use crate::tab_data::{TabId, TabNode};
use std::collections::{HashMap, HashSet};

/// Number of direct children currently recorded under `parent_id`
pub fn child_count(nodes: &HashMap<TabId, TabNode>, parent_id: TabId) -> usize {
    nodes
        .values()
        .filter(|node| node.parent_id == Some(parent_id))
        .count()
}

/// Reflexive-transitive closure of `tab_id` over the parent relation.
///
/// Repeats linear scans until no node joins the set, so parent pointers may
/// appear in any order and cycles in a corrupted store still terminate.
pub fn descendant_closure(nodes: &HashMap<TabId, TabNode>, tab_id: TabId) -> HashSet<TabId> {
    let mut closure = HashSet::from([tab_id]);

    loop {
        let before = closure.len();
        for node in nodes.values() {
            if closure.contains(&node.tab_id) {
                continue;
            }
            if node.parent_id.is_some_and(|parent| closure.contains(&parent)) {
                closure.insert(node.tab_id);
            }
        }
        if closure.len() == before {
            return closure;
        }
    }
}

/// Closure members other than `tab_id` itself, sorted for stable close order
pub fn descendants_to_close(closure: &HashSet<TabId>, tab_id: TabId) -> Vec<TabId> {
    let mut ids: Vec<TabId> = closure.iter().copied().filter(|id| *id != tab_id).collect();
    ids.sort_unstable();
    ids
}
