//! Projection of a flat node map into a renderable forest

use crate::tab_data::{TabId, TabNode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const ROOT_ID: &str = "root";
const ROOT_TITLE: &str = "Trail";

/// Display node handed to observers; ids are strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub expanded: bool,
    pub children: Vec<TreeNode>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    pub root: TreeNode,
    pub selected_id: String,
}

impl TreeView {
    /// Forest with nothing in it, for callers whose window cannot be resolved
    pub fn empty() -> Self {
        TreeView {
            root: root_node(Vec::new()),
            selected_id: String::new(),
        }
    }
}

fn root_node(children: Vec<TreeNode>) -> TreeNode {
    TreeNode {
        id: ROOT_ID.to_string(),
        title: ROOT_TITLE.to_string(),
        url: String::new(),
        expanded: true,
        children,
        parent_id: None,
    }
}

fn display_title(node: &TabNode) -> String {
    if !node.title.is_empty() {
        node.title.clone()
    } else if !node.url.is_empty() {
        node.url.clone()
    } else {
        "Tab".to_string()
    }
}

/// Build the forest under a synthetic root.
///
/// A node is attached under its parent only when the parent is present in
/// `nodes`; null, dangling or cyclic parents make it a root. Sibling order
/// follows map iteration and is not stable.
pub fn project(nodes: &HashMap<TabId, TabNode>, selected: Option<TabId>) -> TreeView {
    let mut children_of: HashMap<TabId, Vec<TabId>> = HashMap::new();
    let mut roots: Vec<TabId> = Vec::new();

    // Map keys are the ids; a stored `tabId` that disagrees is ignored.
    for (id, node) in nodes {
        match node.parent_id {
            Some(parent) if parent != *id && nodes.contains_key(&parent) => {
                children_of.entry(parent).or_default().push(*id);
            }
            _ => roots.push(*id),
        }
    }

    // Anything not reachable from a root sits on a parent cycle; promote
    // one member per cycle so every node still shows up exactly once.
    let mut placed: HashSet<TabId> = HashSet::with_capacity(nodes.len());
    let mut forest: Vec<TreeNode> = Vec::new();
    for root in &roots {
        forest.push(build(*root, nodes, &children_of, &mut placed));
    }
    let mut stranded: Vec<TabId> = nodes
        .keys()
        .filter(|id| !placed.contains(id))
        .copied()
        .collect();
    stranded.sort_unstable();
    for id in stranded {
        if !placed.contains(&id) {
            forest.push(build(id, nodes, &children_of, &mut placed));
        }
    }

    TreeView {
        root: root_node(forest),
        selected_id: selected.map(|id| id.to_string()).unwrap_or_default(),
    }
}

/// Materialise the subtree under `top` with an explicit stack, filling
/// children bottom-up. A node already placed is never attached twice.
fn build(
    top: TabId,
    nodes: &HashMap<TabId, TabNode>,
    children_of: &HashMap<TabId, Vec<TabId>>,
    placed: &mut HashSet<TabId>,
) -> TreeNode {
    let mut order: Vec<TabId> = Vec::new();
    let mut stack = vec![top];
    placed.insert(top);
    while let Some(id) = stack.pop() {
        order.push(id);
        for child in children_of.get(&id).into_iter().flatten() {
            if placed.insert(*child) {
                stack.push(*child);
            }
        }
    }

    // Children always come after their parent in `order`; walk it backwards.
    let mut built: HashMap<TabId, TreeNode> = HashMap::new();
    for id in order.iter().rev() {
        let Some(node) = nodes.get(id) else {
            continue;
        };
        let parent_id = if *id == top {
            None
        } else {
            node.parent_id
        };
        let children = children_of
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| built.remove(child))
            .collect();
        built.insert(
            *id,
            TreeNode {
                id: id.to_string(),
                title: display_title(node),
                url: node.url.clone(),
                expanded: node.expanded,
                children,
                parent_id: parent_id.map(|p| p.to_string()),
            },
        );
    }

    built.remove(&top).unwrap_or_else(|| root_node(Vec::new()))
}
