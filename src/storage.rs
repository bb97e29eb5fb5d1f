/// Per-window storage: the persisted node map and its load/save round trip

use crate::error::Result;
use crate::host::{Broadcaster, KeyValueStore};
use crate::notify::ChangeNotifier;
use crate::operations::child_count;
use crate::tab_data::{TabChange, TabId, TabNode, WindowId};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_CHILD_LIMIT: usize = 10;

/// Storage key for a window's store
pub fn storage_key(window_id: WindowId) -> String {
    format!("trail:{}", window_id)
}

/// Root storage structure for one window.
///
/// `nodes` is a hash map, so iteration order (and with it the order of
/// siblings in a projected tree) is not stable between loads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowStore {
    #[serde(default)]
    pub nodes: HashMap<TabId, TabNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_limit: Option<usize>,
}

impl WindowStore {
    pub fn new(child_limit: usize) -> Self {
        WindowStore {
            nodes: HashMap::new(),
            child_limit: Some(child_limit),
        }
    }

    pub fn child_limit(&self) -> usize {
        self.child_limit.unwrap_or(DEFAULT_CHILD_LIMIT)
    }

    pub fn get(&self, tab_id: TabId) -> Option<&TabNode> {
        self.nodes.get(&tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.nodes.contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `parent_id` may accept one more direct child
    pub fn has_room_under(&self, parent_id: TabId) -> bool {
        child_count(&self.nodes, parent_id) < self.child_limit()
    }

    /// Insert or refresh a node. A tab already tracked keeps its parent and
    /// expansion state and only takes the newer title and url.
    pub fn upsert(&mut self, node: TabNode) {
        match self.nodes.get_mut(&node.tab_id) {
            Some(existing) => {
                existing.title = node.title;
                existing.url = node.url;
            }
            None => {
                self.nodes.insert(node.tab_id, node);
            }
        }
    }

    pub fn apply_change(&mut self, tab_id: TabId, change: &TabChange) -> bool {
        self.nodes
            .get_mut(&tab_id)
            .map(|node| {
                if let Some(title) = change.title() {
                    node.title = title.to_string();
                }
                if let Some(url) = change.url() {
                    node.url = url.to_string();
                }
            })
            .is_some()
    }

    pub fn toggle(&mut self, tab_id: TabId) -> bool {
        self.nodes
            .get_mut(&tab_id)
            .map(|node| node.expanded = !node.expanded)
            .is_some()
    }

    pub fn collapse_all(&mut self) {
        for node in self.nodes.values_mut() {
            node.expanded = false;
        }
    }

    /// Move nodes stored under a key other than their own `tabId` back to
    /// that id. An entry whose id is already taken is dropped. Returns how
    /// many entries were misplaced.
    pub fn rekey(&mut self) -> usize {
        let misplaced: Vec<TabId> = self
            .nodes
            .iter()
            .filter(|(key, node)| **key != node.tab_id)
            .map(|(key, _)| *key)
            .collect();
        let moved: Vec<TabNode> = misplaced.iter().filter_map(|key| self.nodes.remove(key)).collect();
        for node in moved {
            self.nodes.entry(node.tab_id).or_insert(node);
        }
        misplaced.len()
    }

    pub fn remove_all<'a>(&mut self, tab_ids: impl IntoIterator<Item = &'a TabId>) -> usize {
        let original_len = self.nodes.len();
        for tab_id in tab_ids {
            self.nodes.remove(tab_id);
        }
        original_len - self.nodes.len()
    }
}

impl Default for WindowStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHILD_LIMIT)
    }
}

/// Durable map of window stores.
///
/// Callers load a private copy, mutate it and save it back as one unit;
/// every save is followed by a `treeUpdated` push.
pub struct NodeStore<K, B> {
    kv: K,
    notifier: ChangeNotifier<B>,
    default_child_limit: usize,
}

impl<K: KeyValueStore, B: Broadcaster> NodeStore<K, B> {
    pub fn new(kv: K, broadcaster: B, default_child_limit: usize) -> Self {
        NodeStore {
            kv,
            notifier: ChangeNotifier::new(broadcaster),
            default_child_limit,
        }
    }

    pub fn notifier(&self) -> &ChangeNotifier<B> {
        &self.notifier
    }

    pub async fn load(&self, window_id: WindowId) -> Result<WindowStore> {
        match self.kv.get(&storage_key(window_id)).await? {
            Some(value) if !value.is_null() => {
                let mut store: WindowStore = serde_json::from_value(value)?;
                let misplaced = store.rekey();
                if misplaced > 0 {
                    warn!("Re-keyed {} misplaced nodes in window {}", misplaced, window_id);
                }
                Ok(store)
            }
            _ => {
                debug!("No stored trail for window {}, starting empty", window_id);
                Ok(WindowStore::new(self.default_child_limit))
            }
        }
    }

    pub async fn save(&self, window_id: WindowId, store: &WindowStore) -> Result<()> {
        let value = serde_json::to_value(store)?;
        self.kv.set(&storage_key(window_id), value).await?;
        self.notifier.tree_changed(window_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notification;
    use crate::testing::{MemoryStore, RecordingBroadcaster};
    use futures::executor::block_on;

    fn create_test_node(tab_id: TabId, parent_id: Option<TabId>, title: &str) -> TabNode {
        TabNode::new(tab_id, parent_id, title.to_string(), format!("https://{}.example", tab_id))
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key(42), "trail:42");
    }

    #[test]
    fn test_window_store_new() {
        let store = WindowStore::default();
        assert!(store.is_empty());
        assert_eq!(store.child_limit(), 10);
    }

    #[test]
    fn test_missing_child_limit_uses_default() {
        let store: WindowStore = serde_json::from_str(r#"{"nodes": {}}"#).unwrap();
        assert_eq!(store.child_limit, None);
        assert_eq!(store.child_limit(), DEFAULT_CHILD_LIMIT);
    }

    #[test]
    fn test_has_room_under() {
        let mut store = WindowStore::new(2);
        store.upsert(create_test_node(1, None, "A"));
        store.upsert(create_test_node(2, Some(1), "B"));
        assert!(store.has_room_under(1));

        store.upsert(create_test_node(3, Some(1), "C"));
        assert!(!store.has_room_under(1));
        assert!(store.has_room_under(2));
    }

    #[test]
    fn test_upsert_duplicate_keeps_one_node() {
        let mut store = WindowStore::default();
        store.upsert(create_test_node(1, None, "Old"));
        store.toggle(1);

        store.upsert(create_test_node(1, Some(9), "New"));

        assert_eq!(store.len(), 1);
        let node = store.get(1).unwrap();
        assert_eq!(node.title, "New");
        assert_eq!(node.parent_id, None);
        assert!(node.expanded);
    }

    #[test]
    fn test_apply_change_is_partial() {
        let mut store = WindowStore::default();
        store.upsert(create_test_node(1, None, "Title"));

        let change = TabChange {
            title: None,
            url: Some("u".to_string()),
        };
        assert!(store.apply_change(1, &change));

        let node = store.get(1).unwrap();
        assert_eq!(node.title, "Title");
        assert_eq!(node.url, "u");
    }

    #[test]
    fn test_apply_change_ignores_blank_fields() {
        let mut store = WindowStore::default();
        store.upsert(create_test_node(1, None, "Kept"));

        let change = TabChange {
            title: Some(String::new()),
            url: Some(String::new()),
        };
        assert!(store.apply_change(1, &change));

        let node = store.get(1).unwrap();
        assert_eq!(node.title, "Kept");
        assert_eq!(node.url, "https://1.example");
    }

    #[test]
    fn test_rekey_moves_misplaced_nodes() {
        let mut store: WindowStore = serde_json::from_value(serde_json::json!({
            "nodes": {
                "5": {"tabId": 6},
                "7": {"tabId": 8},
                "8": {"tabId": 7},
                "9": {"tabId": 9}
            }
        }))
        .unwrap();

        assert_eq!(store.rekey(), 3);

        let mut keys: Vec<TabId> = store.nodes.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![6, 7, 8, 9]);
        assert!(store.nodes.iter().all(|(key, node)| *key == node.tab_id));
        assert_eq!(store.rekey(), 0);
    }

    #[test]
    fn test_rekey_drops_alias_of_existing_node() {
        let mut store: WindowStore = serde_json::from_value(serde_json::json!({
            "nodes": {
                "1": {"tabId": 1, "title": "Real"},
                "2": {"tabId": 1, "title": "Alias"}
            }
        }))
        .unwrap();

        store.rekey();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(1).unwrap().title, "Real");
    }

    #[test]
    fn test_load_rekeys_corrupted_store() {
        let kv = MemoryStore::default();
        let node_store = NodeStore::new(kv.clone(), RecordingBroadcaster::default(), 10);
        block_on(kv.set("trail:1", serde_json::json!({"nodes": {"5": {"tabId": 6}}}))).unwrap();

        let store = block_on(node_store.load(1)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(6).unwrap().tab_id, 6);
        assert!(!store.contains(5));
    }

    #[test]
    fn test_apply_change_missing_tab() {
        let mut store = WindowStore::default();
        assert!(!store.apply_change(7, &TabChange::default()));
    }

    #[test]
    fn test_toggle_and_collapse_all() {
        let mut store = WindowStore::default();
        store.upsert(create_test_node(1, None, "A"));
        store.upsert(create_test_node(2, Some(1), "B"));

        assert!(store.toggle(1));
        assert!(store.toggle(2));
        assert!(!store.toggle(3));
        assert!(store.get(1).unwrap().expanded);

        store.collapse_all();

        assert!(store.nodes.values().all(|n| !n.expanded));
    }

    #[test]
    fn test_remove_all() {
        let mut store = WindowStore::default();
        store.upsert(create_test_node(1, None, "A"));
        store.upsert(create_test_node(2, Some(1), "B"));

        let removed = store.remove_all(&[1, 2, 3]);

        assert_eq!(removed, 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_serialization_uses_string_keys() {
        let mut store = WindowStore::new(5);
        store.upsert(create_test_node(1, None, "A"));

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["nodes"]["1"]["title"], "A");
        assert_eq!(json["childLimit"], 5);

        let deserialized: WindowStore = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, store);
    }

    #[test]
    fn test_load_missing_window_is_empty() {
        let node_store = NodeStore::new(MemoryStore::default(), RecordingBroadcaster::default(), 4);

        let store = block_on(node_store.load(1)).unwrap();

        assert!(store.is_empty());
        assert_eq!(store.child_limit, Some(4));
    }

    #[test]
    fn test_save_then_load_and_notify() {
        let kv = MemoryStore::default();
        let broadcaster = RecordingBroadcaster::default();
        let node_store = NodeStore::new(kv.clone(), broadcaster.clone(), 10);

        let mut store = WindowStore::default();
        store.upsert(create_test_node(1, None, "A"));
        block_on(node_store.save(3, &store)).unwrap();

        assert!(kv.contains("trail:3"));
        assert_eq!(block_on(node_store.load(3)).unwrap(), store);
        assert_eq!(broadcaster.sent(), vec![Notification::TreeUpdated { window_id: 3 }]);
    }
}
