/// Data structures for Tab Trail
use serde::{Deserialize, Serialize};

pub type TabId = i32;
pub type WindowId = i32;

/// Hierarchy record for one tracked tab
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabNode {
    pub tab_id: TabId,
    #[serde(default)]
    pub parent_id: Option<TabId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expanded: bool,
}

impl TabNode {
    pub fn new(tab_id: TabId, parent_id: Option<TabId>, title: String, url: String) -> TabNode {
        TabNode {
            tab_id,
            parent_id,
            title,
            url,
            expanded: false,
        }
    }
}

/// Snapshot of a host tab, as reported by the browser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub opener_tab_id: Option<TabId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub active: bool,
}

impl TabInfo {
    /// The node this tab would be recorded as on first observation.
    pub fn to_node(&self) -> TabNode {
        TabNode::new(self.id, self.opener_tab_id, self.title.clone(), self.url.clone())
    }
}

/// Partial update reported by a tab `updated` event.
///
/// A field left as `None` or empty never overwrites the stored value;
/// Chrome reports blank titles while a page is still loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabChange {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl TabChange {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.is_empty())
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.title().is_none() && self.url().is_none()
    }
}

/// Parse the tab list a window query returns, skipping tabs without an id
/// (devtools and some system pages), which can never be tracked.
pub fn tabs_with_ids(raw: Vec<serde_json::Value>) -> serde_json::Result<Vec<TabInfo>> {
    raw.into_iter()
        .filter(|tab| tab.get("id").is_some_and(|id| !id.is_null()))
        .map(serde_json::from_value)
        .collect()
}

/// Request to open a new host tab
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTab {
    pub url: String,
    pub opener_tab_id: TabId,
    pub index: i32,
}
