//! Collaborator interfaces: the browser's tab registry, its key-value
//! storage and the runtime message channel.
//!
//! Everything here is single-threaded (the extension service worker), so
//! the futures are not required to be `Send`.

use crate::error::Result;
use crate::notify::Notification;
use crate::tab_data::{CreateTab, TabId, TabInfo, WindowId};

/// Host tab registry
#[allow(async_fn_in_trait)]
pub trait TabHost {
    /// Tabs currently open in `window_id`
    async fn query_window_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>>;

    /// Id of the window the user is currently in, if any
    async fn current_window(&self) -> Result<Option<WindowId>>;

    /// Active tab of the current window, if any
    async fn active_tab(&self) -> Result<Option<TabInfo>>;

    async fn create_tab(&self, request: CreateTab) -> Result<TabInfo>;

    async fn remove_tab(&self, tab_id: TabId) -> Result<()>;

    async fn activate_tab(&self, tab_id: TabId) -> Result<()>;
}

/// Durable key-value storage holding JSON-compatible values
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// Fire-and-forget delivery to every observer
pub trait Broadcaster {
    fn broadcast(&self, notification: &Notification) -> Result<()>;
}
