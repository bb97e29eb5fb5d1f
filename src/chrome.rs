//! Chrome implementations of the host interfaces, and the background entry
//! points the service worker forwards browser events to.

use crate::commands::{Command, CommandRouter, MessageSender};
use crate::config::TrailConfig;
use crate::engine::HierarchyEngine;
use crate::error::{Result as TrailResult, TrailError};
use crate::events::{ActiveInfo, EventAdapter, RemoveInfo};
use crate::host::{Broadcaster, KeyValueStore, TabHost};
use crate::notify::Notification;
use crate::storage::NodeStore;
use crate::tab_data::{tabs_with_ids, CreateTab, TabChange, TabId, TabInfo, WindowId};
use js_sys::Promise;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

// Import JS bridge functions
#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryWindowTabs(window_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getCurrentWindowId() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(request: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn activateTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    fn sendMessage(message: JsValue) -> Result<(), JsValue>;
}

fn to_js<T: Serialize>(value: &T) -> TrailResult<JsValue> {
    // Plain objects rather than Maps, so chrome.storage and message
    // receivers see ordinary JSON
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| TrailError::Host(format!("Failed to serialize: {:?}", e)))
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> TrailResult<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| TrailError::Host(format!("Failed to parse: {:?}", e)))
}

fn from_js_optional<T: DeserializeOwned>(value: JsValue) -> TrailResult<Option<T>> {
    if value.is_null() || value.is_undefined() {
        Ok(None)
    } else {
        from_js(value).map(Some)
    }
}

fn host_error(context: &str, e: JsValue) -> TrailError {
    TrailError::Host(format!("{}: {:?}", context, e))
}

/// chrome.storage.local
pub struct ChromeStorage;

impl KeyValueStore for ChromeStorage {
    async fn get(&self, key: &str) -> TrailResult<Option<serde_json::Value>> {
        let value = getStorage(key)
            .await
            .map_err(|e| TrailError::Storage(format!("Failed to get storage: {:?}", e)))?;
        from_js_optional(value)
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> TrailResult<()> {
        setStorage(key, to_js(&value)?)
            .await
            .map_err(|e| TrailError::Storage(format!("Failed to save storage: {:?}", e)))
    }
}

/// chrome.tabs and chrome.windows
pub struct ChromeTabs;

impl TabHost for ChromeTabs {
    async fn query_window_tabs(&self, window_id: WindowId) -> TrailResult<Vec<TabInfo>> {
        let tabs = queryWindowTabs(window_id)
            .await
            .map_err(|e| host_error("Failed to get tabs", e))?;
        Ok(tabs_with_ids(from_js(tabs)?)?)
    }

    async fn current_window(&self) -> TrailResult<Option<WindowId>> {
        let window_id = getCurrentWindowId()
            .await
            .map_err(|e| host_error("Failed to get current window", e))?;
        from_js_optional(window_id)
    }

    async fn active_tab(&self) -> TrailResult<Option<TabInfo>> {
        let tab = getActiveTab()
            .await
            .map_err(|e| host_error("Failed to get active tab", e))?;
        from_js_optional(tab)
    }

    async fn create_tab(&self, request: CreateTab) -> TrailResult<TabInfo> {
        let created = createTab(to_js(&request)?)
            .await
            .map_err(|e| host_error("Failed to create tab", e))?;
        from_js(created)
    }

    async fn remove_tab(&self, tab_id: TabId) -> TrailResult<()> {
        removeTab(tab_id)
            .await
            .map_err(|e| host_error("Failed to remove tab", e))
    }

    async fn activate_tab(&self, tab_id: TabId) -> TrailResult<()> {
        activateTab(tab_id)
            .await
            .map_err(|e| host_error("Failed to activate tab", e))
    }
}

/// chrome.runtime.sendMessage; the bridge drops "no receiver" rejections
pub struct ChromeRuntime;

impl Broadcaster for ChromeRuntime {
    fn broadcast(&self, notification: &Notification) -> TrailResult<()> {
        sendMessage(to_js(notification)?).map_err(|e| host_error("Failed to send message", e))
    }
}

type ChromeEngine = HierarchyEngine<ChromeStorage, ChromeRuntime, ChromeTabs>;

fn into_promise<F>(future: F) -> Promise
where
    F: std::future::Future<Output = TrailResult<JsValue>> + 'static,
{
    future_to_promise(async move { future.await.map_err(|e| JsValue::from_str(&e.to_string())) })
}

/// Background state for one extension service worker.
///
/// The service worker creates a single instance and forwards chrome events
/// and runtime messages to it; every method returns a Promise.
#[wasm_bindgen]
pub struct TrailBackground {
    engine: Rc<ChromeEngine>,
}

#[wasm_bindgen]
impl TrailBackground {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<TrailBackground, JsValue> {
        let options: Option<serde_json::Value> =
            from_js_optional(options).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let config = TrailConfig::from_json(options.unwrap_or(serde_json::Value::Null))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        crate::init_logging(&config);

        let store = NodeStore::new(ChromeStorage, ChromeRuntime, config.default_child_limit);
        Ok(TrailBackground {
            engine: Rc::new(HierarchyEngine::new(store, ChromeTabs)),
        })
    }

    #[wasm_bindgen(js_name = onInstalled)]
    pub fn on_installed(&self) -> Promise {
        let engine = self.engine.clone();
        into_promise(async move {
            EventAdapter::new(&engine).installed().await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = onCreated)]
    pub fn on_created(&self, tab: JsValue) -> Promise {
        let engine = self.engine.clone();
        into_promise(async move {
            let tab: TabInfo = from_js(tab)?;
            EventAdapter::new(&engine).created(&tab).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = onUpdated)]
    pub fn on_updated(&self, tab_id: i32, change_info: JsValue, tab: JsValue) -> Promise {
        let engine = self.engine.clone();
        into_promise(async move {
            let change: TabChange = from_js(change_info)?;
            let tab: TabInfo = from_js(tab)?;
            EventAdapter::new(&engine).updated(tab_id, &change, &tab).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = onRemoved)]
    pub fn on_removed(&self, tab_id: i32, remove_info: JsValue) -> Promise {
        let engine = self.engine.clone();
        into_promise(async move {
            let remove_info: RemoveInfo = from_js(remove_info)?;
            EventAdapter::new(&engine).removed(tab_id, &remove_info).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = onActivated)]
    pub fn on_activated(&self, active_info: JsValue) -> Result<(), JsValue> {
        let active_info: ActiveInfo = from_js(active_info).map_err(|e| JsValue::from_str(&e.to_string()))?;
        EventAdapter::new(&self.engine).activated(&active_info);
        Ok(())
    }

    /// Resolves to the response object for `sendResponse`
    #[wasm_bindgen(js_name = onMessage)]
    pub fn on_message(&self, message: JsValue, sender: JsValue) -> Promise {
        let engine = self.engine.clone();
        into_promise(async move {
            let command: Command = from_js(message)?;
            let sender: MessageSender = from_js_optional(sender)?.unwrap_or_default();
            let response = CommandRouter::new(&engine).handle(command, &sender).await?;
            to_js(&response)
        })
    }
}
