//! Inbound messages from the tree UI and content scripts

use crate::engine::HierarchyEngine;
use crate::error::{Result, TrailError};
use crate::host::{Broadcaster, KeyValueStore, TabHost};
use crate::tab_data::{TabId, TabInfo, WindowId};
use crate::tree::TreeView;
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    GetTree,
    OpenChild {
        url: String,
    },
    ToggleNode {
        #[serde(deserialize_with = "tab_id_from_number_or_string")]
        tab_id: TabId,
    },
    CollapseAll,
    CloseNode {
        #[serde(deserialize_with = "tab_id_from_number_or_string")]
        tab_id: TabId,
    },
    FocusTab {
        #[serde(deserialize_with = "tab_id_from_number_or_string")]
        tab_id: TabId,
    },
    SetChildLimit {
        limit: usize,
    },
}

/// Tree node ids are strings, so the UI may echo a tab id back either way
fn tab_id_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<TabId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(TabId),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Who sent a message: a content script carries its tab, the side panel does not
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MessageSender {
    #[serde(default)]
    pub tab: Option<TabInfo>,
}

impl MessageSender {
    pub fn from_tab(tab: TabInfo) -> Self {
        MessageSender { tab: Some(tab) }
    }

    fn window_id(&self) -> Option<WindowId> {
        self.tab.as_ref().map(|tab| tab.window_id)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            ok: true,
            tab_id: None,
            error: None,
        }
    }

    pub fn failed() -> Self {
        Status {
            ok: false,
            tab_id: None,
            error: None,
        }
    }

    pub fn opened(tab_id: TabId) -> Self {
        Status {
            tab_id: Some(tab_id),
            ..Self::ok()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Status {
            error: Some(message.into()),
            ..Self::failed()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    Tree(TreeView),
    Status(Status),
}

/// Only http(s) targets may be opened as children
pub fn validate_child_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).map_err(|_| TrailError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        _ => Err(TrailError::InvalidUrl(raw.to_string())),
    }
}

pub struct CommandRouter<'a, K, B, H> {
    engine: &'a HierarchyEngine<K, B, H>,
}

impl<'a, K, B, H> CommandRouter<'a, K, B, H>
where
    K: KeyValueStore,
    B: Broadcaster,
    H: TabHost,
{
    pub fn new(engine: &'a HierarchyEngine<K, B, H>) -> Self {
        CommandRouter { engine }
    }

    /// Handle one message. Only storage failures surface as `Err`.
    pub async fn handle(&self, command: Command, sender: &MessageSender) -> Result<Response> {
        match command {
            Command::GetTree => self.get_tree(sender).await.map(Response::Tree),
            Command::OpenChild { url } => self.open_child(&url, sender).await.map(Response::Status),
            Command::ToggleNode { tab_id } => {
                let Some(window_id) = sender.window_id() else {
                    return Ok(Response::Status(Status::failed()));
                };
                self.engine.toggle_expanded(window_id, tab_id).await?;
                Ok(Response::Status(Status::ok()))
            }
            Command::CollapseAll => {
                let Some(window_id) = self.resolve_window(sender).await else {
                    return Ok(Response::Status(Status::failed()));
                };
                self.engine.collapse_all(window_id).await?;
                Ok(Response::Status(Status::ok()))
            }
            Command::CloseNode { tab_id } => {
                if let Err(e) = self.engine.host().remove_tab(tab_id).await {
                    warn!("Could not close tab {}: {}", tab_id, e);
                }
                Ok(Response::Status(Status::ok()))
            }
            Command::FocusTab { tab_id } => {
                if let Err(e) = self.engine.host().activate_tab(tab_id).await {
                    warn!("Could not focus tab {}: {}", tab_id, e);
                }
                Ok(Response::Status(Status::ok()))
            }
            Command::SetChildLimit { limit } => {
                let Some(window_id) = self.resolve_window(sender).await else {
                    return Ok(Response::Status(Status::failed()));
                };
                self.engine.set_child_limit(window_id, limit).await?;
                info!("Child limit for window {} set to {}", window_id, limit);
                Ok(Response::Status(Status::ok()))
            }
        }
    }

    async fn get_tree(&self, sender: &MessageSender) -> Result<TreeView> {
        let tab = match &sender.tab {
            Some(tab) => Some(tab.clone()),
            None => self.engine.host().active_tab().await.unwrap_or_else(|e| {
                warn!("Could not resolve active tab: {}", e);
                None
            }),
        };
        match tab {
            Some(tab) => self.engine.tree(tab.window_id, Some(tab.id)).await,
            None => Ok(TreeView::empty()),
        }
    }

    async fn open_child(&self, url: &str, sender: &MessageSender) -> Result<Status> {
        let Some(opener) = &sender.tab else {
            return Ok(Status::error(TrailError::NoOpener.to_string()));
        };
        let url = match validate_child_url(url) {
            Ok(url) => url,
            Err(e) => return Ok(Status::error(e.to_string())),
        };
        match self.engine.open_child(opener, &url).await {
            Ok(created) => Ok(Status::opened(created.id)),
            Err(e @ (TrailError::AdmissionDenied { .. } | TrailError::Host(_))) => {
                info!("openChild from tab {} refused: {}", opener.id, e);
                Ok(Status::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_window(&self, sender: &MessageSender) -> Option<WindowId> {
        if let Some(window_id) = sender.window_id() {
            return Some(window_id);
        }
        self.engine.host().current_window().await.unwrap_or_else(|e| {
            warn!("Could not resolve current window: {}", e);
            None
        })
    }
}
