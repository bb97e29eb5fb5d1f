//! Translation of host tab-lifecycle events into hierarchy operations

use crate::engine::HierarchyEngine;
use crate::error::Result;
use crate::host::{Broadcaster, KeyValueStore, TabHost};
use crate::tab_data::{TabChange, TabId, TabInfo, WindowId};
use log::{debug, info};
use serde::Deserialize;

/// Payload of a tab `removed` event
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoveInfo {
    pub window_id: WindowId,
    #[serde(default)]
    pub is_window_closing: bool,
}

/// Payload of a tab `activated` event
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveInfo {
    pub tab_id: TabId,
    pub window_id: WindowId,
}

pub struct EventAdapter<'a, K, B, H> {
    engine: &'a HierarchyEngine<K, B, H>,
}

impl<'a, K, B, H> EventAdapter<'a, K, B, H>
where
    K: KeyValueStore,
    B: Broadcaster,
    H: TabHost,
{
    pub fn new(engine: &'a HierarchyEngine<K, B, H>) -> Self {
        EventAdapter { engine }
    }

    /// Record every tab already open in the current window
    pub async fn installed(&self) -> Result<()> {
        let Some(window_id) = self.engine.host().current_window().await? else {
            debug!("No current window at install time");
            return Ok(());
        };
        let tabs = self.engine.host().query_window_tabs(window_id).await?;
        self.engine.seed_window(window_id, &tabs).await?;
        Ok(())
    }

    pub async fn created(&self, tab: &TabInfo) -> Result<()> {
        match self.engine.create_node(tab.window_id, tab.to_node()).await {
            Err(e) if e.is_admission_denied() => {
                info!("Not tracking tab {}: {}", tab.id, e);
                Ok(())
            }
            other => other,
        }
    }

    pub async fn updated(&self, tab_id: TabId, change: &TabChange, tab: &TabInfo) -> Result<()> {
        self.engine.update_node(tab.window_id, tab_id, change).await?;
        Ok(())
    }

    pub async fn removed(&self, tab_id: TabId, remove_info: &RemoveInfo) -> Result<()> {
        if remove_info.is_window_closing {
            self.engine.forget_subtree(remove_info.window_id, tab_id).await?;
        } else {
            self.engine.remove_node(remove_info.window_id, tab_id).await?;
        }
        Ok(())
    }

    pub fn activated(&self, active_info: &ActiveInfo) {
        self.engine
            .store()
            .notifier()
            .active_tab(active_info.tab_id, active_info.window_id);
    }
}
