//! Push notifications to UI observers.
//!
//! Pushes are hints only: observers re-pull the tree with `getTree`, so a
//! lost delivery is logged and dropped.

use crate::host::Broadcaster;
use crate::tab_data::{TabId, WindowId};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Notification {
    TreeUpdated { window_id: WindowId },
    ActiveTab { tab_id: TabId, window_id: WindowId },
}

pub struct ChangeNotifier<B> {
    broadcaster: B,
}

impl<B: Broadcaster> ChangeNotifier<B> {
    pub fn new(broadcaster: B) -> Self {
        ChangeNotifier { broadcaster }
    }

    pub fn tree_changed(&self, window_id: WindowId) {
        self.send(Notification::TreeUpdated { window_id });
    }

    pub fn active_tab(&self, tab_id: TabId, window_id: WindowId) {
        self.send(Notification::ActiveTab { tab_id, window_id });
    }

    fn send(&self, notification: Notification) {
        if let Err(e) = self.broadcaster.broadcast(&notification) {
            debug!("Dropped {:?}: {}", notification, e);
        }
    }
}
