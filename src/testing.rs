//! In-memory collaborators for unit tests

use crate::error::{Result, TrailError};
use crate::host::{Broadcaster, KeyValueStore, TabHost};
use crate::notify::Notification;
use crate::tab_data::{CreateTab, TabId, TabInfo, WindowId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Suspend once, so other local tasks get to run
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Key-value store that suspends on every read and write, like
/// chrome.storage does
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    pub fn contains(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        yield_now().await;
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        yield_now().await;
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingBroadcaster {
    sent: Rc<RefCell<Vec<Notification>>>,
}

impl RecordingBroadcaster {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.borrow().clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, notification: &Notification) -> Result<()> {
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

pub struct FailingBroadcaster;

impl Broadcaster for FailingBroadcaster {
    fn broadcast(&self, _notification: &Notification) -> Result<()> {
        Err(TrailError::Host("no receiving end".to_string()))
    }
}

#[derive(Default)]
struct HostState {
    tabs: Vec<TabInfo>,
    current_window: Option<WindowId>,
    next_id: TabId,
    removed: Vec<TabId>,
    activated: Vec<TabId>,
    created: Vec<CreateTab>,
    unremovable: HashSet<TabId>,
}

/// Fake tab registry recording every request it receives
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Rc<RefCell<HostState>>,
}

impl FakeHost {
    pub fn new(current_window: WindowId) -> Self {
        let host = FakeHost::default();
        {
            let mut state = host.state.borrow_mut();
            state.current_window = Some(current_window);
            state.next_id = 100;
        }
        host
    }

    pub fn add_tab(&self, tab: TabInfo) {
        self.state.borrow_mut().tabs.push(tab);
    }

    /// Make `remove_tab` fail for this id
    pub fn refuse_removal(&self, tab_id: TabId) {
        self.state.borrow_mut().unremovable.insert(tab_id);
    }

    pub fn removed(&self) -> Vec<TabId> {
        self.state.borrow().removed.clone()
    }

    pub fn activated(&self) -> Vec<TabId> {
        self.state.borrow().activated.clone()
    }

    pub fn created(&self) -> Vec<CreateTab> {
        self.state.borrow().created.clone()
    }
}

impl TabHost for FakeHost {
    async fn query_window_tabs(&self, window_id: WindowId) -> Result<Vec<TabInfo>> {
        yield_now().await;
        Ok(self
            .state
            .borrow()
            .tabs
            .iter()
            .filter(|t| t.window_id == window_id)
            .cloned()
            .collect())
    }

    async fn current_window(&self) -> Result<Option<WindowId>> {
        Ok(self.state.borrow().current_window)
    }

    async fn active_tab(&self) -> Result<Option<TabInfo>> {
        let state = self.state.borrow();
        Ok(state
            .tabs
            .iter()
            .find(|t| t.active && Some(t.window_id) == state.current_window)
            .cloned())
    }

    async fn create_tab(&self, request: CreateTab) -> Result<TabInfo> {
        yield_now().await;
        let mut state = self.state.borrow_mut();
        let window_id = state
            .tabs
            .iter()
            .find(|t| t.id == request.opener_tab_id)
            .map(|t| t.window_id)
            .or(state.current_window)
            .unwrap_or(1);
        state.next_id += 1;
        let tab = TabInfo {
            id: state.next_id,
            window_id,
            opener_tab_id: Some(request.opener_tab_id),
            title: String::new(),
            url: request.url.clone(),
            index: request.index,
            active: false,
        };
        state.tabs.push(tab.clone());
        state.created.push(request);
        Ok(tab)
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<()> {
        yield_now().await;
        let mut state = self.state.borrow_mut();
        if state.unremovable.contains(&tab_id) {
            return Err(TrailError::Host(format!("No tab with id: {}", tab_id)));
        }
        state.tabs.retain(|t| t.id != tab_id);
        state.removed.push(tab_id);
        Ok(())
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.tabs.iter().any(|t| t.id == tab_id) {
            return Err(TrailError::Host(format!("No tab with id: {}", tab_id)));
        }
        state.activated.push(tab_id);
        Ok(())
    }
}

pub fn create_test_tab(id: TabId, window_id: WindowId, opener: Option<TabId>, title: &str) -> TabInfo {
    TabInfo {
        id,
        window_id,
        opener_tab_id: opener,
        title: title.to_string(),
        url: format!("https://example.com/{}", id),
        index: id,
        active: false,
    }
}
