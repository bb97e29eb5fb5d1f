//! Hierarchy mutations for per-window tab trails.
//!
//! Every public operation is one load-mutate-save cycle executed under the
//! window's lock, so admission decisions and partial updates always see the
//! result of the previous operation on that window.

use crate::error::{Result, TrailError};
use crate::host::{Broadcaster, KeyValueStore, TabHost};
use crate::operations::{descendant_closure, descendants_to_close};
use crate::serial::WindowLocks;
use crate::storage::{NodeStore, WindowStore};
use crate::tab_data::{CreateTab, TabChange, TabId, TabInfo, TabNode, WindowId};
use crate::tree::{project, TreeView};
use log::{debug, info, warn};

/// Outcome of an operation addressed to a single tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    /// Nothing to apply; the store was not rewritten
    Unchanged,
    /// The tab is not tracked (already removed, or never admitted)
    Missing,
}

pub struct HierarchyEngine<K, B, H> {
    store: NodeStore<K, B>,
    host: H,
    locks: WindowLocks,
}

impl<K, B, H> HierarchyEngine<K, B, H>
where
    K: KeyValueStore,
    B: Broadcaster,
    H: TabHost,
{
    pub fn new(store: NodeStore<K, B>, host: H) -> Self {
        HierarchyEngine {
            store,
            host,
            locks: WindowLocks::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &NodeStore<K, B> {
        &self.store
    }

    /// Record a tab, refusing it when its parent already has `childLimit`
    /// children. Re-creating a tracked tab only refreshes title and url.
    pub async fn create_node(&self, window_id: WindowId, node: TabNode) -> Result<()> {
        self.locks
            .run(window_id, async {
                let mut store = self.store.load(window_id).await?;
                admit(&mut store, node)?;
                self.store.save(window_id, &store).await
            })
            .await
    }

    /// Apply the provided fields of `change`; absent fields are left alone
    pub async fn update_node(&self, window_id: WindowId, tab_id: TabId, change: &TabChange) -> Result<Applied> {
        if change.is_empty() {
            return Ok(Applied::Unchanged);
        }
        self.locks
            .run(window_id, async {
                let mut store = self.store.load(window_id).await?;
                if !store.apply_change(tab_id, change) {
                    debug!("Ignoring update for untracked tab {}", tab_id);
                    return Ok(Applied::Missing);
                }
                self.store.save(window_id, &store).await?;
                Ok(Applied::Changed)
            })
            .await
    }

    /// Forget `tab_id` and everything below it, then close the descendants
    /// on the host. Returns the descendants a close was requested for.
    pub async fn remove_node(&self, window_id: WindowId, tab_id: TabId) -> Result<Vec<TabId>> {
        let descendants = self.forget_subtree(window_id, tab_id).await?;

        // Each descendant will come back through `remove_node` from its own
        // host removal event and find nothing left to do.
        for descendant in &descendants {
            if let Err(e) = self.host.remove_tab(*descendant).await {
                warn!("Could not close descendant tab {}: {}", descendant, e);
            }
        }
        Ok(descendants)
    }

    /// Forget `tab_id` and everything below it without touching host tabs,
    /// for when the whole window is going away anyway.
    pub async fn forget_subtree(&self, window_id: WindowId, tab_id: TabId) -> Result<Vec<TabId>> {
        self.locks
            .run(window_id, async {
                let mut store = self.store.load(window_id).await?;
                let closure = descendant_closure(&store.nodes, tab_id);
                if store.remove_all(&closure) == 0 {
                    debug!("Tab {} already gone from window {}", tab_id, window_id);
                    return Ok(Vec::new());
                }
                self.store.save(window_id, &store).await?;
                info!(
                    "Removed tab {} and {} descendant(s) from window {}",
                    tab_id,
                    closure.len() - 1,
                    window_id
                );
                Ok(descendants_to_close(&closure, tab_id))
            })
            .await
    }

    pub async fn toggle_expanded(&self, window_id: WindowId, tab_id: TabId) -> Result<Applied> {
        self.locks
            .run(window_id, async {
                let mut store = self.store.load(window_id).await?;
                if !store.toggle(tab_id) {
                    debug!("Ignoring toggle for untracked tab {}", tab_id);
                    return Ok(Applied::Missing);
                }
                self.store.save(window_id, &store).await?;
                Ok(Applied::Changed)
            })
            .await
    }

    pub async fn collapse_all(&self, window_id: WindowId) -> Result<()> {
        self.locks
            .run(window_id, async {
                let mut store = self.store.load(window_id).await?;
                store.collapse_all();
                self.store.save(window_id, &store).await
            })
            .await
    }

    /// Change the window's child limit. Existing children stay put even
    /// when a parent is now over the new limit.
    pub async fn set_child_limit(&self, window_id: WindowId, limit: usize) -> Result<()> {
        self.locks
            .run(window_id, async {
                let mut store = self.store.load(window_id).await?;
                store.child_limit = Some(limit);
                self.store.save(window_id, &store).await
            })
            .await
    }

    /// Record a startup snapshot of tabs in one cycle. Returns how many tabs
    /// were refused by admission control.
    pub async fn seed_window(&self, window_id: WindowId, tabs: &[TabInfo]) -> Result<usize> {
        self.locks
            .run(window_id, async {
                let mut store = self.store.load(window_id).await?;
                let mut refused = 0;
                for tab in tabs {
                    if let Err(e) = admit(&mut store, tab.to_node()) {
                        debug!("Skipping tab {} in snapshot: {}", tab.id, e);
                        refused += 1;
                    }
                }
                self.store.save(window_id, &store).await?;
                info!(
                    "Seeded window {} with {} tab(s), {} refused",
                    window_id,
                    tabs.len() - refused,
                    refused
                );
                Ok(refused)
            })
            .await
    }

    /// Open `url` as a child of `opener` on the host and record it, sharing
    /// the admission decision with the creation event that follows.
    pub async fn open_child(&self, opener: &TabInfo, url: &str) -> Result<TabInfo> {
        let window_id = opener.window_id;
        self.locks
            .run(window_id, async {
                let mut store = self.store.load(window_id).await?;
                let limit = store.child_limit();
                if !store.has_room_under(opener.id) {
                    info!("Refusing child of tab {}: limit {} reached", opener.id, limit);
                    return Err(TrailError::AdmissionDenied {
                        parent_id: opener.id,
                        limit,
                    });
                }
                let created = self
                    .host
                    .create_tab(CreateTab {
                        url: url.to_string(),
                        opener_tab_id: opener.id,
                        index: opener.index + 1,
                    })
                    .await?;
                let mut node = created.to_node();
                node.parent_id = Some(opener.id);
                store.upsert(node);
                self.store.save(window_id, &store).await?;
                Ok(created)
            })
            .await
    }

    /// Current forest for `window_id`. Reads wait for pending writes.
    pub async fn tree(&self, window_id: WindowId, selected: Option<TabId>) -> Result<TreeView> {
        self.locks
            .run(window_id, async {
                let store = self.store.load(window_id).await?;
                Ok(project(&store.nodes, selected))
            })
            .await
    }

    pub async fn snapshot(&self, window_id: WindowId) -> Result<WindowStore> {
        self.locks.run(window_id, self.store.load(window_id)).await
    }
}

/// Admission control against the store as currently loaded
fn admit(store: &mut WindowStore, node: TabNode) -> Result<()> {
    if !store.contains(node.tab_id) {
        if let Some(parent_id) = node.parent_id {
            if !store.has_room_under(parent_id) {
                let limit = store.child_limit();
                info!("Refusing tab {} under {}: limit {} reached", node.tab_id, parent_id, limit);
                return Err(TrailError::AdmissionDenied { parent_id, limit });
            }
        }
    }
    store.upsert(node);
    Ok(())
}
