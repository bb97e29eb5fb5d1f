//! Per-window serialization of load-mutate-save cycles.
//!
//! Every store mutation for a window runs inside [`WindowLocks::run`]; a
//! second operation on the same window waits until the first has saved.
//! Windows never share a lock.

use crate::error::Result;
use crate::tab_data::WindowId;
use futures::lock::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

#[derive(Default)]
pub struct WindowLocks {
    locks: RefCell<HashMap<WindowId, Rc<Mutex<()>>>>,
}

impl WindowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, window_id: WindowId) -> Rc<Mutex<()>> {
        self.locks
            .borrow_mut()
            .entry(window_id)
            .or_insert_with(|| Rc::new(Mutex::new(())))
            .clone()
    }

    /// Run `operation` once every earlier operation on `window_id` is done
    pub async fn run<F, T>(&self, window_id: WindowId, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let lock = self.lock_for(window_id);
        let _guard = lock.lock().await;
        operation.await
    }
}
