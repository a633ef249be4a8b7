//! At-most-one computation per key.
//!
//! Concurrent requests for the same uncached tile share one render: the
//! first caller runs the computation and everyone else awaits its result.
//! The entry is dropped once the computation finishes, so later requests go
//! back through the cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

pub struct InFlight<T> {
    cells: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> InFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `compute` for `key` unless a computation for it is already in
    /// flight, in which case wait for that one instead.
    ///
    /// If the caller running `compute` is cancelled, one of the waiters
    /// takes over.
    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let value = cell.get_or_init(compute).await.clone();

        let mut cells = self.cells.lock().await;
        if cells.get(key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            cells.remove(key);
        }

        value
    }

    /// Number of keys currently being computed.
    pub async fn len(&self) -> usize {
        self.cells.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
