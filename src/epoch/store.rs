// src/epoch/store.rs
//! Per-epoch memo for caches and datasets
//!
//! The store keeps the most recently requested epochs (a handful at most) and
//! hands out `Arc<EpochData>` handles. Generation happens inside the handle
//! through a `OnceLock`, so concurrent requesters for the same epoch block on
//! one generation instead of duplicating it, and eviction never invalidates a
//! handle somebody is still verifying against.

use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};

/// Lazily generated words for one epoch
#[derive(Debug)]
pub struct EpochData {
    epoch: u64,
    size: u64,
    words: OnceLock<Vec<u32>>,
}

impl EpochData {
    fn new(epoch: u64, size: u64) -> Self {
        EpochData {
            epoch,
            size,
            words: OnceLock::new(),
        }
    }

    /// Epoch this data belongs to
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the data, running `generate` if nobody has yet
    ///
    /// Concurrent callers wait for the first one's generation to finish.
    pub fn get_or_generate<F: FnOnce() -> Vec<u32>>(&self, generate: F) -> &[u32] {
        self.words.get_or_init(generate)
    }

    /// Returns the data only if it has already been generated
    pub fn get(&self) -> Option<&[u32]> {
        self.words.get().map(Vec::as_slice)
    }
}

struct StoreInner {
    items: HashMap<u64, Arc<EpochData>>,
    order: VecDeque<u64>,
}

/// Bounded least-recently-used set of epoch data
pub struct EpochStore {
    what: &'static str,
    capacity: usize,
    inner: Mutex<StoreInner>,
}

impl EpochStore {
    /// Creates a store retaining at most `capacity` epochs (at least one)
    ///
    /// # Arguments
    /// * `what` - Label for log lines ("cache", "dataset")
    /// * `capacity` - Number of epochs kept in memory
    pub fn new(what: &'static str, capacity: usize) -> Self {
        EpochStore {
            what,
            capacity: capacity.max(1),
            inner: Mutex::new(StoreInner {
                items: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Returns the handle for `epoch`, creating an empty one if needed
    ///
    /// The returned handle is not generated yet when it is new; call
    /// [`EpochData::get_or_generate`] outside of any store lock.
    pub fn get(&self, epoch: u64, size: u64) -> Arc<EpochData> {
        let mut inner = self.inner.lock();
        if let Some(item) = inner.items.get(&epoch).cloned() {
            inner.order.retain(|e| *e != epoch);
            inner.order.push_back(epoch);
            return item;
        }

        let item = Arc::new(EpochData::new(epoch, size));
        inner.items.insert(epoch, item.clone());
        inner.order.push_back(epoch);
        while inner.order.len() > self.capacity {
            if let Some(old) = inner.order.pop_front() {
                inner.items.remove(&old);
                debug!("Evicted {} for epoch {}", self.what, old);
            }
        }
        item
    }

    /// Returns the handle for `epoch` without creating or refreshing it
    pub fn peek(&self, epoch: u64) -> Option<Arc<EpochData>> {
        self.inner.lock().items.get(&epoch).cloned()
    }

    /// Number of epochs currently retained
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn generation_runs_once_under_contention() {
        let store = Arc::new(EpochStore::new("cache", 2));
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let runs = runs.clone();
                thread::spawn(move || {
                    let item = store.get(3, 16);
                    let words = item.get_or_generate(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        vec![7; 4]
                    });
                    words.to_vec()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![7; 4]);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn oldest_epoch_is_evicted() {
        let store = EpochStore::new("dataset", 2);
        let first = store.get(0, 8);
        first.get_or_generate(|| vec![1, 2]);
        store.get(1, 8);
        store.get(2, 8);

        assert_eq!(store.len(), 2);
        assert!(store.peek(0).is_none());
        assert!(store.peek(1).is_some());
        // an evicted handle stays usable for whoever still holds it
        assert_eq!(first.get(), Some(&[1u32, 2][..]));
    }

    #[test]
    fn access_refreshes_recency() {
        let store = EpochStore::new("cache", 2);
        store.get(0, 8);
        store.get(1, 8);
        store.get(0, 8);
        store.get(2, 8);
        assert!(store.peek(0).is_some());
        assert!(store.peek(1).is_none());
    }

    #[test]
    fn peek_does_not_insert() {
        let store = EpochStore::new("cache", 1);
        assert!(store.peek(5).is_none());
        assert!(store.is_empty());
        assert!(store.get(5, 8).get().is_none());
    }
}
