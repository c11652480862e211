// Keyed transaction state stores
// One owned handle per lifecycle phase, shared by cloning

use crate::models::{ExecutingRecord, SigningRecord};
use log::trace;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// How a finished record ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome<'a> {
    Success,
    Error(Option<&'a str>),
}

/// A record whose lifecycle ends in a terminal outcome
pub trait TrackedRecord: Clone + Send + 'static {
    /// `None` while the record is still in flight
    fn outcome(&self) -> Option<RecordOutcome<'_>>;

    fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }
}

struct StoreInner<R> {
    records: Mutex<HashMap<String, R>>,
    version: watch::Sender<u64>,
}

/// Map of transaction id to record with change notification.
///
/// Writes are last-write-wins per key and serialized through an internal lock
/// that is never held across an await point. Every write bumps a version
/// counter so subscribers can react in the same update cycle.
pub struct TxStore<R> {
    inner: Arc<StoreInner<R>>,
}

impl<R> Clone for TxStore<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> Default for TxStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> TxStore<R> {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                records: Mutex::new(HashMap::new()),
                version,
            }),
        }
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, R>> {
        self.inner
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.inner.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Receiver that changes whenever the store is written
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    pub fn set(&self, tx_id: impl Into<String>, record: R) {
        let tx_id = tx_id.into();
        trace!("store set {}", tx_id);
        self.records().insert(tx_id, record);
        self.notify();
    }

    /// Replace the record for `tx_id` with `f(record)`. Returns false if absent.
    pub fn update<F>(&self, tx_id: &str, f: F) -> bool
    where
        F: FnOnce(R) -> R,
    {
        let updated = {
            let mut records = self.records();
            match records.remove(tx_id) {
                Some(record) => {
                    records.insert(tx_id.to_string(), f(record));
                    true
                }
                None => false,
            }
        };
        if updated {
            self.notify();
        }
        updated
    }

    pub fn clear(&self, tx_id: &str) -> Option<R> {
        let removed = self.records().remove(tx_id);
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

impl<R: Clone> TxStore<R> {
    pub fn get(&self, tx_id: &str) -> Option<R> {
        self.records().get(tx_id).cloned()
    }

    pub fn list(&self) -> Vec<(String, R)> {
        self.records()
            .iter()
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect()
    }
}

impl<R: Clone + PartialEq> TxStore<R> {
    /// Run `f` on the record in place under the store lock.
    /// Returns `None` without calling `f` if the record is absent. Subscribers
    /// are only woken when `f` actually changed the record.
    pub fn modify<T, F>(&self, tx_id: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut R) -> T,
    {
        let (result, changed) = {
            let mut records = self.records();
            let record = records.get_mut(tx_id)?;
            let before = record.clone();
            let result = f(&mut *record);
            let changed = *record != before;
            (result, changed)
        };
        if changed {
            self.notify();
        }
        Some(result)
    }
}

impl<R: TrackedRecord> TxStore<R> {
    /// Insert `record` unless `tx_id` already has an unfinished record.
    /// The check and the insert happen under one lock acquisition.
    pub fn try_start(&self, tx_id: &str, record: R) -> bool {
        let started = {
            let mut records = self.records();
            if records.get(tx_id).is_some_and(|r| !r.is_terminal()) {
                false
            } else {
                records.insert(tx_id.to_string(), record);
                true
            }
        };
        if started {
            trace!("store start {}", tx_id);
            self.notify();
        }
        started
    }

    /// Atomically remove and return every terminal record.
    /// In-flight records stay in place.
    pub fn take_terminal(&self) -> Vec<(String, R)> {
        let taken: Vec<(String, R)> = {
            let mut records = self.records();
            let ids: Vec<String> = records
                .iter()
                .filter(|(_, r)| r.is_terminal())
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| records.remove(&id).map(|r| (id, r)))
                .collect()
        };
        if !taken.is_empty() {
            self.notify();
        }
        taken
    }

    /// True if `tx_id` has a record that has not finished yet
    pub fn is_in_flight(&self, tx_id: &str) -> bool {
        self.records()
            .get(tx_id)
            .map(|r| !r.is_terminal())
            .unwrap_or(false)
    }
}

pub type SigningStore = TxStore<SigningRecord>;
pub type ExecutingStore = TxStore<ExecutingRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExecutionMethod, SigningStatus};

    #[test]
    fn test_set_get_clear() {
        let store = SigningStore::new();
        assert!(store.get("tx1").is_none());

        store.set("tx1", SigningRecord::started());
        assert_eq!(store.get("tx1").unwrap().status, SigningStatus::Signing);
        assert_eq!(store.len(), 1);

        // last write wins
        store.set("tx1", SigningRecord::started().failed("nope"));
        assert_eq!(store.get("tx1").unwrap().status, SigningStatus::Error);
        assert_eq!(store.list().len(), 1);

        assert!(store.clear("tx1").is_some());
        assert!(store.clear("tx1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_only_touches_existing() {
        let store = ExecutingStore::new();
        assert!(!store.update("missing", |r| r.succeeded()));

        store.set("tx1", ExecutingRecord::started(ExecutionMethod::PrivateKey));
        assert!(store.is_in_flight("tx1"));
        assert!(store.update("tx1", |r| r.succeeded()));
        assert!(!store.is_in_flight("tx1"));
    }

    #[test]
    fn test_take_terminal_leaves_in_flight() {
        let store = SigningStore::new();
        store.set("a", SigningRecord::started().succeeded());
        store.set("b", SigningRecord::started());
        store.set("c", SigningRecord::started().failed("x"));

        let mut taken: Vec<String> = store.take_terminal().into_iter().map(|(id, _)| id).collect();
        taken.sort();
        assert_eq!(taken, vec!["a".to_string(), "c".to_string()]);
        assert!(store.take_terminal().is_empty());
        assert!(store.get("b").is_some());
    }

    #[test]
    fn test_try_start_refuses_in_flight() {
        let store = ExecutingStore::new();
        assert!(store.try_start("tx1", ExecutingRecord::started(ExecutionMethod::PrivateKey)));
        assert!(!store.try_start("tx1", ExecutingRecord::started(ExecutionMethod::Relay)));
        assert_eq!(store.get("tx1").unwrap().execution_method, ExecutionMethod::PrivateKey);

        // a finished record can be replaced by a new attempt
        store.update("tx1", |r| r.failed("reverted"));
        assert!(store.try_start("tx1", ExecutingRecord::started(ExecutionMethod::Relay)));
        assert_eq!(store.get("tx1").unwrap().execution_method, ExecutionMethod::Relay);
    }

    #[test]
    fn test_try_start_admits_one_of_many_threads() {
        let store = SigningStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.try_start("tx1", SigningRecord::started()))
            })
            .collect();
        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|started| *started)
            .count();
        assert_eq!(started, 1);
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Counter(u32);

    #[test]
    fn test_modify_without_change_does_not_notify() {
        let store: TxStore<Counter> = TxStore::new();
        store.set("tx1", Counter(1));
        let rx = store.subscribe();

        assert_eq!(store.modify("tx1", |r| r.0), Some(1));
        assert!(!rx.has_changed().unwrap());

        assert_eq!(store.modify("tx1", |r| r.0 += 1), Some(()));
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.modify("missing", |r| r.0), None);
    }

    #[test]
    fn test_writes_bump_version() {
        let store = SigningStore::new();
        let rx = store.subscribe();
        let before = *rx.borrow();

        store.set("tx1", SigningRecord::started());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), before + 1);

        // clones share state
        let other = store.clone();
        other.clear("tx1");
        assert!(store.get("tx1").is_none());
    }
}
