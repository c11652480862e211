// Tracks broadcast transactions until the indexer reports their final result.
// The record map is persisted after every change so in-flight submissions
// survive a restart.

use crate::error::CoreError;
use crate::models::{PendingTxRecord, PendingTxStatus};
use crate::storage_trait::{keys, StorageBackend};
use crate::store::{TrackedRecord, TxStore};
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type TrackerResult<T> = Result<T, CoreError>;

/// What the indexing collaborator observed for a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexerEventKind {
    /// Included in a block, not yet visible in the indexer
    Confirmed,
    /// Indexer reflects the final result
    Indexed { success: bool, error: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerEvent {
    pub tx_id: String,
    pub kind: IndexerEventKind,
}

impl IndexerEvent {
    pub fn confirmed(tx_id: impl Into<String>) -> Self {
        Self { tx_id: tx_id.into(), kind: IndexerEventKind::Confirmed }
    }

    pub fn indexed(tx_id: impl Into<String>, success: bool, error: Option<String>) -> Self {
        Self {
            tx_id: tx_id.into(),
            kind: IndexerEventKind::Indexed { success, error },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied(PendingTxStatus),
    /// Re-delivered or out-of-order event, nothing changed
    Ignored,
    UnknownTx,
}

/// Next status for `current` given `kind`, or `None` if the event does not
/// move the record forward.
fn next_status(current: PendingTxStatus, kind: &IndexerEventKind) -> Option<PendingTxStatus> {
    match (current, kind) {
        (PendingTxStatus::Processing, IndexerEventKind::Confirmed) => Some(PendingTxStatus::Indexing),
        (
            PendingTxStatus::Processing | PendingTxStatus::Indexing,
            IndexerEventKind::Indexed { success, .. },
        ) => Some(if *success { PendingTxStatus::Success } else { PendingTxStatus::Failed }),
        _ => None,
    }
}

type Snapshot = BTreeMap<String, PendingTxRecord>;

pub struct PendingTxTracker<S> {
    store: TxStore<PendingTxRecord>,
    storage: Arc<S>,
    // held from snapshot to completed write so an older map never lands last
    write_lock: Mutex<()>,
}

impl<S: StorageBackend> PendingTxTracker<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            store: TxStore::new(),
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Rebuild the tracker from the persisted map
    pub async fn restore(storage: Arc<S>) -> TrackerResult<Self> {
        let saved: Option<Snapshot> = storage.load(keys::PENDING_TXS).await?;
        let tracker = Self::new(storage);
        if let Some(saved) = saved {
            info!("Restored {} pending transactions", saved.len());
            for (tx_id, record) in saved {
                tracker.store.set(tx_id, record);
            }
        }
        Ok(tracker)
    }

    /// Read-side handle on the in-memory records
    pub fn store(&self) -> &TxStore<PendingTxRecord> {
        &self.store
    }

    pub fn get(&self, tx_id: &str) -> Option<PendingTxRecord> {
        self.store.get(tx_id)
    }

    pub fn list(&self) -> Vec<(String, PendingTxRecord)> {
        let mut records = self.store.list();
        records.sort_by(|a, b| a.1.submitted_at.cmp(&b.1.submitted_at).then_with(|| a.0.cmp(&b.0)));
        records
    }

    pub fn is_pending_on_chain(&self, tx_id: &str) -> bool {
        self.store
            .get(tx_id)
            .map(|r| r.is_pending_on_chain())
            .unwrap_or(false)
    }

    async fn persist(&self) -> TrackerResult<()> {
        let _guard = self.write_lock.lock().await;
        let snapshot: Snapshot = self.store.list().into_iter().collect();
        self.write(&snapshot).await
    }

    async fn write(&self, snapshot: &Snapshot) -> TrackerResult<()> {
        if snapshot.is_empty() {
            self.storage.remove(keys::PENDING_TXS).await
        } else {
            self.storage.save(keys::PENDING_TXS, snapshot).await
        }
    }

    /// Start tracking a freshly broadcast transaction
    pub async fn track(&self, tx_id: &str, record: PendingTxRecord) -> TrackerResult<()> {
        info!("Tracking {} ({:?}) tx_hash={}", tx_id, record.status, record.tx_hash);
        self.store.set(tx_id, record);
        self.persist().await
    }

    /// Apply one indexer event. Events that would not move the record forward
    /// are ignored, so re-delivery is harmless.
    pub async fn apply(&self, event: &IndexerEvent) -> TrackerResult<Transition> {
        let transition = self.store.modify(&event.tx_id, |record| {
            match next_status(record.status, &event.kind) {
                Some(status) => {
                    record.status = status;
                    if let IndexerEventKind::Indexed { error, .. } = &event.kind {
                        record.error = if status == PendingTxStatus::Failed {
                            error.clone()
                        } else {
                            None
                        };
                    }
                    Transition::Applied(status)
                }
                None => Transition::Ignored,
            }
        });

        match transition {
            Some(Transition::Applied(status)) => {
                info!("{} -> {:?}", event.tx_id, status);
                self.persist().await?;
                Ok(Transition::Applied(status))
            }
            Some(other) => {
                debug!("Ignoring {:?} for {}", event.kind, event.tx_id);
                Ok(other)
            }
            None => {
                debug!("Indexer event for untracked transaction {}", event.tx_id);
                Ok(Transition::UnknownTx)
            }
        }
    }

    /// Drain an indexer feed until it ends. Returns how many events moved a
    /// record forward. A stalled feed simply leaves records pending.
    pub async fn follow<St>(&self, mut feed: St) -> usize
    where
        St: Stream<Item = IndexerEvent> + Unpin,
    {
        let mut applied = 0;
        while let Some(event) = feed.next().await {
            match self.apply(&event).await {
                Ok(Transition::Applied(_)) => applied += 1,
                Ok(_) => {}
                Err(e) => warn!("Failed to persist transition for {}: {}", event.tx_id, e),
            }
        }
        applied
    }

    /// Remove settled records. The remainder is written first, so a failed
    /// write leaves memory and disk both holding the settled records.
    pub async fn take_terminal(&self) -> TrackerResult<Vec<(String, PendingTxRecord)>> {
        let _guard = self.write_lock.lock().await;
        let (settled, remainder): (Vec<_>, Vec<_>) =
            self.store.list().into_iter().partition(|(_, r)| r.is_terminal());
        if settled.is_empty() {
            return Ok(Vec::new());
        }
        let remainder: Snapshot = remainder.into_iter().collect();
        self.write(&remainder).await?;
        Ok(self.store.take_terminal())
    }
}

#[cfg(all(test, feature = "native"))]
mod tests {
    use super::*;
    use crate::native::FileStorage;
    use crate::storage_trait::StorageResult;
    use alloy_primitives::{Address, B256};
    use async_trait::async_trait;
    use chrono::Utc;
    use futures_util::stream;
    use serde::{de::DeserializeOwned, Serialize};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn record() -> PendingTxRecord {
        PendingTxRecord {
            status: PendingTxStatus::Processing,
            chain_id: 1,
            safe_address: Address::repeat_byte(0x51),
            tx_hash: B256::repeat_byte(0x77),
            wallet_address: Address::repeat_byte(0xaa),
            wallet_nonce: 3,
            submitted_at: Utc::now(),
            error: None,
        }
    }

    fn tracker(dir: &TempDir) -> PendingTxTracker<FileStorage> {
        PendingTxTracker::new(Arc::new(FileStorage::new(dir.path().to_path_buf())))
    }

    #[tokio::test]
    async fn test_forward_transitions_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tracker.track("tx1", record()).await.unwrap();
        assert!(tracker.is_pending_on_chain("tx1"));

        let confirmed = IndexerEvent::confirmed("tx1");
        assert_eq!(tracker.apply(&confirmed).await.unwrap(), Transition::Applied(PendingTxStatus::Indexing));
        assert_eq!(tracker.apply(&confirmed).await.unwrap(), Transition::Ignored);
        assert!(tracker.is_pending_on_chain("tx1"));

        let indexed = IndexerEvent::indexed("tx1", true, None);
        assert_eq!(tracker.apply(&indexed).await.unwrap(), Transition::Applied(PendingTxStatus::Success));
        assert_eq!(tracker.apply(&indexed).await.unwrap(), Transition::Ignored);
        // late confirmation never moves a settled record back
        assert_eq!(tracker.apply(&confirmed).await.unwrap(), Transition::Ignored);
        assert_eq!(tracker.get("tx1").unwrap().status, PendingTxStatus::Success);
        assert!(!tracker.is_pending_on_chain("tx1"));
    }

    #[tokio::test]
    async fn test_failure_keeps_error_and_unknown_is_ignored() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tracker.track("tx1", record()).await.unwrap();

        let failed = IndexerEvent::indexed("tx1", false, Some("GS013".to_string()));
        assert_eq!(tracker.apply(&failed).await.unwrap(), Transition::Applied(PendingTxStatus::Failed));
        assert_eq!(tracker.get("tx1").unwrap().error.as_deref(), Some("GS013"));

        let stray = IndexerEvent::confirmed("nope");
        assert_eq!(tracker.apply(&stray).await.unwrap(), Transition::UnknownTx);
        assert!(!tracker.is_pending_on_chain("nope"));
    }

    #[tokio::test]
    async fn test_restore_after_restart() {
        let dir = TempDir::new().unwrap();
        {
            let tracker = tracker(&dir);
            tracker.track("tx1", record()).await.unwrap();
            tracker.track("tx2", record()).await.unwrap();
            tracker.apply(&IndexerEvent::confirmed("tx2")).await.unwrap();
        }

        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()));
        let restored = PendingTxTracker::restore(storage).await.unwrap();
        assert_eq!(restored.list().len(), 2);
        assert_eq!(restored.get("tx1").unwrap().status, PendingTxStatus::Processing);
        assert_eq!(restored.get("tx2").unwrap().status, PendingTxStatus::Indexing);
    }

    #[tokio::test]
    async fn test_restore_from_empty_storage() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()));
        let restored = PendingTxTracker::restore(storage).await.unwrap();
        assert!(restored.list().is_empty());
    }

    #[tokio::test]
    async fn test_follow_feed_and_prune() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tracker.track("tx1", record()).await.unwrap();
        tracker.track("tx2", record()).await.unwrap();

        let feed = stream::iter(vec![
            IndexerEvent::confirmed("tx1"),
            IndexerEvent::confirmed("tx1"),
            IndexerEvent::indexed("tx1", true, None),
            IndexerEvent::confirmed("tx2"),
        ]);
        assert_eq!(tracker.follow(feed).await, 3);

        let settled = tracker.take_terminal().await.unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].0, "tx1");

        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()));
        let restored = PendingTxTracker::restore(storage).await.unwrap();
        assert!(restored.get("tx1").is_none());
        assert!(restored.is_pending_on_chain("tx2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_tracking_survives_restart() {
        let dir = TempDir::new().unwrap();
        let tracker = Arc::new(tracker(&dir));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.track(&format!("tx{}", i), record()).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()));
        let restored = PendingTxTracker::restore(storage).await.unwrap();
        assert_eq!(restored.list().len(), 16);
        assert!((0..16).all(|i| restored.is_pending_on_chain(&format!("tx{}", i))));
    }

    #[tokio::test]
    async fn test_pruning_everything_removes_document() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tracker.track("tx1", record()).await.unwrap();
        tracker.apply(&IndexerEvent::indexed("tx1", false, None)).await.unwrap();
        assert!(dir.path().join("pending_txs.json").exists());

        assert_eq!(tracker.take_terminal().await.unwrap().len(), 1);
        assert!(!dir.path().join("pending_txs.json").exists());
        assert!(tracker.take_terminal().await.unwrap().is_empty());
    }

    /// File storage whose writes can be switched off
    struct FlakyStorage {
        inner: FileStorage,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl StorageBackend for FlakyStorage {
        async fn save<T: Serialize + Sync>(&self, key: &str, data: &T) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CoreError::Storage("disk full".to_string()));
            }
            self.inner.save(key, data).await
        }

        async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
            self.inner.load(key).await
        }

        async fn remove(&self, key: &str) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CoreError::Storage("disk full".to_string()));
            }
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_prune_keeps_settled_records() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FlakyStorage {
            inner: FileStorage::new(dir.path().to_path_buf()),
            fail_writes: AtomicBool::new(false),
        });
        let tracker = PendingTxTracker::new(storage.clone());
        tracker.track("tx1", record()).await.unwrap();
        tracker.track("tx2", record()).await.unwrap();
        tracker.apply(&IndexerEvent::indexed("tx1", true, None)).await.unwrap();

        storage.fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(tracker.take_terminal().await, Err(CoreError::Storage(_))));
        assert_eq!(tracker.get("tx1").unwrap().status, PendingTxStatus::Success);

        storage.fail_writes.store(false, Ordering::SeqCst);
        let settled = tracker.take_terminal().await.unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].0, "tx1");

        let restored = PendingTxTracker::restore(storage).await.unwrap();
        assert!(restored.get("tx1").is_none());
        assert!(restored.is_pending_on_chain("tx2"));
    }
}
