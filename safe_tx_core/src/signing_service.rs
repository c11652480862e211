// Wraps a signing operation so its progress is visible in the signing store

use crate::error::CoreError;
use crate::models::SigningRecord;
use crate::store::{ExecutingStore, SigningStore};
use log::{debug, warn};
use std::future::Future;

pub type SigningResult<T> = Result<T, CoreError>;

pub struct SigningService {
    signing: SigningStore,
    executing: ExecutingStore,
}

impl SigningService {
    pub fn new(signing: SigningStore, executing: ExecutingStore) -> Self {
        Self { signing, executing }
    }

    /// Record a `signing` entry for `tx_id`, run `operation`, then write the
    /// terminal outcome for the signing monitor.
    ///
    /// If the caller stops waiting, the operation is dropped and the record
    /// stays `signing`. Callers that navigate away should keep the future
    /// alive (for example by spawning it) so the monitor still reports it.
    pub async fn sign<T, F>(&self, tx_id: &str, operation: F) -> SigningResult<T>
    where
        F: Future<Output = SigningResult<T>>,
    {
        let started = !self.executing.is_in_flight(tx_id)
            && self.signing.try_start(tx_id, SigningRecord::started());
        if !started {
            return Err(CoreError::Validation(format!(
                "Transaction {} is already being processed",
                tx_id
            )));
        }
        debug!("Signing {}", tx_id);

        let result = operation.await;
        match &result {
            Ok(_) => {
                self.signing.update(tx_id, |r| r.succeeded());
            }
            Err(e) => {
                warn!("Signing {} failed: {}", tx_id, e);
                self.signing.update(tx_id, |r| r.failed(e.to_string()));
            }
        }
        result
    }
}
