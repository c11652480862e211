// Turns a signer key plus fee parameters into a submitted Safe execution

use crate::error::CoreError;
use crate::key_store::KeyStore;
use crate::models::{
    ExecutingRecord, ExecutionMethod, FeeParams, PendingTxRecord, PendingTxStatus, SafeInfo,
};
use crate::pending::PendingTxTracker;
use crate::rpc_client::{BroadcastRequest, ChainRpc};
use crate::storage_trait::StorageBackend;
use crate::store::{ExecutingStore, SigningStore};
use alloy_primitives::Address;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

pub type ExecutorResult<T> = Result<T, CoreError>;

pub struct Executor {
    key_store: Arc<dyn KeyStore>,
    rpc: Arc<dyn ChainRpc>,
}

impl Executor {
    pub fn new(key_store: Arc<dyn KeyStore>, rpc: Arc<dyn ChainRpc>) -> Self {
        Self { key_store, rpc }
    }

    /// Execute a Safe transaction with the signer's private key.
    ///
    /// Steps run strictly in order and the first failure stops the rest:
    /// 1. resolve the key (absent or empty key is `KeyNotFound`)
    /// 2. fetch the signer's wallet nonce
    /// 3. broadcast
    ///
    /// Nothing is retried here. A retry is a new call.
    pub async fn execute(
        &self,
        chain_id: u64,
        safe: &SafeInfo,
        tx_id: &str,
        signer: Address,
        fee_params: Option<FeeParams>,
    ) -> ExecutorResult<PendingTxRecord> {
        let private_key = self
            .key_store
            .get_private_key(&signer)
            .await?
            .filter(|key| !key.is_empty())
            .ok_or(CoreError::KeyNotFound(signer))?;

        let wallet_nonce = self.rpc.get_nonce(chain_id, &signer).await?;
        debug!("Signer {} nonce {} for {}", signer, wallet_nonce, tx_id);

        let receipt = self
            .rpc
            .broadcast(BroadcastRequest {
                chain_id,
                safe,
                tx_id,
                private_key: &private_key,
                fee_params,
            })
            .await?;
        info!("Broadcast {} on chain {}: {}", tx_id, chain_id, receipt.hash);

        Ok(PendingTxRecord {
            status: PendingTxStatus::Processing,
            chain_id,
            safe_address: safe.address,
            tx_hash: receipt.hash,
            wallet_address: signer,
            wallet_nonce,
            submitted_at: Utc::now(),
            error: None,
        })
    }
}

/// Runs an execution while keeping the executing and pending stores current.
pub struct ExecutionService<S> {
    executor: Executor,
    signing: SigningStore,
    executing: ExecutingStore,
    tracker: Arc<PendingTxTracker<S>>,
}

impl<S: StorageBackend> ExecutionService<S> {
    pub fn new(
        executor: Executor,
        signing: SigningStore,
        executing: ExecutingStore,
        tracker: Arc<PendingTxTracker<S>>,
    ) -> Self {
        Self { executor, signing, executing, tracker }
    }

    /// Execute `tx_id` with a private key.
    ///
    /// The outcome always lands in the executing store as a terminal record
    /// for the executing monitor to pick up. On success the pending record is
    /// tracked (and persisted) before the executing record turns terminal.
    /// A transaction that is still being signed or executed is rejected
    /// without touching its records.
    pub async fn execute(
        &self,
        chain_id: u64,
        safe: &SafeInfo,
        tx_id: &str,
        signer: Address,
        fee_params: Option<FeeParams>,
    ) -> ExecutorResult<PendingTxRecord> {
        let started = !self.signing.is_in_flight(tx_id)
            && self
                .executing
                .try_start(tx_id, ExecutingRecord::started(ExecutionMethod::PrivateKey));
        if !started {
            return Err(CoreError::Validation(format!(
                "Transaction {} is already being processed",
                tx_id
            )));
        }

        match self.executor.execute(chain_id, safe, tx_id, signer, fee_params).await {
            Ok(record) => {
                // the transaction is on its way regardless of whether the
                // pending map could be written to disk
                if let Err(e) = self.tracker.track(tx_id, record.clone()).await {
                    warn!("Failed to persist pending transaction {}: {}", tx_id, e);
                }
                self.executing.update(tx_id, |r| r.succeeded());
                Ok(record)
            }
            Err(e) => {
                warn!("Execution of {} failed: {}", tx_id, e);
                self.executing.update(tx_id, |r| r.failed(e.to_string()));
                Err(e)
            }
        }
    }
}
