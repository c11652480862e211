use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::store::{RecordOutcome, TrackedRecord};

/// Lifecycle of a signing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningStatus {
    Signing,
    Success,
    Error,
}

/// In-memory record of one signing attempt, keyed by transaction id.
#[derive(Debug, Clone)]
pub struct SigningRecord {
    pub status: SigningStatus,
    pub started_at: Instant,
    pub completed_at: Option<Instant>,
    pub error: Option<String>,
}

impl SigningRecord {
    pub fn started() -> Self {
        Self {
            status: SigningStatus::Signing,
            started_at: Instant::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn succeeded(self) -> Self {
        Self {
            status: SigningStatus::Success,
            completed_at: Some(Instant::now()),
            error: None,
            ..self
        }
    }

    pub fn failed(self, error: impl Into<String>) -> Self {
        Self {
            status: SigningStatus::Error,
            completed_at: Some(Instant::now()),
            error: Some(error.into()),
            ..self
        }
    }
}

impl TrackedRecord for SigningRecord {
    fn outcome(&self) -> Option<RecordOutcome<'_>> {
        match self.status {
            SigningStatus::Signing => None,
            SigningStatus::Success => Some(RecordOutcome::Success),
            SigningStatus::Error => Some(RecordOutcome::Error(self.error.as_deref())),
        }
    }
}

/// How an execution attempt reaches the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMethod {
    PrivateKey,
    Relay,
    HardwareSigner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutingStatus {
    Executing,
    Success,
    Error,
}

/// In-memory record of one execution attempt, keyed by transaction id.
#[derive(Debug, Clone)]
pub struct ExecutingRecord {
    pub status: ExecutingStatus,
    pub started_at: Instant,
    pub completed_at: Option<Instant>,
    pub error: Option<String>,
    pub execution_method: ExecutionMethod,
}

impl ExecutingRecord {
    pub fn started(execution_method: ExecutionMethod) -> Self {
        Self {
            status: ExecutingStatus::Executing,
            started_at: Instant::now(),
            completed_at: None,
            error: None,
            execution_method,
        }
    }

    pub fn succeeded(self) -> Self {
        Self {
            status: ExecutingStatus::Success,
            completed_at: Some(Instant::now()),
            error: None,
            ..self
        }
    }

    pub fn failed(self, error: impl Into<String>) -> Self {
        Self {
            status: ExecutingStatus::Error,
            completed_at: Some(Instant::now()),
            error: Some(error.into()),
            ..self
        }
    }
}

impl TrackedRecord for ExecutingRecord {
    fn outcome(&self) -> Option<RecordOutcome<'_>> {
        match self.status {
            ExecutingStatus::Executing => None,
            ExecutingStatus::Success => Some(RecordOutcome::Success),
            ExecutingStatus::Error => Some(RecordOutcome::Error(self.error.as_deref())),
        }
    }
}

/// On-chain progress of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingTxStatus {
    Processing,
    Indexing,
    Success,
    Failed,
}

impl PendingTxStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PendingTxStatus::Success | PendingTxStatus::Failed)
    }
}

/// A broadcast transaction awaiting confirmation and indexing.
/// This is the only record that survives a process restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTxRecord {
    pub status: PendingTxStatus,
    pub chain_id: u64,
    pub safe_address: Address,
    pub tx_hash: B256,
    pub wallet_address: Address,
    /// Nonce of the signer's wallet, not of the Safe
    pub wallet_nonce: u64,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PendingTxRecord {
    pub fn is_pending_on_chain(&self) -> bool {
        !self.status.is_terminal()
    }
}

impl TrackedRecord for PendingTxRecord {
    fn outcome(&self) -> Option<RecordOutcome<'_>> {
        match self.status {
            PendingTxStatus::Processing | PendingTxStatus::Indexing => None,
            PendingTxStatus::Success => Some(RecordOutcome::Success),
            PendingTxStatus::Failed => Some(RecordOutcome::Error(self.error.as_deref())),
        }
    }
}

/// Current on-chain configuration of a Safe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    pub address: Address,
    pub chain_id: u64,
    pub threshold: u64,
    pub nonce: u64,
    pub owners: Vec<Address>,
    #[serde(default)]
    pub guard: Option<Address>,
}

impl SafeInfo {
    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }
}

/// A proposed Safe transaction together with the signers that already confirmed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransaction {
    #[serde(default)]
    pub safe_tx_hash: Option<B256>,
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    pub nonce: u64,
    #[serde(default)]
    pub signers: Vec<Address>,
}

/// EIP-1559 fee parameters. Absent params mean the broadcaster estimates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeParams {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    #[serde(default)]
    pub gas_limit: Option<u64>,
}
