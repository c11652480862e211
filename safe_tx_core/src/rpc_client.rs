// Chain RPC abstraction used by the executor

use crate::error::CoreError;
use crate::key_store::PrivateKey;
use crate::models::{FeeParams, SafeInfo};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, CoreError>;

/// Everything the broadcaster needs to sign and submit an execution
#[derive(Debug, Clone, Copy)]
pub struct BroadcastRequest<'a> {
    pub chain_id: u64,
    pub safe: &'a SafeInfo,
    pub tx_id: &'a str,
    pub private_key: &'a PrivateKey,
    /// `None` lets the broadcaster estimate fees itself
    pub fee_params: Option<FeeParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReceipt {
    pub hash: B256,
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Current transaction count of `address`.
    /// Failures should be reported as `CoreError::NonceFetchFailed`.
    async fn get_nonce(&self, chain_id: u64, address: &Address) -> RpcResult<u64>;

    /// Sign and submit the Safe execution.
    /// Failures should be reported as `CoreError::BroadcastFailed`.
    async fn broadcast(&self, request: BroadcastRequest<'_>) -> RpcResult<BroadcastReceipt>;
}
