// Pre-execution simulation of Safe transactions

pub mod overrides;

pub use overrides::{compute_overrides, StorageOverrides, GUARD_SLOT, NONCE_SLOT, THRESHOLD_SLOT};

use crate::error::CoreError;
use crate::models::{SafeInfo, SafeTransaction};
use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type SimulationResult<T> = Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateObject {
    pub storage: StorageOverrides,
}

/// Request body for the simulation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub network_id: String,
    pub from: Address,
    pub to: Address,
    pub input: Bytes,
    pub gas: u64,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_objects: Option<BTreeMap<Address, StateObject>>,
}

/// Build the request that simulates `execution_owner` executing
/// `transaction` on `safe`. `input` is the encoded execution calldata.
///
/// The override section is left out entirely when no slot needs patching.
pub fn build_simulation_request(
    safe: &SafeInfo,
    execution_owner: Address,
    transaction: &SafeTransaction,
    input: Bytes,
    gas: u64,
) -> SimulationRequest {
    let storage = compute_overrides(safe, execution_owner, transaction);
    let state_objects = if storage.is_empty() {
        None
    } else {
        debug!("Simulating {} with {} storage overrides", safe.address, storage.len());
        Some(BTreeMap::from([(safe.address, StateObject { storage })]))
    };

    SimulationRequest {
        network_id: safe.chain_id.to_string(),
        from: execution_owner,
        to: safe.address,
        input,
        gas,
        value: U256::ZERO,
        state_objects,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub success: bool,
    #[serde(default)]
    pub revert_reason: Option<String>,
    #[serde(default)]
    pub gas_used: Option<u64>,
}

#[async_trait]
pub trait SimulationBackend: Send + Sync {
    async fn simulate(&self, request: &SimulationRequest) -> SimulationResult<SimulationResponse>;
}

/// What the UI shows for a simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationStatus {
    Success { gas_used: Option<u64> },
    Reverted { reason: Option<String> },
    /// Backend could not be reached; rendered as a neutral state and never
    /// blocks execution
    Unavailable { reason: String },
}

pub async fn simulate_transaction(
    backend: &dyn SimulationBackend,
    request: &SimulationRequest,
) -> SimulationStatus {
    match backend.simulate(request).await {
        Ok(response) if response.success => SimulationStatus::Success {
            gas_used: response.gas_used,
        },
        Ok(response) => SimulationStatus::Reverted {
            reason: response.revert_reason,
        },
        Err(e) => {
            warn!("Simulation for {} unavailable: {}", request.to, e);
            SimulationStatus::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}
