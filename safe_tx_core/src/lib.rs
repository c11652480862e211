// Safe Tx Core Library
// Lifecycle tracking for multisig transactions: signing, execution,
// on-chain confirmation, user feedback and simulation overrides

pub mod models;
pub mod error;
pub mod store;
pub mod storage_trait;
pub mod settings;
pub mod feedback;
pub mod monitor;
pub mod key_store;
pub mod rpc_client;
pub mod executor;
pub mod signing_service;
pub mod pending;
pub mod activity;
pub mod simulation;

#[cfg(feature = "native")]
pub mod native;

// Re-exports
pub use error::CoreError;
pub use models::*;
pub use settings::Settings;
pub use store::*;
pub use storage_trait::*;
pub use feedback::*;
pub use monitor::*;
pub use key_store::*;
pub use rpc_client::*;
pub use executor::*;
pub use signing_service::*;
pub use pending::*;
pub use activity::*;
