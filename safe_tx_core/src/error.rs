use alloy_primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No private key available for signer {0}")]
    KeyNotFound(Address),

    #[error("Failed to fetch wallet nonce: {0}")]
    NonceFetchFailed(String),

    #[error("Failed to broadcast transaction: {0}")]
    BroadcastFailed(String),

    #[error("Simulation unavailable: {0}")]
    SimulationUnavailable(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::TomlSerialization(err.to_string())
    }
}
