// Signing key lookup, backed by whatever key custody the host provides

use crate::error::CoreError;
use alloy_primitives::Address;
use async_trait::async_trait;
use std::fmt;

pub type KeyStoreResult<T> = Result<T, CoreError>;

/// Hex-encoded private key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

#[async_trait]
pub trait KeyStore: Send + Sync {
    /// `Ok(None)` when no key is stored for `address`, which callers treat as
    /// a normal condition. Transport failures come back as `Err`.
    async fn get_private_key(&self, address: &Address) -> KeyStoreResult<Option<PrivateKey>>;
}
