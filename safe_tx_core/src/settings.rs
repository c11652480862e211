use crate::error::CoreError;
use crate::feedback::{FeedbackClaims, Phase, ToastOptions, ToastVariant};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "default_success_toast_ms")]
    pub success_toast_ms: u64,
    #[serde(default = "default_error_toast_ms")]
    pub error_toast_ms: u64,
    #[serde(default = "default_simulation_gas_limit")]
    pub simulation_gas_limit: u64,
    #[serde(default)]
    pub signing_claims: Vec<String>,
    #[serde(default)]
    pub executing_claims: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            success_toast_ms: default_success_toast_ms(),
            error_toast_ms: default_error_toast_ms(),
            simulation_gas_limit: default_simulation_gas_limit(),
            signing_claims: Vec::new(),
            executing_claims: Vec::new(),
        }
    }
}

impl Settings {
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), CoreError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Validate settings ranges and constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.storage_dir.trim().is_empty() {
            return Err(CoreError::Validation("storage_dir must not be empty".to_string()));
        }
        if self.success_toast_ms == 0 || self.error_toast_ms == 0 {
            return Err(CoreError::Validation("toast durations must be > 0".to_string()));
        }
        if self.simulation_gas_limit == 0 {
            return Err(CoreError::Validation("simulation_gas_limit must be > 0".to_string()));
        }
        let claims = self.signing_claims.iter().chain(self.executing_claims.iter());
        for prefix in claims {
            if !prefix.starts_with('/') {
                return Err(CoreError::Validation(format!(
                    "route claim '{}' must start with '/'",
                    prefix
                )));
            }
        }
        Ok(())
    }

    pub fn toast_options(&self, variant: ToastVariant) -> ToastOptions {
        let duration_ms = match variant {
            ToastVariant::Success => self.success_toast_ms,
            ToastVariant::Error => self.error_toast_ms,
        };
        ToastOptions {
            duration_ms,
            variant: Some(variant),
        }
    }

    /// Built-in screen claims plus the configured extras
    pub fn feedback_claims(&self) -> FeedbackClaims {
        let claims = FeedbackClaims::with_defaults();
        for prefix in &self.signing_claims {
            claims.claim(Phase::Signing, prefix.clone());
        }
        for prefix in &self.executing_claims {
            claims.claim(Phase::Executing, prefix.clone());
        }
        claims
    }
}

fn default_storage_dir() -> String { ".safe_tx".to_string() }
fn default_success_toast_ms() -> u64 { 3000 }
fn default_error_toast_ms() -> u64 { 5000 }
fn default_simulation_gas_limit() -> u64 { 10_000_000 }
