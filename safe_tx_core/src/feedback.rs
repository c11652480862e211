// User feedback plumbing: who owns feedback for a phase, and where toasts go

use crate::store::{RecordOutcome, TrackedRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Lifecycle phase a monitor reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Signing,
    Executing,
}

impl Phase {
    pub fn success_message(self) -> &'static str {
        match self {
            Phase::Signing => "Transaction signed successfully",
            Phase::Executing => "Transaction executed successfully",
        }
    }

    fn failure_label(self) -> &'static str {
        match self {
            Phase::Signing => "Signing",
            Phase::Executing => "Execution",
        }
    }

    pub fn failure_message(self, error: Option<&str>) -> String {
        format!(
            "{} failed: {}",
            self.failure_label(),
            error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or("Unknown error")
        )
    }

    /// Route prefixes whose screens report this phase themselves
    pub fn default_claims(self) -> &'static [&'static str] {
        match self {
            Phase::Signing => &[
                "/review-and-confirm",
                "/signing-success",
                "/signing-error",
                "/connect-hardware-signer",
            ],
            Phase::Executing => &[
                "/review-and-execute",
                "/execution-success",
                "/execution-error",
                "/connect-hardware-signer",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastOptions {
    pub duration_ms: u64,
    pub variant: Option<ToastVariant>,
}

/// A toast the monitor decided to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub variant: ToastVariant,
}

/// Sink for toast notifications
pub trait Notifier: Send + Sync {
    fn show(&self, message: &str, options: ToastOptions);
}

/// Synchronous source of the current route
pub trait LocationProvider: Send + Sync {
    fn current_location(&self) -> String;
}

/// Location holder the navigation layer writes into
#[derive(Debug, Clone, Default)]
pub struct SharedLocation {
    current: Arc<RwLock<String>>,
}

impl SharedLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(location.into())),
        }
    }

    pub fn set(&self, location: impl Into<String>) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = location.into();
    }
}

impl LocationProvider for SharedLocation {
    fn current_location(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Registration table of screens that take over feedback for a phase.
///
/// A claim is a route prefix; a location is owned when it starts with any
/// prefix claimed for the phase.
#[derive(Debug, Default)]
pub struct FeedbackClaims {
    claims: RwLock<HashMap<Phase, BTreeSet<String>>>,
}

impl FeedbackClaims {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table preloaded with the built-in screen claims for both phases
    pub fn with_defaults() -> Self {
        let table = Self::empty();
        for phase in [Phase::Signing, Phase::Executing] {
            for prefix in phase.default_claims() {
                table.claim(phase, *prefix);
            }
        }
        table
    }

    pub fn claim(&self, phase: Phase, prefix: impl Into<String>) {
        self.claims
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(phase)
            .or_default()
            .insert(prefix.into());
    }

    pub fn release(&self, phase: Phase, prefix: &str) -> bool {
        self.claims
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&phase)
            .map(|set| set.remove(prefix))
            .unwrap_or(false)
    }

    pub fn owns(&self, phase: Phase, location: &str) -> bool {
        self.claims
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&phase)
            .map(|set| set.iter().any(|prefix| location.starts_with(prefix.as_str())))
            .unwrap_or(false)
    }
}

/// Decide whether a terminal record should produce a toast.
///
/// Returns `None` for in-flight records and for locations whose screen owns
/// feedback for `phase`.
pub fn feedback_for<R: TrackedRecord>(
    phase: Phase,
    record: &R,
    location: &str,
    claims: &FeedbackClaims,
) -> Option<Toast> {
    let outcome = record.outcome()?;
    if claims.owns(phase, location) {
        return None;
    }
    Some(match outcome {
        RecordOutcome::Success => Toast {
            message: phase.success_message().to_string(),
            variant: ToastVariant::Success,
        },
        RecordOutcome::Error(error) => Toast {
            message: phase.failure_message(error),
            variant: ToastVariant::Error,
        },
    })
}
