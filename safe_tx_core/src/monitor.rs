// Background observers that turn finished signing/executing records into
// user feedback and then consume them

use crate::feedback::{feedback_for, FeedbackClaims, LocationProvider, Notifier, Phase};
use crate::models::{ExecutingRecord, SigningRecord};
use crate::settings::Settings;
use crate::store::{TrackedRecord, TxStore};
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::watch;

/// Outcome of a single monitor pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorPass {
    /// Transaction ids consumed in this pass
    pub cleared: Vec<String>,
    /// How many of them produced a toast
    pub toasts: usize,
}

pub struct TxMonitor<R> {
    phase: Phase,
    store: TxStore<R>,
    claims: Arc<FeedbackClaims>,
    location: Arc<dyn LocationProvider>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<Settings>,
}

pub type SigningMonitor = TxMonitor<SigningRecord>;
pub type ExecutingMonitor = TxMonitor<ExecutingRecord>;

impl<R: TrackedRecord> TxMonitor<R> {
    pub fn new(
        phase: Phase,
        store: TxStore<R>,
        claims: Arc<FeedbackClaims>,
        location: Arc<dyn LocationProvider>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            phase,
            store,
            claims,
            location,
            notifier,
            settings,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Consume every terminal record currently in the store.
    ///
    /// Records are removed from the store before any feedback is emitted, so a
    /// record is never reported twice even if passes overlap. Records still in
    /// flight are left for a later pass.
    pub fn pass(&self) -> MonitorPass {
        let finished = self.store.take_terminal();
        if finished.is_empty() {
            return MonitorPass::default();
        }

        let location = self.location.current_location();
        let mut report = MonitorPass::default();
        for (tx_id, record) in finished {
            match feedback_for(self.phase, &record, &location, &self.claims) {
                Some(toast) => {
                    info!("{:?} finished for {}: {}", self.phase, tx_id, toast.message);
                    self.notifier
                        .show(&toast.message, self.settings.toast_options(toast.variant));
                    report.toasts += 1;
                }
                None => {
                    debug!(
                        "{:?} feedback for {} handled by screen at {}",
                        self.phase, tx_id, location
                    );
                }
            }
            report.cleared.push(tx_id);
        }
        report
    }

    /// Run a pass after every store update until `shutdown` flips to true
    /// or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut updates = self.store.subscribe();
        debug!("{:?} monitor started", self.phase);
        self.pass();
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.pass();
                }
                stop = shutdown.changed() => {
                    if stop.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("{:?} monitor stopped", self.phase);
    }
}
