// Read-side join of the three stores into a single busy signal per transaction

use crate::models::PendingTxRecord;
use crate::store::{ExecutingStore, SigningStore, TxStore};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxActivity {
    pub is_signing: bool,
    pub is_executing: bool,
    pub is_pending_on_chain: bool,
    pub is_processing: bool,
}

#[derive(Clone)]
pub struct ActivityView {
    signing: SigningStore,
    executing: ExecutingStore,
    pending: TxStore<PendingTxRecord>,
}

impl ActivityView {
    pub fn new(
        signing: SigningStore,
        executing: ExecutingStore,
        pending: TxStore<PendingTxRecord>,
    ) -> Self {
        Self { signing, executing, pending }
    }

    /// Recomputed from the stores on every call. Unknown ids are idle.
    pub fn aggregate(&self, tx_id: &str) -> TxActivity {
        let is_signing = self.signing.is_in_flight(tx_id);
        let is_executing = self.executing.is_in_flight(tx_id);
        let is_pending_on_chain = self.pending.is_in_flight(tx_id);
        TxActivity {
            is_signing,
            is_executing,
            is_pending_on_chain,
            is_processing: is_signing || is_executing || is_pending_on_chain,
        }
    }
}
