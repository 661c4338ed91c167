//! In-memory settlement collaborator for tests.

use std::sync::{Arc, Mutex, MutexGuard};

use veilmatch_types::{Result, SettlementRef, VeilmatchError};

use crate::settlement::SettlementClient;

#[derive(Debug, Default)]
struct SettlementState {
    next_ref: u64,
    fail: bool,
    transfers: Vec<(String, String, u64)>,
}

/// Records every authorized transfer; can be switched to reject.
#[derive(Debug, Clone, Default)]
pub struct MockSettlement {
    inner: Arc<Mutex<SettlementState>>,
}

impl MockSettlement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SettlementState> {
        self.inner.lock().expect("mock settlement lock")
    }

    pub fn set_fail(&self, fail: bool) {
        self.lock().fail = fail;
    }

    /// `(payer, provider, amount)` triples, in authorization order.
    #[must_use]
    pub fn transfers(&self) -> Vec<(String, String, u64)> {
        self.lock().transfers.clone()
    }
}

impl SettlementClient for MockSettlement {
    async fn authorize_transfer(
        &self,
        payer_address: &str,
        provider_address: &str,
        amount: u64,
    ) -> Result<SettlementRef> {
        let mut st = self.lock();
        if st.fail {
            return Err(VeilmatchError::SettlementRejected {
                reason: "mock: settlement disabled".into(),
            });
        }
        st.next_ref += 1;
        st.transfers.push((
            payer_address.to_string(),
            provider_address.to_string(),
            amount,
        ));
        Ok(SettlementRef(format!("settle-{}", st.next_ref)))
    }
}
