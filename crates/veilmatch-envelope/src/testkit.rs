//! In-memory ledger and committee for tests.
//!
//! `MockChain` plays both collaborator roles against shared state, so a
//! sealed payload submitted through its ledger side can be unsealed
//! through its committee side. Sealing is transparent: amounts are
//! big-endian bytes and calls are JSON, which keeps assertions readable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use veilmatch_types::{
    AuctionRef, Ciphertext, LedgerCall, Result, ServiceCategory, SubmissionRef, UnsealedCall,
    VeilmatchError,
};

use crate::collaborators::{CommitteeClient, LedgerClient};

#[derive(Debug)]
struct ChainState {
    next_auction: u64,
    next_submission: u64,
    committee_healthy: bool,
    /// Polls remaining per auction before `condition_met` reports true.
    polls_until_condition: HashMap<u64, u32>,
    default_polls: u32,
    submissions: HashMap<String, UnsealedCall>,
    plain_calls: Vec<LedgerCall>,
    auctions: Vec<(ServiceCategory, u64, u64)>,
    fail_create_auction: bool,
    fail_submit: bool,
    fail_unseal: bool,
    fail_unseal_call: bool,
    unseal_amount_delta: u64,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            next_auction: 1,
            next_submission: 1,
            committee_healthy: true,
            polls_until_condition: HashMap::new(),
            default_polls: 0,
            submissions: HashMap::new(),
            plain_calls: Vec::new(),
            auctions: Vec::new(),
            fail_create_auction: false,
            fail_submit: false,
            fail_unseal: false,
            fail_unseal_call: false,
            unseal_amount_delta: 0,
        }
    }
}

/// Shared-state mock implementing both [`LedgerClient`] and
/// [`CommitteeClient`]. Clones share the same underlying chain.
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    inner: Arc<Mutex<ChainState>>,
}

impl MockChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.inner.lock().expect("mock chain lock")
    }

    // -----------------------------------------------------------------
    // Knobs
    // -----------------------------------------------------------------

    pub fn set_committee_healthy(&self, healthy: bool) {
        self.lock().committee_healthy = healthy;
    }

    pub fn set_fail_create_auction(&self, fail: bool) {
        self.lock().fail_create_auction = fail;
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.lock().fail_submit = fail;
    }

    pub fn set_fail_unseal(&self, fail: bool) {
        self.lock().fail_unseal = fail;
    }

    /// Fail only `unseal_call`, leaving `unseal_amount` working.
    pub fn set_fail_unseal_call(&self, fail: bool) {
        self.lock().fail_unseal_call = fail;
    }

    /// Skew every unsealed amount by a fixed offset, for tests pinning
    /// down which value downstream code trusts.
    pub fn set_unseal_amount_delta(&self, delta: u64) {
        self.lock().unseal_amount_delta = delta;
    }

    /// How many `condition_met` calls every auction answers `false`
    /// before flipping to `true`. Defaults to zero (met immediately).
    pub fn set_default_condition_polls(&self, polls: u32) {
        self.lock().default_polls = polls;
    }

    /// Pin one auction's condition so it is never met.
    pub fn set_condition_never(&self, auction: AuctionRef) {
        self.lock().polls_until_condition.insert(auction.0, u32::MAX);
    }

    // -----------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------

    /// Calls that went through the plaintext path, in submission order.
    #[must_use]
    pub fn plain_calls(&self) -> Vec<LedgerCall> {
        self.lock().plain_calls.clone()
    }

    #[must_use]
    pub fn sealed_submission_count(&self) -> usize {
        self.lock().submissions.len()
    }

    #[must_use]
    pub fn auction_count(&self) -> usize {
        self.lock().auctions.len()
    }
}

impl LedgerClient for MockChain {
    async fn create_auction(
        &self,
        category: &ServiceCategory,
        duration_secs: u64,
        min_amount: u64,
        max_amount: u64,
    ) -> Result<AuctionRef> {
        let mut st = self.lock();
        if st.fail_create_auction {
            return Err(VeilmatchError::AuctionCreateFailed {
                reason: "mock: create_auction disabled".into(),
            });
        }
        let _ = duration_secs;
        let auction = AuctionRef(st.next_auction);
        st.next_auction += 1;
        st.auctions.push((category.clone(), min_amount, max_amount));
        Ok(auction)
    }

    async fn submit_sealed_call(
        &self,
        target: AuctionRef,
        payload: &Ciphertext,
    ) -> Result<SubmissionRef> {
        let mut st = self.lock();
        if st.fail_submit {
            return Err(VeilmatchError::SubmitFailed {
                reason: "mock: submit disabled".into(),
            });
        }
        // Mock sealing is transparent JSON, so the "chain" can stash the
        // decrypted form for the committee side to hand back later.
        let Ciphertext::Sealed { bytes } = payload else {
            return Err(VeilmatchError::SubmitFailed {
                reason: "mock: placeholder submitted on the sealed path".into(),
            });
        };
        let call: LedgerCall = serde_json::from_slice(bytes)?;
        let submission = SubmissionRef(format!("sub-{}", st.next_submission));
        st.next_submission += 1;
        st.submissions
            .insert(submission.0.clone(), UnsealedCall { target, call });
        Ok(submission)
    }

    async fn submit_plain_call(&self, call: &LedgerCall) -> Result<SubmissionRef> {
        let mut st = self.lock();
        if st.fail_submit {
            return Err(VeilmatchError::SubmitFailed {
                reason: "mock: submit disabled".into(),
            });
        }
        let submission = SubmissionRef(format!("plain-{}", st.next_submission));
        st.next_submission += 1;
        st.plain_calls.push(call.clone());
        Ok(submission)
    }

    async fn condition_met(&self, auction: AuctionRef) -> Result<bool> {
        let mut st = self.lock();
        let default_polls = st.default_polls;
        let remaining = st
            .polls_until_condition
            .entry(auction.0)
            .or_insert(default_polls);
        if *remaining == 0 {
            Ok(true)
        } else {
            if *remaining != u32::MAX {
                *remaining -= 1;
            }
            Ok(false)
        }
    }
}

impl CommitteeClient for MockChain {
    async fn healthy(&self) -> bool {
        self.lock().committee_healthy
    }

    async fn seal_amount(&self, amount: u64) -> Result<Ciphertext> {
        if !self.lock().committee_healthy {
            return Err(VeilmatchError::CommitteeUnavailable);
        }
        Ok(Ciphertext::Sealed {
            bytes: amount.to_be_bytes().to_vec(),
        })
    }

    async fn seal_call(&self, call: &LedgerCall) -> Result<Ciphertext> {
        if !self.lock().committee_healthy {
            return Err(VeilmatchError::CommitteeUnavailable);
        }
        Ok(Ciphertext::Sealed {
            bytes: serde_json::to_vec(call)?,
        })
    }

    async fn unseal_call(&self, submission: &SubmissionRef) -> Result<UnsealedCall> {
        let st = self.lock();
        if !st.committee_healthy {
            return Err(VeilmatchError::CommitteeUnavailable);
        }
        if st.fail_unseal || st.fail_unseal_call {
            return Err(VeilmatchError::UnsealFailed {
                reason: "mock: unseal disabled".into(),
            });
        }
        st.submissions
            .get(&submission.0)
            .cloned()
            .ok_or_else(|| VeilmatchError::UnsealFailed {
                reason: format!("mock: unknown submission {}", submission.0),
            })
    }

    async fn unseal_amount(&self, sealed: &Ciphertext) -> Result<u64> {
        let st = self.lock();
        if !st.committee_healthy {
            return Err(VeilmatchError::CommitteeUnavailable);
        }
        if st.fail_unseal {
            return Err(VeilmatchError::UnsealFailed {
                reason: "mock: unseal disabled".into(),
            });
        }
        match sealed {
            Ciphertext::Sealed { bytes } => {
                let arr: [u8; 8] =
                    bytes
                        .as_slice()
                        .try_into()
                        .map_err(|_| VeilmatchError::UnsealFailed {
                            reason: "mock: malformed amount ciphertext".into(),
                        })?;
                Ok(u64::from_be_bytes(arr) + st.unseal_amount_delta)
            }
            Ciphertext::Placeholder { .. } => Err(VeilmatchError::UnsealFailed {
                reason: "mock: placeholder has no sealed amount".into(),
            }),
        }
    }
}
