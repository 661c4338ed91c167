//! Collaborator seams for the envelope lifecycle.
//!
//! The lifecycle talks to two external systems: the ledger that hosts
//! auctions and receives call payloads, and the threshold-decryption
//! committee that seals and unseals them. Both are traits so tests and
//! alternate deployments can swap implementations.

use veilmatch_types::{
    AuctionRef, Ciphertext, LedgerCall, Result, ServiceCategory, SubmissionRef, UnsealedCall,
};

/// The external ledger: auction host and call sink.
///
/// Implementations are expected to be cheap to call concurrently; the
/// lifecycle only ever holds `&self`.
#[allow(async_fn_in_trait)]
pub trait LedgerClient {
    /// Open an auction for a category with a price band. Returns the
    /// auction reference sealed calls will target.
    async fn create_auction(
        &self,
        category: &ServiceCategory,
        duration_secs: u64,
        min_amount: u64,
        max_amount: u64,
    ) -> Result<AuctionRef>;

    /// Submit an opaque sealed payload addressed to an auction. The
    /// ledger cannot inspect it; it only schedules it for later unsealing.
    async fn submit_sealed_call(
        &self,
        target: AuctionRef,
        payload: &Ciphertext,
    ) -> Result<SubmissionRef>;

    /// Submit a call in the clear. Used for the single-layer policy and
    /// for the plaintext fallback when the committee is unavailable.
    async fn submit_plain_call(&self, call: &LedgerCall) -> Result<SubmissionRef>;

    /// Has the unlock precondition (deadline elapsed AND clearing
    /// triggered) been confirmed for this auction?
    async fn condition_met(&self, auction: AuctionRef) -> Result<bool>;
}

/// The threshold-decryption committee.
#[allow(async_fn_in_trait)]
pub trait CommitteeClient {
    /// Is the committee reachable and above quorum right now?
    async fn healthy(&self) -> bool;

    /// Seal a bare amount into the durable amount-layer ciphertext.
    async fn seal_amount(&self, amount: u64) -> Result<Ciphertext>;

    /// Seal a full call into the ephemeral call-layer payload.
    async fn seal_call(&self, call: &LedgerCall) -> Result<Ciphertext>;

    /// Threshold-decrypt a previously submitted sealed payload.
    async fn unseal_call(&self, submission: &SubmissionRef) -> Result<UnsealedCall>;

    /// Threshold-decrypt an amount-layer ciphertext.
    async fn unseal_amount(&self, sealed: &Ciphertext) -> Result<u64>;
}
