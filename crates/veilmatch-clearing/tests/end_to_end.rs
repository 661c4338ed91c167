//! End-to-end integration tests for the full clearing arc:
//! sealed bid -> reveal -> match -> mandate chain -> settlement -> record.
//!
//! Everything runs against the in-memory ledger/committee pair from
//! `veilmatch-envelope` and a local settlement fake, so each test drives
//! the orchestrator exactly the way a deployment would.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use veilmatch_clearing::{AuditLog, Orchestrator, SettlementClient};
use veilmatch_envelope::testkit::MockChain;
use veilmatch_types::{
    BidderProfile, ClearingConfig, EncryptionPolicy, EnvelopeState, Provider, Result,
    ServiceCategory, SettlementRef, VeilmatchError,
};

// =============================================================================
// Harness
// =============================================================================

/// Local settlement fake: records transfers, can be switched to reject.
#[derive(Clone, Default)]
struct FakeSettlement {
    inner: Arc<Mutex<(bool, Vec<(String, String, u64)>)>>,
}

impl FakeSettlement {
    fn set_fail(&self, fail: bool) {
        self.inner.lock().unwrap().0 = fail;
    }

    fn transfers(&self) -> Vec<(String, String, u64)> {
        self.inner.lock().unwrap().1.clone()
    }
}

impl SettlementClient for FakeSettlement {
    async fn authorize_transfer(
        &self,
        payer_address: &str,
        provider_address: &str,
        amount: u64,
    ) -> Result<SettlementRef> {
        let mut st = self.inner.lock().unwrap();
        if st.0 {
            return Err(VeilmatchError::SettlementRejected {
                reason: "declined".into(),
            });
        }
        st.1.push((
            payer_address.to_string(),
            provider_address.to_string(),
            amount,
        ));
        Ok(SettlementRef(format!("settle-{}", st.1.len())))
    }
}

struct Harness {
    chain: MockChain,
    settlement: FakeSettlement,
    orch: Orchestrator<MockChain, MockChain, FakeSettlement>,
}

impl Harness {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let chain = MockChain::new();
        let settlement = FakeSettlement::default();
        let config = ClearingConfig {
            unlock_poll_interval_ms: 0,
            unlock_max_polls: 5,
            ..ClearingConfig::default()
        };
        let orch = Orchestrator::new(config, chain.clone(), chain.clone(), settlement.clone());
        Self {
            chain,
            settlement,
            orch,
        }
    }

    fn register(&mut self, profile: &BidderProfile) {
        self.orch.register_bidder(profile.clone());
    }

    async fn bid(&mut self, profile: &BidderProfile, category: &str, amount: u64) -> veilmatch_types::EnvelopeId {
        self.orch
            .place_bid(
                profile.id,
                ServiceCategory::new(category),
                amount,
                EncryptionPolicy::TwoLayer,
            )
            .await
            .expect("bid placement should succeed")
    }
}

fn capped(name: &str, max_spend: u64) -> BidderProfile {
    let mut profile = BidderProfile::dummy(name);
    profile.max_spend = Some(max_spend);
    profile
}

// =============================================================================
// Test: full cycle — cheapest ask, highest bid, settled encrypted record
// =============================================================================

#[tokio::test]
async fn e2e_full_cycle_settles_encrypted() {
    let mut h = Harness::new();
    let alice = capped("alice", 2_000);
    let bob = capped("bob", 2_000);
    h.register(&alice);
    h.register(&bob);

    h.orch.list_ask(Provider::dummy("Pricey", "GPU Compute", 1_000));
    let cheap = Provider::dummy("Cheap", "GPU Compute", 800);
    h.orch.list_ask(cheap.clone());

    let winning = h.bid(&alice, "GPU Compute", 1_500).await;
    let losing = h.bid(&bob, "GPU Compute", 1_200).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 1, "one category, one match, one record");

    let record = &records[0];
    assert_eq!(record.cart.contents.provider_name, "Cheap");
    assert_eq!(record.cart.contents.unit_price, 800);
    let payment = record.payment.as_ref().expect("payment should exist");
    assert_eq!(payment.contents.amount, 1_500);
    assert_eq!(payment.contents.buyer_id, alice.id);

    // Settled, encrypted end to end, chain fully valid.
    assert!(record.settlement.confirmed);
    assert!(record.encryption.encrypted);
    assert!(record.encryption.submission_ref.is_some());
    assert!(record.encryption.decrypted_at.is_some());
    assert!(record.violations.is_empty());
    assert!(record.failure.is_none());
    assert!(record.validation.intent_valid);
    assert!(record.validation.cart_signed);
    assert!(record.validation.payment_authorized);
    assert!(record.validation.settlement_confirmed);
    assert!(record.validation.spend_within_limits);

    // The transfer went payer -> provider for the winning amount.
    assert_eq!(
        h.settlement.transfers(),
        vec![(alice.address.clone(), cheap.address.clone(), 1_500)]
    );

    // Envelope lifecycles: winner executed, loser terminal failed.
    assert_eq!(h.orch.envelope_state(winning), Some(EnvelopeState::Executed));
    assert_eq!(h.orch.envelope_state(losing), Some(EnvelopeState::Failed));

    // The winner's sealed call actually rode the ledger's sealed path.
    assert_eq!(h.chain.sealed_submission_count(), 1);
}

// =============================================================================
// Test: committee down end to end — plaintext fallback still settles
// =============================================================================

#[tokio::test]
async fn e2e_committee_down_settles_with_fallback() {
    let mut h = Harness::new();
    h.chain.set_committee_healthy(false);

    let alice = capped("alice", 2_000);
    h.register(&alice);
    h.orch.list_ask(Provider::dummy("Cheap", "GPU Compute", 800));
    let envelope = h.bid(&alice, "GPU Compute", 1_000).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert!(record.settlement.confirmed, "degraded but available");
    assert!(!record.encryption.encrypted, "fallback must be flagged");
    assert!(record.failure.is_none());
    assert_eq!(
        h.orch.envelope_state(envelope),
        Some(EnvelopeState::FallbackExecuted)
    );
    assert_eq!(h.chain.sealed_submission_count(), 0);
    assert_eq!(h.settlement.transfers().len(), 1);
}

// =============================================================================
// Test: spend cap exceeded — record emitted, settlement withheld
// =============================================================================

#[tokio::test]
async fn e2e_spend_cap_violation_withholds_settlement() {
    let mut h = Harness::new();
    let alice = capped("alice", 1_000);
    h.register(&alice);
    h.orch.list_ask(Provider::dummy("Cheap", "GPU Compute", 800));
    h.bid(&alice, "GPU Compute", 1_500).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert!(!record.settlement.confirmed);
    assert!(record.settlement.settlement_ref.is_none());
    assert!(!record.validation.spend_within_limits);
    assert_eq!(record.violations.len(), 1);
    assert!(record.violations[0].contains("1500"));
    assert!(record.violations[0].contains("1000"));
    assert!(h.settlement.transfers().is_empty(), "no transfer authorized");
}

// =============================================================================
// Test: provider allowlist — exactly one violation, nothing else flagged
// =============================================================================

#[tokio::test]
async fn e2e_provider_allowlist_single_violation() {
    let mut h = Harness::new();
    let mut alice = BidderProfile::dummy("alice");
    alice.allowed_providers = Some(BTreeSet::from(["0xAAA".to_string()]));
    h.register(&alice);

    let mut rogue = Provider::dummy("Rogue", "GPU Compute", 800);
    rogue.address = "0xBBB".into();
    h.orch.list_ask(rogue);
    h.bid(&alice, "GPU Compute", 1_000).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.violations.len(), 1);
    assert!(record.violations[0].contains("0xBBB"));
    assert!(!record.settlement.confirmed);
    // Every other check passed individually.
    assert!(record.validation.intent_valid);
    assert!(record.validation.cart_signed);
    assert!(record.validation.payment_authorized);
    assert!(record.validation.spend_within_limits);
}

// =============================================================================
// Test: degraded ledger — no auction, match settles off-ledger
// =============================================================================

#[tokio::test]
async fn e2e_degraded_ledger_still_settles() {
    let mut h = Harness::new();
    h.chain.set_fail_create_auction(true);

    let alice = capped("alice", 2_000);
    h.register(&alice);
    h.orch.list_ask(Provider::dummy("Cheap", "GPU Compute", 800));
    let envelope = h.bid(&alice, "GPU Compute", 1_000).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert!(record.settlement.confirmed);
    assert!(record.failure.is_none());
    assert!(record.encryption.submission_ref.is_none());
    let payment = record.payment.as_ref().unwrap();
    assert!(payment.contents.auction.is_none());
    // The sealed call never ran; the envelope is terminal without execution.
    assert_eq!(h.orch.envelope_state(envelope), Some(EnvelopeState::Failed));
    assert_eq!(h.settlement.transfers().len(), 1);
}

// =============================================================================
// Test: unlock never confirmed — partial record, no payment, no settlement
// =============================================================================

#[tokio::test]
async fn e2e_unlock_timeout_yields_partial_record() {
    let mut h = Harness::new();
    h.chain.set_default_condition_polls(1_000);

    let alice = capped("alice", 2_000);
    h.register(&alice);
    h.orch.list_ask(Provider::dummy("Cheap", "GPU Compute", 800));
    let envelope = h.bid(&alice, "GPU Compute", 1_000).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 1, "a failed match still gets a record");

    let record = &records[0];
    assert!(record.payment.is_none());
    assert!(!record.settlement.confirmed);
    assert!(!record.validation.payment_authorized);
    let failure = record.failure.as_deref().expect("failure must be recorded");
    assert!(failure.contains("VM_ERR_202"), "got: {failure}");
    assert_eq!(h.orch.envelope_state(envelope), Some(EnvelopeState::Failed));
    assert!(h.settlement.transfers().is_empty());
}

// =============================================================================
// Test: settlement rejection is recorded, not retried
// =============================================================================

#[tokio::test]
async fn e2e_settlement_rejection_recorded() {
    let mut h = Harness::new();
    h.settlement.set_fail(true);

    let alice = capped("alice", 2_000);
    h.register(&alice);
    h.orch.list_ask(Provider::dummy("Cheap", "GPU Compute", 800));
    h.bid(&alice, "GPU Compute", 1_000).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert!(!record.settlement.confirmed);
    assert!(record.settlement.settled_at.is_none());
    let failure = record.failure.as_deref().unwrap();
    assert!(failure.contains("settlement rejected"), "got: {failure}");
    // The chain itself was fine; only settlement failed.
    assert!(record.violations.is_empty());
    assert!(record.payment.is_some());
}

// =============================================================================
// Test: categories clear independently in one cycle
// =============================================================================

#[tokio::test]
async fn e2e_categories_clear_independently() {
    let mut h = Harness::new();
    let alice = capped("alice", 5_000);
    let bob = capped("bob", 5_000);
    h.register(&alice);
    h.register(&bob);

    h.orch.list_ask(Provider::dummy("GpuCo", "GPU Compute", 800));
    h.orch.list_ask(Provider::dummy("FeedCo", "Data Feed", 300));

    h.bid(&alice, "GPU Compute", 1_000).await;
    h.bid(&bob, "Data Feed", 400).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.settlement.confirmed));
    assert_eq!(h.settlement.transfers().len(), 2);
}

// =============================================================================
// Test: bids are consumed per cycle, asks persist
// =============================================================================

#[tokio::test]
async fn e2e_bids_reset_between_cycles() {
    let mut h = Harness::new();
    let alice = capped("alice", 5_000);
    h.register(&alice);
    h.orch.list_ask(Provider::dummy("Cheap", "GPU Compute", 800));

    h.bid(&alice, "GPU Compute", 1_000).await;
    let first = h.orch.run_clearing_cycle().await;
    assert_eq!(first.len(), 1);
    assert_eq!(h.orch.book().total_bids(), 0);
    assert_eq!(h.orch.book().asks().len(), 1, "asks persist");

    // No bids left: the next cycle clears nothing.
    let second = h.orch.run_clearing_cycle().await;
    assert!(second.is_empty());

    // Fresh bid, fresh match against the persistent ask.
    h.bid(&alice, "GPU Compute", 900).await;
    let third = h.orch.run_clearing_cycle().await;
    assert_eq!(third.len(), 1);
}

// =============================================================================
// Test: every emitted record is signed and verifiable
// =============================================================================

#[tokio::test]
async fn e2e_audit_log_signs_every_record() {
    let mut h = Harness::new();
    let alice = capped("alice", 5_000);
    let bob = capped("bob", 500);
    h.register(&alice);
    h.register(&bob);

    h.orch.list_ask(Provider::dummy("GpuCo", "GPU Compute", 800));
    h.orch.list_ask(Provider::dummy("FeedCo", "Data Feed", 300));

    // One clean match and one spend-cap violation.
    h.bid(&alice, "GPU Compute", 1_000).await;
    h.bid(&bob, "Data Feed", 600).await;

    let records = h.orch.run_clearing_cycle().await;
    assert_eq!(records.len(), 2);

    let key = h.orch.audit().verifying_key();
    assert_eq!(h.orch.audit().len(), 2);
    for entry in h.orch.audit().entries() {
        AuditLog::verify_entry(entry, &key).expect("entry must verify");
    }

    let json = h.orch.audit().export_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
}
