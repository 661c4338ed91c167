//! The clearing orchestrator: owns the book and the envelope handles,
//! and drives each cycle from reveal through matching, mandates,
//! settlement, and the signed record.
//!
//! Failures are contained per match — one abandoned match never blocks
//! the rest of the cycle, and every match that cleared produces a record
//! whether or not it settled.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tracing::{error, info, warn};
use veilmatch_book::ProcurementBook;
use veilmatch_envelope::{CommitteeClient, Envelope, LedgerClient};
use veilmatch_mandate::{MandateFactory, RecordParts, build_record, validate_chain};
use veilmatch_types::{
    Ask, BidderId, BidderProfile, ChainValidation, ClearingConfig, ClearingMatch, EncryptionMeta,
    EncryptionPolicy, EnvelopeId, EnvelopeState, Provider, Result, ServiceCategory,
    SettlementOutcome, TransactionRecord, VeilmatchError,
};

use crate::audit::AuditLog;
use crate::settlement::SettlementClient;

/// One clearing node. Generic over its three collaborators so tests run
/// against in-memory fakes and deployments against real clients.
pub struct Orchestrator<L, C, S> {
    config: ClearingConfig,
    ledger: L,
    committee: C,
    settlement: S,
    book: ProcurementBook,
    factory: MandateFactory,
    bidders: HashMap<BidderId, BidderProfile>,
    envelopes: HashMap<EnvelopeId, Envelope>,
    audit: AuditLog,
}

impl<L, C, S> Orchestrator<L, C, S>
where
    L: LedgerClient,
    C: CommitteeClient,
    S: SettlementClient,
{
    #[must_use]
    pub fn new(config: ClearingConfig, ledger: L, committee: C, settlement: S) -> Self {
        let audit = AuditLog::new(SigningKey::generate(&mut OsRng));
        info!(node = %audit.node_id(), network = %config.network, "Clearing node initialized");
        Self {
            factory: MandateFactory::new(config.clone()),
            config,
            ledger,
            committee,
            settlement,
            book: ProcurementBook::new(),
            bidders: HashMap::new(),
            envelopes: HashMap::new(),
            audit,
        }
    }

    // =================================================================
    // Registration and listing
    // =================================================================

    /// Register a buyer agent's procurement policy. Intent mandates are
    /// derived from this profile at clearing time.
    pub fn register_bidder(&mut self, profile: BidderProfile) {
        info!(bidder = %profile.id, name = %profile.name, "Bidder registered");
        self.bidders.insert(profile.id, profile);
    }

    /// List a provider's public ask.
    pub fn list_ask(&mut self, provider: Provider) {
        self.book.list_ask(Ask::new(provider));
    }

    // =================================================================
    // Bidding
    // =================================================================

    /// Seal an amount into a fresh envelope and place the sealed bid in
    /// the book. The plaintext amount never reaches the book.
    pub async fn place_bid(
        &mut self,
        bidder_id: BidderId,
        category: ServiceCategory,
        amount: u64,
        policy: EncryptionPolicy,
    ) -> Result<EnvelopeId> {
        if !self.bidders.contains_key(&bidder_id) {
            return Err(VeilmatchError::InvalidBid {
                reason: format!("bidder {bidder_id} is not registered"),
            });
        }

        let envelope = Envelope::seal(amount, category.clone(), policy, &self.committee).await;
        let envelope_id = envelope.id();
        self.book.place_bid(
            bidder_id,
            category,
            envelope_id,
            envelope.sealed_amount().clone(),
        );
        self.envelopes.insert(envelope_id, envelope);
        Ok(envelope_id)
    }

    // =================================================================
    // The clearing cycle
    // =================================================================

    /// Run one full cycle: reveal sealed amounts, match, then drive every
    /// match through mandates, the envelope lifecycle, settlement, and
    /// the signed record.
    ///
    /// Returns the records of matches that were carried to a record; a
    /// match abandoned before its mandates could be built is logged and
    /// skipped. Sealed bids are consumed either way.
    ///
    /// Terminal envelopes stay queryable until the next cycle begins and
    /// are then dropped; their outcome lives on in the signed records.
    pub async fn run_clearing_cycle(&mut self) -> Vec<TransactionRecord> {
        self.envelopes
            .retain(|_, envelope| !envelope.state().is_terminal());

        let revealed = self.reveal_amounts().await;
        let matches = self.book.clear(&revealed);
        info!(
            bids = self.book.total_bids(),
            revealed = revealed.len(),
            matches = matches.len(),
            "Clearing cycle"
        );

        let mut records = Vec::with_capacity(matches.len());
        for matched in &matches {
            match self.settle_match(matched).await {
                Ok(record) => records.push(record),
                Err(err) => {
                    error!(envelope = %matched.envelope_id, %err, "Match abandoned");
                }
            }
        }

        // Bids that did not clear are consumed with the cycle; their
        // envelopes are terminal losers.
        for envelope in self.envelopes.values_mut() {
            if envelope.state() == EnvelopeState::Sealed {
                let _ = envelope.mark_failed("bid not cleared");
            }
        }
        self.book.reset_bids();

        records
    }

    /// Reveal the durable amount-layer ciphertext of every sealed bid.
    /// Placeholders decode locally; sealed amounts go to the committee.
    /// Bids that cannot be revealed are left out and will not match.
    async fn reveal_amounts(&self) -> HashMap<EnvelopeId, u64> {
        let mut revealed = HashMap::new();
        for bid in self.book.sealed_bids() {
            let amount = if bid.sealed_amount.is_placeholder() {
                bid.sealed_amount.decode_placeholder()
            } else {
                match self.committee.unseal_amount(&bid.sealed_amount).await {
                    Ok(amount) => Some(amount),
                    Err(err) => {
                        warn!(envelope = %bid.envelope_id, %err, "Amount reveal failed");
                        None
                    }
                }
            };
            if let Some(amount) = amount {
                revealed.insert(bid.envelope_id, amount);
            }
        }
        revealed
    }

    /// Carry one match from mandates to its signed record.
    async fn settle_match(&mut self, matched: &ClearingMatch) -> Result<TransactionRecord> {
        let profile = self
            .bidders
            .get(&matched.winner_id)
            .cloned()
            .ok_or_else(|| VeilmatchError::InvalidBid {
                reason: format!("winner {} has no registered profile", matched.winner_id),
            })?;

        let intent = self
            .factory
            .make_intent(&profile, format!("Procure {}", matched.category));
        let cart = self
            .factory
            .make_cart(&matched.provider, matched.category.as_str(), None)?;

        // Auction creation is best-effort: a degraded ledger downgrades the
        // envelope but the match still settles.
        let (band_min, band_max) = self.config.priceband(matched.provider.unit_price);
        let auction = match self
            .ledger
            .create_auction(
                &matched.category,
                self.config.auction_duration_secs,
                band_min,
                band_max,
            )
            .await
        {
            Ok(auction) => Some(auction),
            Err(err) => {
                warn!(%err, "Auction creation failed, settling off-ledger");
                None
            }
        };

        let mut failure: Option<String> = None;
        // The revealed amount selected the winner; once the envelope
        // executes, its plaintext is the authoritative settlement value.
        let mut settled_amount = matched.amount;
        let poll_interval = Duration::from_millis(self.config.unlock_poll_interval_ms);
        let max_polls = self.config.unlock_max_polls;

        let encryption = match (self.envelopes.get_mut(&matched.envelope_id), auction) {
            (None, _) => {
                failure = Some(format!("envelope {} not held", matched.envelope_id));
                EncryptionMeta {
                    encrypted: false,
                    submission_ref: None,
                    decrypted_at: None,
                }
            }
            (Some(envelope), Some(auction)) => {
                let driven = match envelope.submit(&self.ledger, &self.committee, auction).await {
                    Ok(()) => {
                        envelope
                            .await_unlock(&self.ledger, &self.committee, poll_interval, max_polls)
                            .await
                    }
                    Err(err) => Err(err),
                };
                match driven {
                    Ok(amount) => {
                        settled_amount = amount;
                        info!(envelope = %envelope.id(), amount, state = %envelope.state(), "Winning envelope executed");
                    }
                    Err(err @ VeilmatchError::ConditionNotMet { .. }) => {
                        let reason = format!("envelope abandoned: {err}");
                        let _ = envelope.mark_failed(&reason);
                        failure = Some(reason);
                    }
                    Err(err) => {
                        if !envelope.state().is_terminal() {
                            let _ = envelope.mark_failed(&err.to_string());
                        }
                        failure = Some(format!("envelope failed: {err}"));
                    }
                }
                EncryptionMeta {
                    encrypted: envelope.encrypted(),
                    submission_ref: envelope.submission().cloned(),
                    decrypted_at: envelope.unlocked_at(),
                }
            }
            (Some(envelope), None) => {
                // Off-ledger: the sealed call never runs, so the envelope
                // terminates without execution. The match itself proceeds.
                let _ = envelope.mark_failed("auction unavailable, settled off-ledger");
                EncryptionMeta {
                    encrypted: envelope.encrypted(),
                    submission_ref: None,
                    decrypted_at: None,
                }
            }
        };

        let payment = if failure.is_none() {
            match self
                .factory
                .make_payment(&cart, matched.winner_id, settled_amount, auction)
            {
                Ok(payment) => Some(payment),
                Err(err) => {
                    failure = Some(format!("payment refused: {err}"));
                    None
                }
            }
        } else {
            None
        };

        let validation = match &payment {
            Some(payment) => validate_chain(&intent, &cart, payment),
            None => ChainValidation::from_violations(Vec::new()),
        };

        let settlement = if failure.is_none() && validation.valid && payment.is_some() {
            match self
                .settlement
                .authorize_transfer(&profile.address, &matched.provider.address, settled_amount)
                .await
            {
                Ok(settlement_ref) => SettlementOutcome {
                    settlement_ref: Some(settlement_ref),
                    network: self.config.network.clone(),
                    fee: self.config.settlement_fee,
                    confirmed: true,
                    settled_at: Some(Utc::now()),
                },
                Err(err) => {
                    warn!(%err, "Settlement rejected");
                    failure = Some(format!("settlement rejected: {err}"));
                    SettlementOutcome::withheld(self.config.network.as_str())
                }
            }
        } else {
            SettlementOutcome::withheld(self.config.network.as_str())
        };

        let record = build_record(RecordParts {
            intent,
            cart,
            payment,
            settlement,
            encryption,
            validation,
            failure,
        });
        self.audit.append(record.clone())?;
        Ok(record)
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn book(&self) -> &ProcurementBook {
        &self.book
    }

    #[must_use]
    pub fn envelope_state(&self, envelope_id: EnvelopeId) -> Option<EnvelopeState> {
        self.envelopes.get(&envelope_id).map(Envelope::state)
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    #[must_use]
    pub fn config(&self) -> &ClearingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use veilmatch_envelope::testkit::MockChain;

    use super::*;
    use crate::testkit::MockSettlement;

    fn orchestrator() -> Orchestrator<MockChain, MockChain, MockSettlement> {
        let chain = MockChain::new();
        let config = ClearingConfig {
            unlock_poll_interval_ms: 0,
            unlock_max_polls: 3,
            ..ClearingConfig::default()
        };
        Orchestrator::new(config, chain.clone(), chain, MockSettlement::new())
    }

    #[tokio::test]
    async fn unregistered_bidder_cannot_place_bids() {
        let mut orch = orchestrator();
        let err = orch
            .place_bid(
                BidderId::new(),
                ServiceCategory::new("GPU Compute"),
                1_000,
                EncryptionPolicy::TwoLayer,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VeilmatchError::InvalidBid { .. }));
        assert_eq!(orch.book().total_bids(), 0);
    }

    #[tokio::test]
    async fn losing_bids_terminate_failed() {
        let mut orch = orchestrator();
        let winner = BidderProfile::dummy("winner");
        let loser = BidderProfile::dummy("loser");
        orch.register_bidder(winner.clone());
        orch.register_bidder(loser.clone());
        orch.list_ask(Provider::dummy("Nimbus", "GPU Compute", 900));

        let category = ServiceCategory::new("GPU Compute");
        let high = orch
            .place_bid(winner.id, category.clone(), 1_200, EncryptionPolicy::TwoLayer)
            .await
            .unwrap();
        let low = orch
            .place_bid(loser.id, category, 1_000, EncryptionPolicy::TwoLayer)
            .await
            .unwrap();

        let records = orch.run_clearing_cycle().await;
        assert_eq!(records.len(), 1);
        assert_eq!(orch.envelope_state(high), Some(EnvelopeState::Executed));
        assert_eq!(orch.envelope_state(low), Some(EnvelopeState::Failed));
        assert_eq!(orch.book().total_bids(), 0);
    }

    #[tokio::test]
    async fn terminal_envelopes_are_swept_by_the_next_cycle() {
        let mut orch = orchestrator();
        let bidder = BidderProfile::dummy("atlas");
        orch.register_bidder(bidder.clone());
        orch.list_ask(Provider::dummy("Nimbus", "GPU Compute", 900));

        let mut past = Vec::new();
        for round in 0..10u64 {
            let id = orch
                .place_bid(
                    bidder.id,
                    ServiceCategory::new("GPU Compute"),
                    1_000 + round,
                    EncryptionPolicy::TwoLayer,
                )
                .await
                .unwrap();
            orch.run_clearing_cycle().await;
            // The just-finished cycle's outcome is still queryable.
            assert_eq!(orch.envelope_state(id), Some(EnvelopeState::Executed));
            past.push(id);
        }

        orch.run_clearing_cycle().await;
        for id in past {
            assert_eq!(orch.envelope_state(id), None);
        }
    }

    #[tokio::test]
    async fn settlement_uses_the_executed_amount() {
        let chain = MockChain::new();
        // The committee reveal drifts high, and the sealed call cannot be
        // unsealed, so the winner executes through the plaintext fallback
        // carrying the true bid amount.
        chain.set_unseal_amount_delta(77);
        chain.set_fail_unseal_call(true);
        let settlement = MockSettlement::new();
        let config = ClearingConfig {
            unlock_poll_interval_ms: 0,
            unlock_max_polls: 3,
            ..ClearingConfig::default()
        };
        let mut orch = Orchestrator::new(config, chain.clone(), chain, settlement.clone());

        let bidder = BidderProfile::dummy("atlas");
        orch.register_bidder(bidder.clone());
        orch.list_ask(Provider::dummy("Nimbus", "GPU Compute", 900));
        let envelope = orch
            .place_bid(
                bidder.id,
                ServiceCategory::new("GPU Compute"),
                1_000,
                EncryptionPolicy::TwoLayer,
            )
            .await
            .unwrap();

        let records = orch.run_clearing_cycle().await;
        assert_eq!(records.len(), 1);
        assert_eq!(
            orch.envelope_state(envelope),
            Some(EnvelopeState::FallbackExecuted)
        );

        // The payment and the transfer carry the executed plaintext, not
        // the drifted pre-clearing reveal.
        let payment = records[0].payment.as_ref().unwrap();
        assert_eq!(payment.contents.amount, 1_000);
        let transfers = settlement.transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].2, 1_000);
    }

    #[tokio::test]
    async fn cycle_without_bids_produces_no_records() {
        let mut orch = orchestrator();
        orch.list_ask(Provider::dummy("Nimbus", "GPU Compute", 900));
        let records = orch.run_clearing_cycle().await;
        assert!(records.is_empty());
        assert!(orch.audit().is_empty());
    }
}
