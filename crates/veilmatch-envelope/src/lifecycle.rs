//! The envelope lifecycle driver.
//!
//! An [`Envelope`] owns one sealed bid from construction to a terminal
//! state. Every transition goes through the state machine in
//! `veilmatch_types` and appends a timestamped trace entry; nothing
//! mutates state directly.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use veilmatch_types::{
    AuctionRef, Ciphertext, EncryptionPolicy, EnvelopeId, EnvelopeState, LedgerCall, Result,
    ServiceCategory, SubmissionRef, TraceEntry, TracePhase, VeilmatchError,
};

use crate::collaborators::{CommitteeClient, LedgerClient};

/// A sealed bid envelope and its lifecycle bookkeeping.
///
/// The bidder-side plaintext amount is retained privately so the
/// plaintext fallback can re-submit it; it becomes readable through
/// [`Envelope::plaintext_amount`] only once the envelope reaches
/// `EXECUTED` or `FALLBACK_EXECUTED`.
#[derive(Debug)]
pub struct Envelope {
    id: EnvelopeId,
    policy: EncryptionPolicy,
    category: ServiceCategory,
    state: EnvelopeState,
    sealed_amount: Ciphertext,
    /// The call-layer payload. Produced lazily at submit time because
    /// the auction reference is unknown when the amount is sealed.
    sealed_call: Option<Ciphertext>,
    amount: u64,
    plaintext: Option<u64>,
    encrypted: bool,
    auction: Option<AuctionRef>,
    submission: Option<SubmissionRef>,
    created_at: DateTime<Utc>,
    unlocked_at: Option<DateTime<Utc>>,
    trace: Vec<TraceEntry>,
}

impl Envelope {
    // =================================================================
    // Seal
    // =================================================================

    /// Seal an amount into a new envelope.
    ///
    /// Sealing never hard-fails: when the committee is unhealthy or the
    /// seal call errors, the amount layer degrades to a transparent
    /// placeholder and the envelope is marked `encrypted: false`. The
    /// degradation is recorded in the trace.
    pub async fn seal<C: CommitteeClient>(
        amount: u64,
        category: ServiceCategory,
        policy: EncryptionPolicy,
        committee: &C,
    ) -> Self {
        let id = EnvelopeId::new();
        let mut trace = Vec::new();

        let (sealed_amount, encrypted) = if committee.healthy().await {
            match committee.seal_amount(amount).await {
                Ok(ciphertext) => {
                    trace.push(TraceEntry::now(
                        TracePhase::Encrypt,
                        format!("amount sealed ({policy})"),
                    ));
                    (ciphertext, true)
                }
                Err(err) => {
                    warn!(envelope = %id, %err, "Amount seal failed, degrading to placeholder");
                    trace.push(TraceEntry::now(
                        TracePhase::Encrypt,
                        "seal failed, placeholder amount",
                    ));
                    (Ciphertext::placeholder_for(amount), false)
                }
            }
        } else {
            warn!(envelope = %id, "Committee unhealthy, degrading to placeholder");
            trace.push(TraceEntry::now(
                TracePhase::Encrypt,
                "committee unavailable, placeholder amount",
            ));
            (Ciphertext::placeholder_for(amount), false)
        };

        debug!(envelope = %id, %category, encrypted, "Envelope sealed");

        Self {
            id,
            policy,
            category,
            state: EnvelopeState::Sealed,
            sealed_amount,
            sealed_call: None,
            amount,
            plaintext: None,
            encrypted,
            auction: None,
            submission: None,
            created_at: Utc::now(),
            unlocked_at: None,
            trace,
        }
    }

    // =================================================================
    // Submit
    // =================================================================

    /// Hand the call payload to the ledger, addressed to an auction.
    ///
    /// Under the two-layer policy the full call is sealed here and sent
    /// opaque; if call sealing fails the submission degrades to the
    /// plaintext path. A ledger submission failure is terminal: the
    /// envelope moves to `FAILED`.
    ///
    /// On success the envelope passes through `SUBMITTED` into
    /// `CONDITION_PENDING`, where it waits for the unlock precondition.
    pub async fn submit<L: LedgerClient, C: CommitteeClient>(
        &mut self,
        ledger: &L,
        committee: &C,
        auction: AuctionRef,
    ) -> Result<()> {
        if self.state != EnvelopeState::Sealed {
            return Err(VeilmatchError::InvalidTransition {
                from: self.state,
                to: EnvelopeState::Submitted,
            });
        }

        let call = LedgerCall::SubmitCall {
            auction,
            sealed_amount: self.sealed_amount.clone(),
        };

        let sealed_payload = if self.policy == EncryptionPolicy::TwoLayer
            && self.encrypted
            && committee.healthy().await
        {
            match committee.seal_call(&call).await {
                Ok(payload) => {
                    self.trace
                        .push(TraceEntry::now(TracePhase::Encrypt, "call sealed"));
                    Some(payload)
                }
                Err(err) => {
                    warn!(envelope = %self.id, %err, "Call seal failed, submitting in plaintext");
                    None
                }
            }
        } else {
            None
        };

        let submitted = match &sealed_payload {
            Some(payload) => ledger.submit_sealed_call(auction, payload).await,
            None => ledger.submit_plain_call(&call).await,
        };

        let submission = match submitted {
            Ok(submission) => submission,
            Err(err) => {
                self.transition(
                    EnvelopeState::Failed,
                    TracePhase::Failure,
                    format!("ledger submission failed: {err}"),
                )?;
                return Err(err);
            }
        };

        let label = if sealed_payload.is_some() {
            "sealed call submitted"
        } else {
            "plaintext call submitted"
        };
        self.sealed_call = sealed_payload;
        self.auction = Some(auction);
        self.submission = Some(submission);

        self.transition(EnvelopeState::Submitted, TracePhase::Submit, label)?;
        self.transition(
            EnvelopeState::ConditionPending,
            TracePhase::Condition,
            "awaiting deadline and clearing trigger",
        )
    }

    // =================================================================
    // Unlock
    // =================================================================

    /// Poll the unlock precondition, then decrypt and execute.
    ///
    /// Exhausting the poll budget returns [`VeilmatchError::ConditionNotMet`]
    /// and leaves the envelope in `CONDITION_PENDING` — the caller owns the
    /// timeout policy and may retry or [`Envelope::mark_failed`].
    ///
    /// Once the condition holds, the sealed path asks the committee to
    /// unseal; any committee failure falls back to re-submitting the same
    /// semantic call in plaintext (`FALLBACK_EXECUTED`). Only a ledger
    /// failure on that last resort produces `FAILED`.
    pub async fn await_unlock<L: LedgerClient, C: CommitteeClient>(
        &mut self,
        ledger: &L,
        committee: &C,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Result<u64> {
        if self.state != EnvelopeState::ConditionPending {
            return Err(VeilmatchError::InvalidTransition {
                from: self.state,
                to: EnvelopeState::Unlocking,
            });
        }
        let auction = self
            .auction
            .ok_or_else(|| VeilmatchError::Internal("envelope has no auction".into()))?;

        let mut met = false;
        for _ in 0..max_polls {
            if ledger.condition_met(auction).await? {
                met = true;
                break;
            }
            tokio::time::sleep(poll_interval).await;
        }
        if !met {
            self.trace.push(TraceEntry::now(
                TracePhase::Condition,
                format!("condition not met after {max_polls} polls"),
            ));
            return Err(VeilmatchError::ConditionNotMet { polls: max_polls });
        }

        self.transition(
            EnvelopeState::Unlocking,
            TracePhase::Condition,
            "unlock condition met",
        )?;

        if self.sealed_amount.is_placeholder() {
            // Committee was already down at seal time; nothing to decrypt.
            return self.fallback(ledger, auction, "placeholder amount").await;
        }

        if self.sealed_call.is_some() {
            let submission = self
                .submission
                .clone()
                .ok_or_else(|| VeilmatchError::Internal("sealed call without submission".into()))?;
            match committee.unseal_call(&submission).await {
                Ok(unsealed) => {
                    self.trace.push(TraceEntry::now(
                        TracePhase::Decrypt,
                        format!("call unsealed: {}", unsealed.call.kind()),
                    ));
                }
                Err(err) => {
                    warn!(envelope = %self.id, %err, "Call unseal failed, falling back");
                    return self.fallback(ledger, auction, "call unseal failed").await;
                }
            }
        }

        match committee.unseal_amount(&self.sealed_amount).await {
            Ok(amount) => {
                self.trace
                    .push(TraceEntry::now(TracePhase::Decrypt, "amount unsealed"));
                self.transition(
                    EnvelopeState::Executed,
                    TracePhase::Execute,
                    "decrypted call executed",
                )?;
                self.plaintext = Some(amount);
                self.unlocked_at = Some(Utc::now());
                Ok(amount)
            }
            Err(err) => {
                warn!(envelope = %self.id, %err, "Amount unseal failed, falling back");
                self.fallback(ledger, auction, "amount unseal failed").await
            }
        }
    }

    /// Re-submit the same semantic call in plaintext. Degraded but
    /// available; the record derived from this envelope must carry
    /// `encrypted: false`.
    async fn fallback<L: LedgerClient>(
        &mut self,
        ledger: &L,
        auction: AuctionRef,
        reason: &str,
    ) -> Result<u64> {
        let call = LedgerCall::SubmitCall {
            auction,
            sealed_amount: Ciphertext::placeholder_for(self.amount),
        };
        match ledger.submit_plain_call(&call).await {
            Ok(submission) => {
                self.transition(
                    EnvelopeState::FallbackExecuted,
                    TracePhase::Execute,
                    format!("plaintext fallback executed ({reason})"),
                )?;
                self.submission = Some(submission);
                self.encrypted = false;
                self.plaintext = Some(self.amount);
                self.unlocked_at = Some(Utc::now());
                Ok(self.amount)
            }
            Err(err) => {
                self.transition(
                    EnvelopeState::Failed,
                    TracePhase::Failure,
                    format!("fallback submission failed: {err}"),
                )?;
                Err(VeilmatchError::EnvelopeFailed {
                    reason: format!("fallback submission failed: {err}"),
                })
            }
        }
    }

    // =================================================================
    // Failure
    // =================================================================

    /// Force the envelope to `FAILED` from any non-terminal state.
    pub fn mark_failed(&mut self, reason: &str) -> Result<()> {
        self.transition(
            EnvelopeState::Failed,
            TracePhase::Failure,
            reason.to_owned(),
        )
    }

    fn transition(
        &mut self,
        to: EnvelopeState,
        phase: TracePhase,
        label: impl Into<String>,
    ) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(VeilmatchError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!(envelope = %self.id, from = %self.state, to = %to, "Envelope transition");
        self.state = to;
        self.trace.push(TraceEntry::now(phase, label));
        Ok(())
    }

    // =================================================================
    // Accessors
    // =================================================================

    #[must_use]
    pub fn id(&self) -> EnvelopeId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    #[must_use]
    pub fn policy(&self) -> EncryptionPolicy {
        self.policy
    }

    #[must_use]
    pub fn category(&self) -> &ServiceCategory {
        &self.category
    }

    /// The durable amount-layer ciphertext (or its placeholder).
    #[must_use]
    pub fn sealed_amount(&self) -> &Ciphertext {
        &self.sealed_amount
    }

    /// Did this envelope stay on the encrypted path end to end?
    #[must_use]
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    #[must_use]
    pub fn auction(&self) -> Option<AuctionRef> {
        self.auction
    }

    #[must_use]
    pub fn submission(&self) -> Option<&SubmissionRef> {
        self.submission.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn unlocked_at(&self) -> Option<DateTime<Utc>> {
        self.unlocked_at
    }

    /// The full lifecycle trace, in order.
    #[must_use]
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// The revealed amount. Errors until the envelope reaches a terminal
    /// success state.
    pub fn plaintext_amount(&self) -> Result<u64> {
        if !self.state.plaintext_readable() {
            return Err(VeilmatchError::PlaintextSealed(self.state));
        }
        self.plaintext
            .ok_or_else(|| VeilmatchError::Internal("plaintext missing in terminal state".into()))
    }
}
