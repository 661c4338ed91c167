//! The transaction record: the durable audit artifact one clearing match
//! produces.
//!
//! A record is a **report, not a gate** — it is emitted for every match,
//! including matches whose mandate chain failed validation or whose
//! envelope never executed. Refusing to settle is the orchestrator's job;
//! the record just states honestly what happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CartMandate, IntentMandate, PaymentMandate, RecordId, SettlementRef, SubmissionRef};

/// Settlement outcome for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// Reference handed back by the settlement collaborator; absent when
    /// settlement was withheld or failed.
    pub settlement_ref: Option<SettlementRef>,
    pub network: String,
    /// Fee charged by the network, in token units.
    pub fee: u64,
    pub confirmed: bool,
    pub settled_at: Option<DateTime<Utc>>,
}

impl SettlementOutcome {
    /// The outcome for a match where no settlement was requested.
    #[must_use]
    pub fn withheld(network: impl Into<String>) -> Self {
        Self {
            settlement_ref: None,
            network: network.into(),
            fee: 0,
            confirmed: false,
            settled_at: None,
        }
    }
}

/// Envelope metadata carried into the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMeta {
    /// `false` whenever the fallback (plaintext) path was taken.
    pub encrypted: bool,
    /// Reference to the sealed-call submission on the ledger.
    pub submission_ref: Option<SubmissionRef>,
    pub decrypted_at: Option<DateTime<Utc>>,
}

/// Lifecycle timestamps for the full intent → settlement arc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTimestamps {
    pub intent_created: DateTime<Utc>,
    pub cart_created: DateTime<Utc>,
    pub payment_authorized: Option<DateTime<Utc>>,
    pub settled: Option<DateTime<Utc>>,
    pub record_generated: DateTime<Utc>,
}

/// The five-boolean validation summary. Each flag reflects what was true
/// when the record was built, even if the chain as a whole was invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub intent_valid: bool,
    pub cart_signed: bool,
    pub payment_authorized: bool,
    pub settlement_confirmed: bool,
    pub spend_within_limits: bool,
}

/// The self-contained audit artifact for one clearing match: the mandate
/// chain, the settlement outcome, the envelope metadata, and the
/// validation summary. JSON-serializable end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub record_id: RecordId,
    pub intent: IntentMandate,
    pub cart: CartMandate,
    /// Absent when the envelope failed before a payment could be built.
    pub payment: Option<PaymentMandate>,
    pub settlement: SettlementOutcome,
    pub encryption: EncryptionMeta,
    pub timestamps: RecordTimestamps,
    pub validation: ValidationSummary,
    /// Enumerated chain violations, verbatim, for honest audit.
    pub violations: Vec<String>,
    /// Why the match was abandoned, when it was.
    pub failure: Option<String>,
}
