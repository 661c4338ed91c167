//! Assembles the transaction record for one clearing match.
//!
//! Record building never fails and never gates: invalid chains and failed
//! envelopes still produce a record that states what happened. The five
//! summary booleans are derived from the enumerated violations, so the
//! summary can never contradict the violation list.

use chrono::Utc;
use tracing::info;
use veilmatch_types::{
    CartMandate, ChainValidation, ChainViolation, EncryptionMeta, IntentMandate, PaymentMandate,
    RecordId, RecordTimestamps, SettlementOutcome, TransactionRecord, ValidationSummary,
};

/// Everything one match produced, ready to be folded into a record.
#[derive(Debug, Clone)]
pub struct RecordParts {
    pub intent: IntentMandate,
    pub cart: CartMandate,
    /// Absent when the envelope failed before a payment could be built.
    pub payment: Option<PaymentMandate>,
    pub settlement: SettlementOutcome,
    pub encryption: EncryptionMeta,
    pub validation: ChainValidation,
    /// Why the match was abandoned, when it was.
    pub failure: Option<String>,
}

/// Fold one match's artifacts into the durable audit record.
#[must_use]
pub fn build_record(parts: RecordParts) -> TransactionRecord {
    let RecordParts {
        intent,
        cart,
        payment,
        settlement,
        encryption,
        validation,
        failure,
    } = parts;

    let validation_summary = ValidationSummary {
        intent_valid: !validation.has(&ChainViolation::IntentExpired),
        cart_signed: !validation.has(&ChainViolation::CartSignatureInvalid),
        payment_authorized: payment.is_some()
            && !validation.has(&ChainViolation::AuthorizationChainInvalid),
        settlement_confirmed: settlement.confirmed,
        spend_within_limits: !validation.has(&ChainViolation::SpendLimitExceeded {
            amount: 0,
            max_spend: 0,
        }),
    };

    let timestamps = RecordTimestamps {
        intent_created: intent.created_at,
        cart_created: cart.contents.created_at,
        payment_authorized: payment.as_ref().map(|p| p.contents.authorized_at),
        settled: settlement.settled_at,
        record_generated: Utc::now(),
    };

    let record = TransactionRecord {
        record_id: RecordId::new(),
        intent,
        cart,
        payment,
        settlement,
        encryption,
        timestamps,
        validation: validation_summary,
        violations: validation.violations.iter().map(ToString::to_string).collect(),
        failure,
    };

    info!(
        record = %record.record_id,
        confirmed = record.validation.settlement_confirmed,
        encrypted = record.encryption.encrypted,
        violations = record.violations.len(),
        "Transaction record generated"
    );
    record
}
