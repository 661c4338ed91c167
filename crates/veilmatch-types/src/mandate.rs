//! The three-link mandate authorization chain: Intent → Cart → Payment.
//!
//! Each mandate carries a hash over its canonical JSON serialization.
//! The hash is a **commitment, not an authenticity proof** — anyone who
//! can see the plaintext fields can reproduce it. The signed audit record
//! is where real signing happens.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AuctionRef, BidderId, CartId, MandateId, ProviderId, ServiceCategory};

// ---------------------------------------------------------------------------
// IntentMandate
// ---------------------------------------------------------------------------

/// A bidder's procurement policy: what it may buy, from whom, and up to
/// how much. Created once per bidding session; expires independently of
/// any specific bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMandate {
    pub description: String,
    pub bidder_id: BidderId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Provider address allowlist; `None` = unrestricted.
    pub allowed_providers: Option<BTreeSet<String>>,
    /// Spend cap in token units; `None` = uncapped.
    pub max_spend: Option<u64>,
    /// Category allowlist; `None` = unrestricted.
    pub allowed_categories: Option<BTreeSet<ServiceCategory>>,
}

impl IntentMandate {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// ---------------------------------------------------------------------------
// CartMandate
// ---------------------------------------------------------------------------

/// Optional service-level terms attached to a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaTerms {
    /// Uptime commitment in basis points (9990 = 99.90%).
    pub uptime_bps: Option<u32>,
    pub max_latency_ms: Option<u64>,
    pub support_tier: Option<String>,
}

/// The offer fields a provider commits to. The signature hash is computed
/// over the canonical serialization of exactly these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartContents {
    pub cart_id: CartId,
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub provider_address: String,
    pub service_label: String,
    pub unit_price: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub sla: Option<SlaTerms>,
}

/// A provider-signed service offering.
///
/// Valid only while recomputing the hash over `contents` reproduces
/// `signature_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMandate {
    pub contents: CartContents,
    /// SHA-256 over the canonical serialization of `contents`, hex-encoded.
    pub signature_hash: String,
}

impl CartMandate {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.contents.expires_at
    }
}

// ---------------------------------------------------------------------------
// PaymentMandate
// ---------------------------------------------------------------------------

/// The settlement terms a bidder authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMandateContents {
    pub mandate_id: MandateId,
    pub cart_id: CartId,
    pub buyer_id: BidderId,
    pub provider_id: ProviderId,
    /// Exact amount to settle, in token units.
    pub amount: u64,
    /// On-chain auction this payment settles, when one exists.
    pub auction: Option<AuctionRef>,
    pub authorized_at: DateTime<Utc>,
}

/// A bidder's authorization of one specific settlement, bound irrevocably
/// to one cart and one amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMandate {
    pub contents: PaymentMandateContents,
    /// `hash(CartMandate) + "." + hash(contents)`, both hex-encoded.
    pub authorization_chain: String,
}

// ---------------------------------------------------------------------------
// Chain validation results
// ---------------------------------------------------------------------------

/// One failed check in the mandate chain. Every check runs; every failure
/// is enumerated, never just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ChainViolation {
    #[error("intent mandate expired")]
    IntentExpired,

    #[error("cart mandate expired")]
    CartExpired,

    #[error("cart signature hash does not match contents")]
    CartSignatureInvalid,

    #[error("payment authorization chain does not match cart and contents")]
    AuthorizationChainInvalid,

    #[error("payment amount {amount} exceeds spend limit {max_spend}")]
    SpendLimitExceeded { amount: u64, max_spend: u64 },

    #[error("service label {label:?} not in intent category allowlist")]
    CategoryNotAllowed { label: String },

    #[error("provider {address} not in intent provider allowlist")]
    ProviderNotAllowed { address: String },
}

/// The outcome of `validate_chain`: valid iff zero violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainValidation {
    pub valid: bool,
    pub violations: Vec<ChainViolation>,
}

impl ChainValidation {
    #[must_use]
    pub fn from_violations(violations: Vec<ChainViolation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    /// `true` if a violation of the same variant is present.
    #[must_use]
    pub fn has(&self, violation: &ChainViolation) -> bool {
        self.violations
            .iter()
            .any(|v| std::mem::discriminant(v) == std::mem::discriminant(violation))
    }
}

impl fmt::Display for ChainValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "valid")
        } else {
            write!(f, "invalid ({} violations)", self.violations.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn past() -> DateTime<Utc> {
        Utc::now() - chrono::Duration::minutes(5)
    }

    fn future() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::minutes(5)
    }

    #[test]
    fn intent_expiry() {
        let mut intent = IntentMandate {
            description: "procure compute".into(),
            bidder_id: BidderId::new(),
            created_at: past(),
            expires_at: future(),
            allowed_providers: None,
            max_spend: Some(1_000),
            allowed_categories: None,
        };
        assert!(!intent.is_expired());
        intent.expires_at = past();
        assert!(intent.is_expired());
    }

    #[test]
    fn validation_from_empty_is_valid() {
        let v = ChainValidation::from_violations(vec![]);
        assert!(v.valid);
        assert_eq!(v.to_string(), "valid");
    }

    #[test]
    fn validation_has_matches_by_variant() {
        let v = ChainValidation::from_violations(vec![ChainViolation::SpendLimitExceeded {
            amount: 1_001,
            max_spend: 1_000,
        }]);
        assert!(!v.valid);
        assert!(v.has(&ChainViolation::SpendLimitExceeded {
            amount: 0,
            max_spend: 0,
        }));
        assert!(!v.has(&ChainViolation::IntentExpired));
    }

    #[test]
    fn violation_display_names_the_check() {
        let v = ChainViolation::ProviderNotAllowed {
            address: "0xBBB".into(),
        };
        assert!(v.to_string().contains("0xBBB"));
        assert!(v.to_string().contains("allowlist"));
    }
}
