//! The marketplace listing model: providers, asks, sealed bids, and the
//! ephemeral clearing match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{BidderId, Ciphertext, EnvelopeId, ProviderId, ServiceCategory};

// ---------------------------------------------------------------------------
// Provider / Ask
// ---------------------------------------------------------------------------

/// A service provider participating in the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    /// Settlement address on the external ledger (hex).
    pub address: String,
    pub category: ServiceCategory,
    /// Public asking price in integer token units.
    pub unit_price: u64,
}

/// A provider's public service listing. Immutable once listed; a changed
/// price means a fresh listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ask {
    pub provider: Provider,
    pub listed_at: DateTime<Utc>,
}

impl Ask {
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            listed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// SealedBid
// ---------------------------------------------------------------------------

/// A bid whose amount is ciphertext until the unlock condition is met.
///
/// The book never sees a plaintext amount — only the envelope's durable
/// amount-layer ciphertext and the envelope id the orchestrator uses to
/// find the lifecycle handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBid {
    pub bidder_id: BidderId,
    pub category: ServiceCategory,
    pub envelope_id: EnvelopeId,
    pub sealed_amount: Ciphertext,
    pub submitted_at: DateTime<Utc>,
    /// Book-assigned arrival counter; first-submitted wins amount ties.
    pub sequence: u64,
}

// ---------------------------------------------------------------------------
// ClearingMatch
// ---------------------------------------------------------------------------

/// The result of one clearing cycle for one category: the cheapest ask
/// matched to the highest sealed bid. Ephemeral — consumed by the
/// orchestrator, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingMatch {
    pub category: ServiceCategory,
    pub provider: Provider,
    pub winner_id: BidderId,
    pub envelope_id: EnvelopeId,
    /// The revealed amount the winner bid.
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// BidderProfile
// ---------------------------------------------------------------------------

/// A buyer agent's declared procurement policy, registered once per
/// session. The orchestrator derives each `IntentMandate` from this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidderProfile {
    pub id: BidderId,
    pub name: String,
    /// Payer address on the settlement collaborator (hex).
    pub address: String,
    /// Spend cap in token units; `None` = uncapped.
    pub max_spend: Option<u64>,
    /// Provider address allowlist; `None` = unrestricted.
    pub allowed_providers: Option<BTreeSet<String>>,
    /// Category allowlist; `None` = unrestricted.
    pub allowed_categories: Option<BTreeSet<ServiceCategory>>,
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-helpers"))]
impl Provider {
    /// Dummy provider for unit tests. **Never use in production.**
    pub fn dummy(name: &str, category: &str, unit_price: u64) -> Self {
        Self {
            id: ProviderId::new(),
            name: name.to_string(),
            address: format!("0x{:040x}", rand::random::<u64>()),
            category: ServiceCategory::new(category),
            unit_price,
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl BidderProfile {
    /// Dummy unrestricted bidder for unit tests.
    pub fn dummy(name: &str) -> Self {
        Self {
            id: BidderId::new(),
            name: name.to_string(),
            address: format!("0x{:040x}", rand::random::<u64>()),
            max_spend: None,
            allowed_providers: None,
            allowed_categories: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_captures_listing_time() {
        let before = Utc::now();
        let ask = Ask::new(Provider::dummy("Nimbus", "GPU Compute", 1_000));
        assert!(ask.listed_at >= before);
        assert_eq!(ask.provider.unit_price, 1_000);
    }

    #[test]
    fn sealed_bid_serde_roundtrip() {
        let bid = SealedBid {
            bidder_id: BidderId::new(),
            category: ServiceCategory::new("Data Feed"),
            envelope_id: EnvelopeId::new(),
            sealed_amount: Ciphertext::Sealed { bytes: vec![7; 16] },
            submitted_at: Utc::now(),
            sequence: 3,
        };
        let json = serde_json::to_string(&bid).unwrap();
        let back: SealedBid = serde_json::from_str(&json).unwrap();
        assert_eq!(bid, back);
    }

    #[test]
    fn dummy_profile_is_unrestricted() {
        let profile = BidderProfile::dummy("atlas");
        assert!(profile.max_spend.is_none());
        assert!(profile.allowed_providers.is_none());
        assert!(profile.allowed_categories.is_none());
    }
}
