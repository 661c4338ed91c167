//! The procurement orderbook: public asks and sealed bids per category.
//!
//! The book is an explicit owned instance — never a process-wide
//! singleton. Callers must not interleave `list_ask`/`place_bid` with an
//! in-flight `clear` (single-writer discipline at the call site).

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use veilmatch_types::{
    Ask, BidderId, Ciphertext, ClearingMatch, EnvelopeId, SealedBid, ServiceCategory,
};

use crate::matching;

/// In-memory book of current asks and accumulated sealed bids.
///
/// Asks persist across clearing cycles; sealed bids are consumed by one
/// cycle and discarded — the category restarts empty.
#[derive(Debug, Default)]
pub struct ProcurementBook {
    asks: Vec<Ask>,
    /// Sealed bids per category, in submission order.
    bids: BTreeMap<ServiceCategory, Vec<SealedBid>>,
    /// Monotonic arrival counter for first-submitted tie-breaks.
    next_sequence: u64,
}

impl ProcurementBook {
    /// Create a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // Listing
    // =================================================================

    /// Append an ask. No dedup beyond caller discipline — a re-listing is
    /// a caller error, not validated here.
    pub fn list_ask(&mut self, ask: Ask) {
        tracing::debug!(
            provider = %ask.provider.name,
            category = %ask.provider.category,
            unit_price = ask.provider.unit_price,
            "Ask listed"
        );
        self.asks.push(ask);
    }

    /// Append a sealed bid. The envelope must already be sealed — this
    /// component never sees a plaintext amount.
    pub fn place_bid(
        &mut self,
        bidder_id: BidderId,
        category: ServiceCategory,
        envelope_id: EnvelopeId,
        sealed_amount: Ciphertext,
    ) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        tracing::debug!(
            bidder = %bidder_id,
            category = %category,
            envelope = %envelope_id,
            sequence,
            "Sealed bid placed"
        );

        self.bids.entry(category.clone()).or_default().push(SealedBid {
            bidder_id,
            category,
            envelope_id,
            sealed_amount,
            submitted_at: Utc::now(),
            sequence,
        });
    }

    // =================================================================
    // Clearing
    // =================================================================

    /// Match winners to providers using the plaintext amounts the caller
    /// has already revealed. The book performs no unlocking itself.
    #[must_use]
    pub fn clear(&self, revealed: &HashMap<EnvelopeId, u64>) -> Vec<ClearingMatch> {
        matching::clear(&self.asks, &self.bids, revealed)
    }

    /// Remove and return a sealed bid so the caller can own its envelope
    /// for the duration of one match.
    pub fn take_bid(&mut self, envelope_id: EnvelopeId) -> Option<SealedBid> {
        for bids in self.bids.values_mut() {
            if let Some(pos) = bids.iter().position(|b| b.envelope_id == envelope_id) {
                return Some(bids.remove(pos));
            }
        }
        None
    }

    /// Discard all sealed bids after a cycle completes. Asks persist.
    pub fn reset_bids(&mut self) {
        let discarded: usize = self.bids.values().map(Vec::len).sum();
        tracing::debug!(discarded, "Sealed bids reset");
        self.bids.clear();
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn asks(&self) -> &[Ask] {
        &self.asks
    }

    /// All sealed bids currently in the book, in submission order.
    pub fn sealed_bids(&self) -> impl Iterator<Item = &SealedBid> {
        self.bids.values().flatten()
    }

    #[must_use]
    pub fn bid_count(&self, category: &ServiceCategory) -> usize {
        self.bids.get(category).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn total_bids(&self) -> usize {
        self.bids.values().map(Vec::len).sum()
    }
}
