//! The pure clearing function: lowest ask meets highest bid, per category.
//!
//! Matching never touches ciphertext — the caller supplies the plaintext
//! amounts it has already revealed. Same inputs, same matches.

use std::collections::{BTreeMap, HashMap};

use veilmatch_types::{Ask, ClearingMatch, EnvelopeId, SealedBid, ServiceCategory};

/// Compute at most one [`ClearingMatch`] per category that has bids.
///
/// - Matched provider: the lowest-`unit_price` ask in the category;
///   ties resolve to the first listed.
/// - Winner: the highest revealed bid amount; ties resolve to the first
///   submitted (lowest sequence).
/// - Categories with asks but no bids produce no match; categories with
///   bids but no asks are skipped — no liquidity, not an error.
/// - Bids whose envelope has no entry in `revealed` are skipped.
#[must_use]
pub fn clear(
    asks: &[Ask],
    bids: &BTreeMap<ServiceCategory, Vec<SealedBid>>,
    revealed: &HashMap<EnvelopeId, u64>,
) -> Vec<ClearingMatch> {
    let mut matches = Vec::new();

    for (category, category_bids) in bids {
        // Cheapest ask in this category; min_by_key keeps the first listed
        // on ties because asks are stored in listing order.
        let Some(best_ask) = asks
            .iter()
            .filter(|a| &a.provider.category == category)
            .min_by_key(|a| a.provider.unit_price)
        else {
            tracing::debug!(category = %category, "No asks for category, skipping");
            continue;
        };

        // Highest revealed bid; strict > keeps the earliest sequence on ties
        // because bids are stored in submission order.
        let mut winner: Option<(&SealedBid, u64)> = None;
        for bid in category_bids {
            let Some(&amount) = revealed.get(&bid.envelope_id) else {
                tracing::warn!(
                    envelope = %bid.envelope_id,
                    category = %category,
                    "Bid amount not revealed, skipping"
                );
                continue;
            };
            if winner.is_none_or(|(_, best)| amount > best) {
                winner = Some((bid, amount));
            }
        }

        let Some((bid, amount)) = winner else {
            continue;
        };

        tracing::debug!(
            category = %category,
            provider = %best_ask.provider.name,
            winner = %bid.bidder_id,
            amount,
            "Category matched"
        );

        matches.push(ClearingMatch {
            category: category.clone(),
            provider: best_ask.provider.clone(),
            winner_id: bid.bidder_id,
            envelope_id: bid.envelope_id,
            amount,
        });
    }

    matches
}
