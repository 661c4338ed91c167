//! Builds the three mandates in chain order.
//!
//! Intent and cart TTLs come from [`ClearingConfig`]; a payment can only
//! be built against a cart that is still live.

use chrono::Utc;
use tracing::debug;
use veilmatch_types::{
    AuctionRef, BidderId, BidderProfile, CartContents, CartId, CartMandate, ClearingConfig,
    IntentMandate, MandateId, PaymentMandate, PaymentMandateContents, Provider, Result, SlaTerms,
    VeilmatchError,
};

use crate::hashing;

/// Produces mandates under one node's TTL policy.
#[derive(Debug, Clone, Default)]
pub struct MandateFactory {
    config: ClearingConfig,
}

impl MandateFactory {
    #[must_use]
    pub fn new(config: ClearingConfig) -> Self {
        Self { config }
    }

    /// Derive an intent mandate from a bidder's registered profile.
    ///
    /// The intent inherits the profile's spend cap and allowlists and
    /// covers one bidding session (24 hours by default).
    #[must_use]
    pub fn make_intent(&self, profile: &BidderProfile, description: impl Into<String>) -> IntentMandate {
        let now = Utc::now();
        let intent = IntentMandate {
            description: description.into(),
            bidder_id: profile.id,
            created_at: now,
            expires_at: now + self.config.intent_ttl(),
            allowed_providers: profile.allowed_providers.clone(),
            max_spend: profile.max_spend,
            allowed_categories: profile.allowed_categories.clone(),
        };
        debug!(bidder = %profile.id, expires_at = %intent.expires_at, "Intent mandate created");
        intent
    }

    /// Build the cart mandate for a provider's offer and commit to it.
    ///
    /// The signature hash covers exactly the cart contents; any later
    /// field change invalidates it.
    pub fn make_cart(
        &self,
        provider: &Provider,
        service_label: impl Into<String>,
        sla: Option<SlaTerms>,
    ) -> Result<CartMandate> {
        let now = Utc::now();
        let contents = CartContents {
            cart_id: CartId::new(),
            provider_id: provider.id,
            provider_name: provider.name.clone(),
            provider_address: provider.address.clone(),
            service_label: service_label.into(),
            unit_price: provider.unit_price,
            created_at: now,
            expires_at: now + self.config.cart_ttl(),
            sla,
        };
        let signature_hash = hashing::cart_signature_hash(&contents)?;
        debug!(cart = %contents.cart_id, provider = %provider.name, "Cart mandate created");
        Ok(CartMandate {
            contents,
            signature_hash,
        })
    }

    /// Authorize one settlement against a live cart.
    ///
    /// Fails with `VM_ERR_300` when the cart has already expired; an
    /// expired offer must never gain a payment.
    pub fn make_payment(
        &self,
        cart: &CartMandate,
        buyer_id: BidderId,
        amount: u64,
        auction: Option<AuctionRef>,
    ) -> Result<PaymentMandate> {
        if cart.is_expired() {
            return Err(VeilmatchError::CartExpired(cart.contents.cart_id));
        }
        let contents = PaymentMandateContents {
            mandate_id: MandateId::new(),
            cart_id: cart.contents.cart_id,
            buyer_id,
            provider_id: cart.contents.provider_id,
            amount,
            auction,
            authorized_at: Utc::now(),
        };
        let authorization_chain = hashing::authorization_chain(cart, &contents)?;
        debug!(
            mandate = %contents.mandate_id,
            cart = %contents.cart_id,
            amount,
            "Payment mandate authorized"
        );
        Ok(PaymentMandate {
            contents,
            authorization_chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use veilmatch_types::Provider;

    use super::*;

    fn factory() -> MandateFactory {
        MandateFactory::new(ClearingConfig::default())
    }

    #[test]
    fn intent_inherits_profile_policy() {
        let mut profile = BidderProfile::dummy("atlas");
        profile.max_spend = Some(1_000);
        let intent = factory().make_intent(&profile, "procure compute");
        assert_eq!(intent.bidder_id, profile.id);
        assert_eq!(intent.max_spend, Some(1_000));
        assert!(!intent.is_expired());
        assert_eq!(intent.expires_at - intent.created_at, Duration::hours(24));
    }

    #[test]
    fn cart_hash_matches_contents() {
        let provider = Provider::dummy("Nimbus", "GPU Compute", 900);
        let cart = factory().make_cart(&provider, "GPU Compute", None).unwrap();
        let recomputed = hashing::cart_signature_hash(&cart.contents).unwrap();
        assert_eq!(cart.signature_hash, recomputed);
        assert!(!cart.is_expired());
    }

    #[test]
    fn cart_ttl_is_thirty_minutes() {
        let provider = Provider::dummy("Nimbus", "GPU Compute", 900);
        let cart = factory().make_cart(&provider, "GPU Compute", None).unwrap();
        assert_eq!(
            cart.contents.expires_at - cart.contents.created_at,
            Duration::minutes(30)
        );
    }

    #[test]
    fn payment_binds_cart_and_amount() {
        let f = factory();
        let provider = Provider::dummy("Nimbus", "GPU Compute", 900);
        let cart = f.make_cart(&provider, "GPU Compute", None).unwrap();
        let payment = f
            .make_payment(&cart, BidderId::new(), 900, Some(AuctionRef(7)))
            .unwrap();

        assert_eq!(payment.contents.cart_id, cart.contents.cart_id);
        assert_eq!(payment.contents.amount, 900);
        let expected = hashing::authorization_chain(&cart, &payment.contents).unwrap();
        assert_eq!(payment.authorization_chain, expected);
        // Two hex hashes joined by a dot.
        let parts: Vec<&str> = payment.authorization_chain.split('.').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 64);
        assert_eq!(parts[1].len(), 64);
    }

    #[test]
    fn expired_cart_refuses_payment() {
        let f = factory();
        let provider = Provider::dummy("Nimbus", "GPU Compute", 900);
        let mut cart = f.make_cart(&provider, "GPU Compute", None).unwrap();
        cart.contents.expires_at = Utc::now() - Duration::minutes(1);

        let err = f
            .make_payment(&cart, BidderId::new(), 900, None)
            .unwrap_err();
        assert!(matches!(err, VeilmatchError::CartExpired(id) if id == cart.contents.cart_id));
    }
}
