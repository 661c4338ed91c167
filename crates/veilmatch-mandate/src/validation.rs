//! Mandate chain validation.
//!
//! `validate_chain` runs every check and enumerates every failure — an
//! auditor reading the result sees the complete list of violations, not
//! just the first one hit. Validation never mutates its inputs, so
//! re-running it on the same chain yields the same result.

use tracing::{debug, error};
use veilmatch_types::{
    CartMandate, ChainValidation, ChainViolation, IntentMandate, PaymentMandate, ServiceCategory,
};

use crate::hashing;

/// Run all chain checks and collect every violation.
///
/// Checks, in order:
/// 1. intent not expired
/// 2. cart not expired
/// 3. cart signature hash reproduces over the contents
/// 4. payment authorization chain reproduces over cart and contents
/// 5. payment amount within the intent's spend cap
/// 6. cart service label within the intent's category allowlist
/// 7. cart provider address within the intent's provider allowlist
#[must_use]
pub fn validate_chain(
    intent: &IntentMandate,
    cart: &CartMandate,
    payment: &PaymentMandate,
) -> ChainValidation {
    let mut violations = Vec::new();

    if intent.is_expired() {
        violations.push(ChainViolation::IntentExpired);
    }

    if cart.is_expired() {
        violations.push(ChainViolation::CartExpired);
    }

    match hashing::cart_signature_hash(&cart.contents) {
        Ok(expected) if expected == cart.signature_hash => {}
        Ok(_) => violations.push(ChainViolation::CartSignatureInvalid),
        Err(err) => {
            error!(%err, "Cart hash recomputation failed");
            violations.push(ChainViolation::CartSignatureInvalid);
        }
    }

    match hashing::authorization_chain(cart, &payment.contents) {
        Ok(expected) if expected == payment.authorization_chain => {}
        Ok(_) => violations.push(ChainViolation::AuthorizationChainInvalid),
        Err(err) => {
            error!(%err, "Authorization chain recomputation failed");
            violations.push(ChainViolation::AuthorizationChainInvalid);
        }
    }

    if let Some(max_spend) = intent.max_spend {
        if payment.contents.amount > max_spend {
            violations.push(ChainViolation::SpendLimitExceeded {
                amount: payment.contents.amount,
                max_spend,
            });
        }
    }

    if let Some(allowed) = &intent.allowed_categories {
        let label = &cart.contents.service_label;
        if !allowed.contains(&ServiceCategory::new(label)) {
            violations.push(ChainViolation::CategoryNotAllowed {
                label: label.clone(),
            });
        }
    }

    if let Some(allowed) = &intent.allowed_providers {
        let address = &cart.contents.provider_address;
        if !allowed.contains(address) {
            violations.push(ChainViolation::ProviderNotAllowed {
                address: address.clone(),
            });
        }
    }

    let result = ChainValidation::from_violations(violations);
    debug!(
        cart = %cart.contents.cart_id,
        payment = %payment.contents.mandate_id,
        outcome = %result,
        "Mandate chain validated"
    );
    result
}
