//! Canonical hashing for mandate commitments.
//!
//! Every hash is SHA-256 over a domain-separation prefix followed by the
//! value's canonical JSON serialization. Struct fields serialize in
//! declaration order, so the serialization is stable across processes.
//!
//! These hashes are commitments: anyone holding the plaintext can
//! recompute and compare them. They are not authenticity proofs.

use serde::Serialize;
use sha2::{Digest, Sha256};
use veilmatch_types::{
    CartContents, CartMandate, PaymentMandateContents, Result,
    constants::{CART_HASH_DOMAIN, PAYMENT_HASH_DOMAIN},
};

/// SHA-256 over `domain || canonical_json(value)`, hex-encoded.
pub fn hash_canonical<T: Serialize>(domain: &str, value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}

/// The commitment a provider makes over its cart contents.
pub fn cart_signature_hash(contents: &CartContents) -> Result<String> {
    hash_canonical(CART_HASH_DOMAIN, contents)
}

/// The two-part authorization chain binding a payment to its cart:
/// `hash(cart) + "." + hash(payment contents)`.
pub fn authorization_chain(
    cart: &CartMandate,
    contents: &PaymentMandateContents,
) -> Result<String> {
    let cart_hash = hash_canonical(CART_HASH_DOMAIN, cart)?;
    let payment_hash = hash_canonical(PAYMENT_HASH_DOMAIN, contents)?;
    Ok(format!("{cart_hash}.{payment_hash}"))
}
