//! System-wide policy constants and defaults.
//!
//! Mandate TTLs live here so no business rule is a magic number somewhere
//! deep in a builder.

/// Intent mandates cover a bidding session: 24 hours.
pub const DEFAULT_INTENT_TTL_HOURS: i64 = 24;

/// Cart mandates cover one offer window: 30 minutes.
pub const DEFAULT_CART_TTL_MINUTES: i64 = 30;

/// How long a created auction accepts sealed submissions.
pub const DEFAULT_AUCTION_DURATION_SECS: u64 = 60;

/// Auction price band, as percentages of the matched provider's unit
/// price. Bids are accepted from half the asking price up to 150% of it.
pub const DEFAULT_PRICEBAND_MIN_PCT: u64 = 50;
pub const DEFAULT_PRICEBAND_MAX_PCT: u64 = 150;

/// Unlock-condition polling: interval between polls and the budget after
/// which the orchestrator treats the envelope as failed.
pub const DEFAULT_UNLOCK_POLL_INTERVAL_MS: u64 = 250;
pub const DEFAULT_UNLOCK_MAX_POLLS: u32 = 40;

/// Network label stamped into settlement outcomes.
pub const DEFAULT_NETWORK: &str = "veilmatch-devnet";

/// Flat network fee in token units (zero-fee network by default).
pub const DEFAULT_SETTLEMENT_FEE: u64 = 0;

/// Domain-separation prefixes for canonical hashing.
pub const CART_HASH_DOMAIN: &str = "veilmatch:cart:v1:";
pub const PAYMENT_HASH_DOMAIN: &str = "veilmatch:payment:v1:";
pub const RECORD_HASH_DOMAIN: &str = "veilmatch:record:v1:";
