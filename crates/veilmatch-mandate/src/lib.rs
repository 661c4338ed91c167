//! # veilmatch-mandate
//!
//! The authorization chain that makes a cleared match settle-able:
//!
//! 1. **Intent** — the bidder's standing policy (spend cap, allowlists)
//! 2. **Cart** — the provider's committed offer, hash-signed
//! 3. **Payment** — the bidder's authorization of one exact settlement,
//!    chained to the cart by hash
//!
//! [`validation::validate_chain`] re-checks every link and enumerates
//! every violation; [`record::build_record`] folds the outcome into the
//! durable [`TransactionRecord`](veilmatch_types::TransactionRecord),
//! which is always produced — it reports, it never gates.

pub mod builder;
pub mod hashing;
pub mod record;
pub mod validation;

pub use builder::MandateFactory;
pub use record::{RecordParts, build_record};
pub use validation::validate_chain;
