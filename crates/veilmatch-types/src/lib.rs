//! # veilmatch-types
//!
//! Shared types, errors, and configuration for the **Veilmatch** sealed-bid
//! procurement engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`BidderId`], [`ProviderId`], [`EnvelopeId`], [`CartId`],
//!   [`MandateId`], [`RecordId`], [`NodeId`], [`ServiceCategory`] and the
//!   external references [`AuctionRef`], [`SubmissionRef`], [`SettlementRef`]
//! - **Listing model**: [`Provider`], [`Ask`], [`SealedBid`], [`ClearingMatch`],
//!   [`BidderProfile`]
//! - **Envelope model**: [`EnvelopeState`], [`EncryptionPolicy`], [`Ciphertext`],
//!   [`LedgerCall`], [`UnsealedCall`], [`TraceEntry`], [`TracePhase`]
//! - **Mandate model**: [`IntentMandate`], [`CartMandate`], [`PaymentMandate`],
//!   [`ChainValidation`], [`ChainViolation`]
//! - **Record model**: [`TransactionRecord`] and its sub-records
//! - **Configuration**: [`ClearingConfig`]
//! - **Errors**: [`VeilmatchError`] with `VM_ERR_` prefix codes

pub mod config;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod listing;
pub mod mandate;
pub mod record;

// Re-export all primary types at crate root for ergonomic imports:
//   use veilmatch_types::{Ask, SealedBid, EnvelopeState, IntentMandate, ...};

pub use config::*;
pub use envelope::*;
pub use error::*;
pub use ids::*;
pub use listing::*;
pub use mandate::*;
pub use record::*;

// Constants are accessed via `veilmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
