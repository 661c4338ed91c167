//! # veilmatch-clearing
//!
//! The top of the workspace: one [`Orchestrator`] owns the orderbook and
//! the envelope handles, and drives each clearing cycle end to end —
//! reveal the sealed amounts, match lowest ask to highest bid, build and
//! validate the mandate chain, settle, and sign the transaction record
//! into the [`AuditLog`].

pub mod audit;
pub mod orchestrator;
pub mod settlement;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testkit;

pub use audit::{AuditLog, SignedRecord};
pub use orchestrator::Orchestrator;
pub use settlement::SettlementClient;
