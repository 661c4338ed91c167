//! # veilmatch-envelope
//!
//! Drives a sealed bid through its lifecycle: seal the amount, submit
//! the call payload to the ledger, wait for the unlock precondition,
//! then decrypt and execute — or fall back to plaintext when the
//! decryption committee is unavailable.
//!
//! The external ledger and committee are reached through the traits in
//! [`collaborators`]; `testkit` provides an in-memory implementation of
//! both for tests.

pub mod collaborators;
pub mod lifecycle;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testkit;

pub use collaborators::{CommitteeClient, LedgerClient};
pub use lifecycle::Envelope;
