//! Error types for the Veilmatch clearing engine.
//!
//! All errors use the `VM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Orderbook / bid errors
//! - 2xx: Envelope lifecycle errors
//! - 3xx: Mandate errors
//! - 4xx: Ledger collaborator errors
//! - 5xx: Committee / decryption errors
//! - 6xx: Settlement errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{CartId, EnvelopeId, EnvelopeState};

/// Central error enum for all Veilmatch operations.
#[derive(Debug, Error)]
pub enum VeilmatchError {
    // =================================================================
    // Orderbook / Bid Errors (1xx)
    // =================================================================
    /// The referenced sealed bid was not found in the book.
    #[error("VM_ERR_100: Sealed bid not found: {0}")]
    BidNotFound(EnvelopeId),

    /// The bid failed validation (missing envelope, bad category, etc.).
    #[error("VM_ERR_101: Invalid bid: {reason}")]
    InvalidBid { reason: String },

    // =================================================================
    // Envelope Errors (2xx)
    // =================================================================
    /// A lifecycle transition that the state machine forbids.
    #[error("VM_ERR_200: Invalid envelope transition: {from} -> {to}")]
    InvalidTransition {
        from: EnvelopeState,
        to: EnvelopeState,
    },

    /// The plaintext amount was read before the envelope reached a
    /// terminal success state.
    #[error("VM_ERR_201: Plaintext amount unavailable in state {0}")]
    PlaintextSealed(EnvelopeState),

    /// The unlock precondition was never confirmed within the poll budget.
    /// The envelope stays in CONDITION_PENDING; the caller decides whether
    /// this is terminal.
    #[error("VM_ERR_202: Unlock condition not met after {polls} polls")]
    ConditionNotMet { polls: u32 },

    /// The envelope reached FAILED; the bid must not be treated as cleared.
    #[error("VM_ERR_203: Envelope failed: {reason}")]
    EnvelopeFailed { reason: String },

    // =================================================================
    // Mandate Errors (3xx)
    // =================================================================
    /// A payment mandate was requested against an already-expired cart.
    #[error("VM_ERR_300: Cart mandate expired: {0}")]
    CartExpired(CartId),

    /// The mandate is structurally invalid.
    #[error("VM_ERR_301: Invalid mandate: {reason}")]
    InvalidMandate { reason: String },

    // =================================================================
    // Ledger Errors (4xx)
    // =================================================================
    /// The external ledger rejected or failed the auction creation.
    #[error("VM_ERR_400: Auction creation failed: {reason}")]
    AuctionCreateFailed { reason: String },

    /// The external ledger rejected or failed a call submission.
    #[error("VM_ERR_401: Call submission failed: {reason}")]
    SubmitFailed { reason: String },

    /// The external ledger could not be reached.
    #[error("VM_ERR_402: Ledger unavailable: {reason}")]
    LedgerUnavailable { reason: String },

    // =================================================================
    // Committee / Decryption Errors (5xx)
    // =================================================================
    /// The threshold-decryption committee is unreachable or below quorum.
    #[error("VM_ERR_500: Decryption committee unavailable")]
    CommitteeUnavailable,

    /// The committee failed to seal a payload.
    #[error("VM_ERR_501: Seal failed: {reason}")]
    SealFailed { reason: String },

    /// The committee failed to unseal a submitted call or amount.
    #[error("VM_ERR_502: Unseal failed: {reason}")]
    UnsealFailed { reason: String },

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    /// The settlement collaborator rejected the transfer authorization.
    #[error("VM_ERR_600: Settlement rejected: {reason}")]
    SettlementRejected { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("VM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("VM_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, VeilmatchError>;

impl From<serde_json::Error> for VeilmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
