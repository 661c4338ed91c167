//! # Envelope lifecycle types
//!
//! A sealed bid travels inside a two-layer envelope:
//!
//! - **Amount layer** — the bid amount as a standalone ciphertext. Durable
//!   and auditable; the clearing step reveals it to pick winners.
//! - **Call layer** — the full privileged call (target + arguments) as an
//!   opaque payload. Ephemeral and single-use; observers of the ledger
//!   cannot infer which function is called or with what arguments.
//!
//! ## State Machine
//!
//! ```text
//!   SEALED ──▶ SUBMITTED ──▶ CONDITION_PENDING ──▶ UNLOCKING ──▶ EXECUTED
//!      │            │                │                 │
//!      │            │                │                 ├──▶ FALLBACK_EXECUTED
//!      └────────────┴────────────────┴─────────────────┴──▶ FAILED
//! ```
//!
//! Transitions are monotonic and every transition appends to an immutable
//! trace, so tests and auditors can reconstruct the exact sequence.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AuctionRef, ServiceCategory};

// ---------------------------------------------------------------------------
// EncryptionPolicy
// ---------------------------------------------------------------------------

/// How many ciphertext layers the envelope carries.
///
/// Selected at construction; there is exactly one lifecycle code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionPolicy {
    /// Amount ciphertext plus a sealed full-call payload.
    TwoLayer,
    /// Amount ciphertext only; the call is submitted in plaintext.
    SingleLayer,
}

impl fmt::Display for EncryptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoLayer => write!(f, "two-layer"),
            Self::SingleLayer => write!(f, "single-layer"),
        }
    }
}

// ---------------------------------------------------------------------------
// EnvelopeState
// ---------------------------------------------------------------------------

/// The lifecycle state of a sealed-bid envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvelopeState {
    /// Ciphertexts produced; nothing sent anywhere yet.
    Sealed,
    /// The call payload has been handed to the external ledger.
    Submitted,
    /// Waiting for the unlock precondition (deadline elapsed AND clearing
    /// triggered) to be confirmed by the ledger.
    ConditionPending,
    /// Precondition confirmed; waiting on the decryption committee.
    Unlocking,
    /// Decrypted call ran on the ledger; the plaintext amount is trustworthy.
    Executed,
    /// Decryption unavailable; the same semantic call was re-submitted in
    /// plaintext. Degraded but available — records must flag
    /// `encrypted: false`.
    FallbackExecuted,
    /// Terminal. No state change occurred; the bid is not cleared.
    Failed,
}

impl EnvelopeState {
    /// Can this envelope transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Sealed, Self::Submitted | Self::Failed)
                | (Self::Submitted, Self::ConditionPending)
                | (Self::ConditionPending, Self::Unlocking | Self::Failed)
                | (
                    Self::Unlocking,
                    Self::Executed | Self::FallbackExecuted | Self::Failed
                )
        )
    }

    /// Terminal states never transition again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::FallbackExecuted | Self::Failed)
    }

    /// `true` for the two states in which the plaintext amount may be read.
    #[must_use]
    pub fn plaintext_readable(&self) -> bool {
        matches!(self, Self::Executed | Self::FallbackExecuted)
    }
}

impl fmt::Display for EnvelopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sealed => write!(f, "SEALED"),
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::ConditionPending => write!(f, "CONDITION_PENDING"),
            Self::Unlocking => write!(f, "UNLOCKING"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::FallbackExecuted => write!(f, "FALLBACK_EXECUTED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

/// Phase tag on a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TracePhase {
    Encrypt,
    Submit,
    Condition,
    Decrypt,
    Execute,
    Receipt,
    Failure,
}

impl fmt::Display for TracePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encrypt => write!(f, "encrypt"),
            Self::Submit => write!(f, "submit"),
            Self::Condition => write!(f, "condition"),
            Self::Decrypt => write!(f, "decrypt"),
            Self::Execute => write!(f, "execute"),
            Self::Receipt => write!(f, "receipt"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// One timestamped entry in an envelope's immutable lifecycle trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub ts: DateTime<Utc>,
    pub phase: TracePhase,
    pub label: String,
}

impl TraceEntry {
    #[must_use]
    pub fn now(phase: TracePhase, label: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            phase,
            label: label.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ciphertext
// ---------------------------------------------------------------------------

/// A sealed payload, or the transparent placeholder used when the
/// decryption committee was unavailable at seal time.
///
/// A placeholder hex-encodes the amount in the clear; anything derived
/// from one must be flagged `encrypted: false` in the resulting record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ciphertext {
    /// Committee-encrypted bytes.
    Sealed { bytes: Vec<u8> },
    /// Degraded stand-in: the amount hex-encoded in the clear.
    Placeholder { hex: String },
}

impl Ciphertext {
    /// Build the degraded placeholder for an amount.
    #[must_use]
    pub fn placeholder_for(amount: u64) -> Self {
        Self::Placeholder {
            hex: format!("0x{amount:064x}"),
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    /// Decode a placeholder back to its amount. `None` for sealed bytes.
    #[must_use]
    pub fn decode_placeholder(&self) -> Option<u64> {
        match self {
            Self::Placeholder { hex } => {
                u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok()
            }
            Self::Sealed { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerCall
// ---------------------------------------------------------------------------

/// The privileged calls the core issues against the external ledger.
///
/// One explicit variant per call kind — never an open map of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LedgerCall {
    /// Open an auction for a category with a price band.
    CreateAuction {
        category: ServiceCategory,
        duration_secs: u64,
        min_amount: u64,
        max_amount: u64,
    },
    /// Submit a sealed bid to an auction. The amount ciphertext rides
    /// inside so it lands on the ledger as the durable audit artifact.
    SubmitCall {
        auction: AuctionRef,
        sealed_amount: Ciphertext,
    },
    /// Reveal a bid amount after the unlock condition is met.
    UnlockCall {
        auction: AuctionRef,
        bid_index: u64,
        amount: u64,
    },
}

impl LedgerCall {
    /// Short tag for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateAuction { .. } => "create_auction",
            Self::SubmitCall { .. } => "submit_call",
            Self::UnlockCall { .. } => "unlock_call",
        }
    }
}

/// What the committee hands back after threshold-decrypting a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsealedCall {
    /// The target the opaque payload was addressed to.
    pub target: AuctionRef,
    /// The decrypted call.
    pub call: LedgerCall,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
