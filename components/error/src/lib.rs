//! Error kinds shared across every crate in the driver.
//!
//! The teacher workspace has no dedicated error crate of its own -- its
//! leaf data-structure crates either can't fail or signal failure with
//! `Option`/`unwrap()` on invariants they themselves maintain. This
//! driver talks to a smart card over a transport that genuinely fails
//! (bad status words, truncated responses, I/O errors), so it gets a
//! real error enum, built the way the rest of the example pack
//! (`thiserror`-derived, one variant per failure kind) already does it.

use thiserror::Error;

/// The status word (SW1, SW2) a card transport reported for a failed
/// APDU exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWord(pub u8, pub u8);

impl std::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}{:02X}", self.0, self.1)
    }
}

/// Every error this driver can report to a caller.
///
/// Variant names intentionally mirror the card-forth error kinds named in
/// the driver's specification so the mapping is obvious at a glance.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CardError {
    /// Any allocation failure; always fatal to the current call.
    #[error("out of memory")]
    OutOfMemory,

    /// Security-environment validation failures, malformed paths, or an
    /// incompatible key reference for the requested operation.
    #[error("invalid arguments")]
    InvalidArguments,

    /// Write DOs, write binary, or an unsupported `card_ctl` code.
    #[error("operation not supported")]
    NotSupported,

    /// Path traversal could not locate a child with the requested tag.
    #[error("file not found")]
    FileNotFound,

    /// TLV parsing failed: truncated or malformed content.
    #[error("object not valid")]
    ObjectNotValid,

    /// A read offset landed beyond the end of the file.
    #[error("incorrect parameters")]
    IncorrectParameters,

    /// The transport reported a non-success status word.
    #[error("card returned error status {0}")]
    Transport(StatusWord),
}

pub type CardResult<T> = Result<T, CardError>;
