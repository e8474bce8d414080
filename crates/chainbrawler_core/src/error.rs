//! # Error Types
//!
//! Raw ledger failures, their classified form, and operation-level errors.

use std::collections::BTreeMap;
use std::fmt;

use chainbrawler_shared::OperationType;
use thiserror::Error;

/// A failure as produced by a ledger client, before classification.
///
/// The variants cover the shapes a code can hide in: the failure itself, a
/// `code` field, a nested failure's `code`, or a message containing
/// `error code: <digits>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger reverted with a bare contract error code.
    #[error("error code: {0}")]
    Code(u32),

    /// Structured RPC failure.
    #[error("{message}")]
    Rpc {
        /// Top-level code, if the transport reported one.
        code: Option<u32>,
        /// Transport message.
        message: String,
        /// Wrapped failure reported by the node.
        inner: Option<Box<LedgerError>>,
    },

    /// Free-form failure text.
    #[error("{0}")]
    Message(String),

    /// The ledger client does not implement this call.
    #[error("ledger call not supported: {0}")]
    Unsupported(&'static str),
}

impl LedgerError {
    /// Shorthand for an RPC failure wrapping a node error code.
    #[must_use]
    pub fn nested(code: u32, message: impl Into<String>) -> Self {
        Self::Rpc {
            code: None,
            message: message.into(),
            inner: Some(Box::new(Self::Code(code))),
        }
    }

    /// Shorthand for a message-only failure.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Error taxonomy, derived purely from the numeric code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Access control and batch validation.
    Validation,
    /// Fees, combat, enemies and packed-data integrity.
    Contract,
    /// Character domain.
    Character,
    /// Treasury and pools.
    Pool,
    /// Leaderboard and claims.
    Leaderboard,
    /// No recognizable code.
    Unknown,
}

impl ErrorCategory {
    /// User-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validation => "Invalid operation",
            Self::Contract => "Contract interaction failed",
            Self::Character => "Character state error",
            Self::Pool => "Pool operation failed",
            Self::Leaderboard => "Leaderboard operation failed",
            Self::Unknown => "Unknown error occurred",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A ledger failure after classification. Immutable once built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClassifiedError {
    /// Taxonomy bucket.
    pub category: ErrorCategory,
    /// Resolved code, or the unknown sentinel.
    pub code: u32,
    /// Fixed message for `code`.
    pub message: String,
    /// Whether the failure is transient.
    pub retryable: bool,
    /// Caller-supplied diagnostic context.
    pub context: BTreeMap<String, String>,
    /// The failure that was classified, if any.
    pub cause: Option<LedgerError>,
}

/// Errors surfaced by core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The single-flight guard refused the operation.
    #[error("cannot start {0}: another operation is active, the session is loading, or an error is pending")]
    OperationRefused(OperationType),

    /// A prerequisite ledger call failed.
    #[error(transparent)]
    Ledger(#[from] ClassifiedError),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad {
        /// File that was read.
        path: String,
        /// Underlying failure.
        reason: String,
    },
}

impl CoreError {
    /// Ledger code behind this error, if it came from the ledger.
    #[must_use]
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Ledger(classified) => Some(classified.code),
            _ => None,
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
