//! Error handling for the election engine
//!
//! Every failure the engine can report is a variant of [`Error`]. Only
//! [`Error::StorageUnavailable`] is transient; the rest describe a
//! precondition the caller has to resolve and are never retried here.

use uuid::Uuid;

/// Result type alias for the election engine
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the election engine
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed voter identifier
    #[error("Invalid voter identifier: {reason}")]
    InvalidFormat { reason: String },

    /// No election with this id exists
    #[error("Election {election_id} not found")]
    ElectionNotFound { election_id: Uuid },

    /// Election is missing, inactive or already completed
    #[error("Election {election_id} is not open for voting")]
    ElectionNotOpen { election_id: Uuid },

    /// Candidate id does not belong to the election
    #[error("Candidate {candidate_id} not found in election {election_id}")]
    CandidateNotFound {
        election_id: Uuid,
        candidate_id: Uuid,
    },

    /// Voter jurisdiction is outside the election scope
    #[error("Voter is not eligible for election {election_id}")]
    NotEligible { election_id: Uuid },

    /// A vote already exists for this (voter, election) pair
    #[error("A vote has already been cast in election {election_id}")]
    DuplicateVote { election_id: Uuid },

    /// The persistence layer cannot be reached
    #[error("Storage unavailable during {context}: {message}")]
    StorageUnavailable { context: String, message: String },

    /// Cryptographic operation errors
    #[error("Cryptographic error: {message}")]
    Crypto { message: String },

    /// Validation errors
    #[error("Validation failed: {field}")]
    Validation { field: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new invalid format error
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Create a new storage unavailable error
    pub fn storage(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a new crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a caller may retry the failed operation with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }

    /// Prefix operation context onto a storage failure.
    ///
    /// Deterministic errors pass through untouched; they already name the
    /// election and candidate involved.
    pub fn in_context(self, operation: impl AsRef<str>) -> Self {
        match self {
            Self::StorageUnavailable { context, message } => Self::StorageUnavailable {
                context: format!("{} / {}", operation.as_ref(), context),
                message,
            },
            other => other,
        }
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! crypto_error {
    ($msg:expr) => {
        $crate::Error::crypto($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::crypto(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! storage_error {
    ($context:expr, $msg:expr) => {
        $crate::Error::storage($context, $msg)
    };
    ($context:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::Error::storage($context, format!($fmt, $($arg)*))
    };
}
