//! # Error Types for the CTV Playground
//!
//! Every failure in the library is a typed [`CtvError`]. Presentation layers
//! should branch on [`CtvError::kind`] rather than on the rendered message.

use thiserror::Error;

/// Main error type for all commitment, vault and verification operations
#[derive(Debug, Error)]
pub enum CtvError {
    /// Malformed hex, JSON, context blobs or transaction bytes
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Address with a bad checksum, unknown format or wrong network
    #[error("Invalid address '{input}' for network {network}")]
    InvalidAddress { network: String, input: String },

    /// Non-numeric or non-positive amount
    #[error("Invalid amount: '{input}'")]
    InvalidAmount { input: String },

    /// A commitment hash that is not exactly 32 bytes
    #[error("Invalid hash length: expected 32 bytes, got {actual}")]
    InvalidHashLength { actual: usize },

    /// Amount does not cover the fixed fee of a covenant step
    #[error("Insufficient funds: required more than {required} sats, available {available} sats")]
    InsufficientFunds { required: u64, available: u64 },

    /// Verification found differences against the expected transaction
    #[error("Transaction structure mismatch: {}", .issues.join(", "))]
    StructuralMismatch { issues: Vec<String> },

    /// No input carried a recognizable vault witness
    #[error("Could not determine transaction type")]
    UnknownTransactionType,

    /// Invalid move in the vault lifecycle
    #[error("Invalid vault state transition from {current} to {requested}")]
    InvalidStateTransition { current: String, requested: String },

    /// JSON serialization/deserialization errors
    #[error("JSON processing error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Hex decoding errors
    #[error("Hex decoding error: {source}")]
    Hex {
        #[from]
        source: hex::FromHexError,
    },
}

/// Result type alias for library operations
pub type CtvResult<T> = Result<T, CtvError>;

/// Flat classification of [`CtvError`] for mapping to user-facing copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    InvalidAddress,
    InvalidAmount,
    InvalidHashLength,
    InsufficientFunds,
    StructuralMismatch,
    UnknownTransactionType,
    InvalidStateTransition,
}

impl CtvError {
    /// Create a parse error with a message
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an invalid address error
    pub fn invalid_address(network: impl Into<String>, input: impl Into<String>) -> Self {
        Self::InvalidAddress {
            network: network.into(),
            input: input.into(),
        }
    }

    /// Create an invalid amount error
    pub fn invalid_amount(input: impl Into<String>) -> Self {
        Self::InvalidAmount {
            input: input.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CtvError::Parse { .. } | CtvError::Json { .. } | CtvError::Hex { .. } => {
                ErrorKind::Parse
            }
            CtvError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            CtvError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            CtvError::InvalidHashLength { .. } => ErrorKind::InvalidHashLength,
            CtvError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            CtvError::StructuralMismatch { .. } => ErrorKind::StructuralMismatch,
            CtvError::UnknownTransactionType => ErrorKind::UnknownTransactionType,
            CtvError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
        }
    }

    /// Check if this error was caused by caller-supplied input rather than
    /// by an inconsistent transaction or lifecycle
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Parse
                | ErrorKind::InvalidAddress
                | ErrorKind::InvalidAmount
                | ErrorKind::InsufficientFunds
        )
    }
}
