//! Error types and handling for arraypool

use serde::{Deserialize, Serialize};

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Kind of pool misuse reported under a fail-loudly policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MisuseKind {
    /// The buffer was already sitting in the available set
    AlreadyReturned,
    /// The buffer was not rented from the bucket it was returned to
    ForeignBuffer,
    /// A slice view whose backing array cannot be recovered
    UnresolvableSlice,
}

impl std::fmt::Display for MisuseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MisuseKind::AlreadyReturned => "buffer returned twice",
            MisuseKind::ForeignBuffer => "buffer was not rented from this pool",
            MisuseKind::UnresolvableSlice => "slice has no resolvable backing array",
        };
        f.write_str(text)
    }
}

/// Error types for the array pool
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Negative length requested
    #[error("Length out of range: {requested} is negative")]
    OutOfRange { requested: i128 },

    /// Requested byte size does not fit the addressable limit
    #[error("Length overflow: requested {requested} elements, maximum is {max}")]
    Overflow { requested: u128, max: usize },

    /// Caller misused the rent/return protocol
    #[error("Pool misuse: {kind} (length {length})")]
    Misuse { kind: MisuseKind, length: usize },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Platform-specific errors (thread spawn and the like)
    #[error("Platform error: {message}")]
    Platform {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl PoolError {
    /// Create an out-of-range error
    pub fn out_of_range(requested: i128) -> Self {
        Self::OutOfRange { requested }
    }

    /// Create an overflow error
    pub fn overflow(requested: u128, max: usize) -> Self {
        Self::Overflow { requested, max }
    }

    /// Create a misuse error
    pub fn misuse(kind: MisuseKind, length: usize) -> Self {
        Self::Misuse { kind, length }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a platform error from an I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Platform {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Whether this error reports protocol misuse
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::Misuse { .. })
    }

    /// Misuse kind, if this is a misuse error
    pub fn misuse_kind(&self) -> Option<MisuseKind> {
        match self {
            Self::Misuse { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PoolError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}
