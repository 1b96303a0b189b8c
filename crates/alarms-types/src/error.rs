//! Error types for alarms-types.

use thiserror::Error;

/// Errors that can occur when validating alarm data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The value is not a syntactically valid UUID.
    #[error("Invalid id: {0}")]
    InvalidId(String),
}

/// Result type alias using alarms-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
