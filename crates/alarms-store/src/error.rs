//! Error types for alarms-store.
//!
//! Repository operations only ever return the semantic variants
//! (`NotFound` through `RemoveEntity`). Each wraps the underlying cause for
//! diagnostics; callers branch on [`Error::kind`].

use std::path::PathBuf;

use crate::config::ConfigError;

/// Result type for alarms-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause of a classified error.
pub type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in alarms-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity does not exist, or its id can never match.
    #[error("Entity not found: {0}")]
    NotFound(#[source] Cause),

    /// The entity or the request describing it is malformed.
    #[error("Malformed entity: {0}")]
    MalformedEntity(#[source] Cause),

    /// The entity already exists.
    #[error("Entity already exists: {0}")]
    Conflict(#[source] Cause),

    /// Creating the entity failed for another reason.
    #[error("Failed to create entity: {0}")]
    CreateEntity(#[source] Cause),

    /// Retrieving the entity failed for another reason.
    #[error("Failed to retrieve entity: {0}")]
    RetrieveEntity(#[source] Cause),

    /// Removing the entity failed for another reason.
    #[error("Failed to remove entity: {0}")]
    RemoveEntity(#[source] Cause),

    /// Database error while opening or bootstrapping the store.
    #[error("Database error: {0}")]
    Storage(#[source] rusqlite::Error),

    /// The store configuration could not be loaded or is invalid.
    #[error("Invalid store configuration: {0}")]
    Config(#[from] ConfigError),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The kind of an [`Error`], for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    MalformedEntity,
    Conflict,
    CreateEntity,
    RetrieveEntity,
    RemoveEntity,
    /// Opening or bootstrapping the store failed.
    Open,
}

impl Error {
    /// The semantic kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::MalformedEntity(_) => ErrorKind::MalformedEntity,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::CreateEntity(_) => ErrorKind::CreateEntity,
            Error::RetrieveEntity(_) => ErrorKind::RetrieveEntity,
            Error::RemoveEntity(_) => ErrorKind::RemoveEntity,
            Error::Storage(_) | Error::Config(_) | Error::CreateDirectory { .. } => {
                ErrorKind::Open
            }
        }
    }

    /// Wrap `cause` in the variant for `kind`.
    ///
    /// `ErrorKind::Open` has no generic wrapper and maps to `RetrieveEntity`.
    pub(crate) fn from_kind(kind: ErrorKind, cause: impl Into<Cause>) -> Self {
        let cause = cause.into();
        match kind {
            ErrorKind::NotFound => Error::NotFound(cause),
            ErrorKind::MalformedEntity => Error::MalformedEntity(cause),
            ErrorKind::Conflict => Error::Conflict(cause),
            ErrorKind::CreateEntity => Error::CreateEntity(cause),
            ErrorKind::RemoveEntity => Error::RemoveEntity(cause),
            ErrorKind::RetrieveEntity | ErrorKind::Open => Error::RetrieveEntity(cause),
        }
    }
}

/// Cause attached to an operation aborted through its cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Error::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::MalformedEntity("x".into()).kind(),
            ErrorKind::MalformedEntity
        );
        assert_eq!(Error::Conflict("x".into()).kind(), ErrorKind::Conflict);
        assert_eq!(Error::CreateEntity("x".into()).kind(), ErrorKind::CreateEntity);
        assert_eq!(
            Error::RetrieveEntity("x".into()).kind(),
            ErrorKind::RetrieveEntity
        );
        assert_eq!(Error::RemoveEntity("x".into()).kind(), ErrorKind::RemoveEntity);
        assert_eq!(
            Error::Storage(rusqlite::Error::InvalidQuery).kind(),
            ErrorKind::Open
        );
        assert_eq!(
            Error::from(ConfigError::Validation(Vec::new())).kind(),
            ErrorKind::Open
        );
    }

    #[test]
    fn test_from_kind_roundtrips() {
        for kind in [
            ErrorKind::NotFound,
            ErrorKind::MalformedEntity,
            ErrorKind::Conflict,
            ErrorKind::CreateEntity,
            ErrorKind::RetrieveEntity,
            ErrorKind::RemoveEntity,
        ] {
            assert_eq!(Error::from_kind(kind, "cause").kind(), kind);
        }
    }

    #[test]
    fn test_cause_is_exposed_as_source() {
        let err = Error::CreateEntity(Box::new(Cancelled));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "operation cancelled");
        assert_eq!(err.to_string(), "Failed to create entity: operation cancelled");
    }
}
