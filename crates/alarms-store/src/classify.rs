//! Classification of SQLite failures into the store's error taxonomy.
//!
//! Classification depends only on the operation being performed and the
//! structured error code reported by SQLite. Message text is never
//! inspected.

use std::os::raw::c_int;

use rusqlite::ErrorCode;
use rusqlite::ffi;

use crate::error::{Cause, Error, ErrorKind};

/// Extended code for a value rejected by a STRICT column type.
const SQLITE_CONSTRAINT_DATATYPE: c_int = 3091;

/// The kind of storage operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Retrieve,
    Remove,
}

impl Operation {
    /// Kind used for failures with no more specific classification.
    pub fn failure_kind(self) -> ErrorKind {
        match self {
            Operation::Create => ErrorKind::CreateEntity,
            Operation::Retrieve => ErrorKind::RetrieveEntity,
            Operation::Remove => ErrorKind::RemoveEntity,
        }
    }

    /// Wrap `cause` in this operation's generic failure.
    pub fn failure(self, cause: impl Into<Cause>) -> Error {
        Error::from_kind(self.failure_kind(), cause)
    }
}

/// Classify a SQLite failure raised while performing `op`.
pub fn classify(op: Operation, err: rusqlite::Error) -> Error {
    let kind = classify_kind(op, &err);
    Error::from_kind(kind, err)
}

/// Map `(operation, native error)` to a taxonomy kind.
pub fn classify_kind(op: Operation, err: &rusqlite::Error) -> ErrorKind {
    match err {
        rusqlite::Error::QueryReturnedNoRows => ErrorKind::NotFound,
        rusqlite::Error::SqliteFailure(native, _) => match native.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                ErrorKind::Conflict
            }
            ffi::SQLITE_CONSTRAINT_CHECK
            | ffi::SQLITE_CONSTRAINT_NOTNULL
            | SQLITE_CONSTRAINT_DATATYPE => ErrorKind::MalformedEntity,
            _ => match native.code {
                ErrorCode::TypeMismatch | ErrorCode::TooBig => ErrorKind::MalformedEntity,
                _ => op.failure_kind(),
            },
        },
        // Stored value could not be read back as the expected type.
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..)
        | rusqlite::Error::Utf8Error(..) => ErrorKind::MalformedEntity,
        _ => op.failure_kind(),
    }
}
