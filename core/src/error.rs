//! Error taxonomy for quarry-core (§7 of the design spec).
//!
//! Driver-specific errors are translated into this taxonomy by name at the
//! `execute_sql` boundary (see [`crate::driver`]); builder-level misuse
//! raises synchronously, before any SQL reaches a driver.

use compact_str::CompactString;
use thiserror::Error;

/// Core error type for all quarry operations.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Missing driver, invalid field combination, or other setup mistake.
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(CompactString),

    /// Generic server-reported error that doesn't fit a more specific kind.
    #[error("database error: {0}")]
    Database(CompactString),

    /// Bad value, encoding, or truncation reported by the server.
    #[error("data error: {0}")]
    Data(CompactString),

    /// A constraint (unique, foreign key, check, not-null) was violated.
    #[error("integrity error: {0}")]
    Integrity(CompactString),

    /// The driver was used incorrectly (e.g. cursor used after close).
    #[error("interface error: {0}")]
    Interface(CompactString),

    /// Server-side invariant violation.
    #[error("internal error: {0}")]
    Internal(CompactString),

    /// The dialect does not support the requested feature.
    #[error("not supported: {0}")]
    NotSupported(CompactString),

    /// Connection, lock, or deadlock failure.
    #[error("operational error: {0}")]
    Operational(CompactString),

    /// Malformed SQL or wrong parameter count.
    #[error("programming error: {0}")]
    Programming(CompactString),

    /// `Model::get` (or an equivalent single-row fetch) found no rows.
    #[error("{model} matching query does not exist")]
    DoesNotExist {
        /// Name of the model whose query came back empty.
        model: CompactString,
    },

    /// A query builder was misused (e.g. `WHERE` on an `INSERT`, `FOR
    /// UPDATE` on a dialect that doesn't support it). Raised synchronously
    /// at call time, never deferred to execution.
    #[error("builder error: {0}")]
    Builder(CompactString),

    /// The transaction/savepoint/manual frame stack is corrupted: a pop
    /// observed a different frame on top than the one it expected.
    #[error("transaction stack corrupted")]
    TransactionStackCorrupted,

    /// A value failed to convert between the in-memory and db representation.
    #[error("conversion error: {0}")]
    Conversion(CompactString),
}

/// Result type for quarry operations.
pub type Result<T> = core::result::Result<T, QuarryError>;

/// Translates a driver-reported error name into a [`QuarryError`] kind.
///
/// Concrete drivers are external collaborators (see [`crate::driver`]); this
/// function realizes the "single translation table" from driver error names
/// to core error kinds described in the design notes, so that every driver
/// binding maps its native exception hierarchy the same way.
pub fn translate_driver_error(name: &str, message: impl Into<CompactString>) -> QuarryError {
    let message = message.into();
    match name {
        "IntegrityError" | "UNIQUE" | "FOREIGN KEY" | "CHECK" | "NOT NULL" => {
            QuarryError::Integrity(message)
        }
        "OperationalError" | "locked" | "deadlock" | "connection" => {
            QuarryError::Operational(message)
        }
        "ProgrammingError" | "syntax" => QuarryError::Programming(message),
        "DataError" | "encoding" | "truncat" => QuarryError::Data(message),
        "InterfaceError" => QuarryError::Interface(message),
        "InternalError" => QuarryError::Internal(message),
        "NotSupportedError" => QuarryError::NotSupported(message),
        _ => QuarryError::Database(message),
    }
}
