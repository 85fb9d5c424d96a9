//! # Database Error Types
//!
//! Error types for store operations and the services built on them.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (solo-core rules)         │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError::kind() → ErrorKind ← One bucket per failure                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Dashboard displays user-friendly message                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use solo_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

use crate::store::Collection;

/// Store and transaction errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Document not found.
    ///
    /// ## When This Occurs
    /// - Looking up a deleted record
    /// - Updating a record that never existed
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A document with this id already exists in the collection.
    #[error("Duplicate document {collection}/{id}")]
    Duplicate { collection: Collection, id: String },

    /// A batch operation targets a document that does not exist.
    ///
    /// ## When This Occurs
    /// - Incrementing stock of an ingredient deleted meanwhile
    /// - Merging into a deleted record
    ///
    /// The whole batch is rolled back.
    #[error("Unknown reference {collection}/{id}")]
    UnknownReference { collection: Collection, id: String },

    /// A guarded field did not hold the expected value at commit time.
    ///
    /// ## When This Occurs
    /// - Two operators receive the same purchase order at once
    #[error("Precondition failed on {collection}/{id}: {field} is {actual}, expected {expected}")]
    PreconditionFailed {
        collection: Collection,
        id: String,
        field: String,
        expected: String,
        actual: String,
    },

    /// A stored body could not be read or written as JSON.
    #[error("Bad document in {collection}: {reason}")]
    Serialization { collection: Collection, reason: String },

    /// Business rule violation raised by solo-core.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The atomic batch was rejected by the store.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// Invoice attachment could not be stored or released.
    #[error("Invoice storage error: {0}")]
    InvoiceStorage(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn unknown_reference(collection: Collection, id: impl Into<String>) -> Self {
        DbError::UnknownReference {
            collection,
            id: id.into(),
        }
    }

    pub fn serialization(collection: Collection, err: impl std::fmt::Display) -> Self {
        DbError::Serialization {
            collection,
            reason: err.to_string(),
        }
    }

    /// Returns the classification of this error.
    ///
    /// ## Mapping
    /// ```text
    /// NotFound              → NOT_FOUND
    /// Duplicate             → VALIDATION
    /// UnknownReference      → UNKNOWN_REFERENCE
    /// PreconditionFailed    → INVALID_STATE
    /// Domain(e)             → e.kind()
    /// everything else       → COMMIT_FAILURE
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::Duplicate { .. } => ErrorKind::Validation,
            DbError::UnknownReference { .. } => ErrorKind::UnknownReference,
            DbError::PreconditionFailed { .. } => ErrorKind::InvalidState,
            DbError::Domain(e) => e.kind(),
            DbError::Serialization { .. }
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::CommitFailed(_)
            | DbError::InvoiceStorage(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ErrorKind::CommitFailure,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("UNIQUE constraint failed") {
                    DbError::CommitFailed(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(DbError::not_found("Sale", "s-1").kind(), ErrorKind::NotFound);
        assert_eq!(
            DbError::unknown_reference(Collection::Ingredients, "x").kind(),
            ErrorKind::UnknownReference
        );
        assert_eq!(
            DbError::from(ValidationError::positive("quantity")).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            DbError::from(CoreError::UnknownIngredient("x".into())).kind(),
            ErrorKind::UnknownReference
        );
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::CommitFailure);
    }

    #[test]
    fn test_messages() {
        let err = DbError::unknown_reference(Collection::Ingredients, "flour");
        assert_eq!(err.to_string(), "Unknown reference ingredients/flour");
    }
}
