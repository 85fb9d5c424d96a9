//! # Error Types
//!
//! Domain-specific error types for solo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  solo-core errors (this file)                                          │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ImportError      - Row-numbered CSV failures (whole file)         │
//! │                                                                         │
//! │  solo-db errors (separate crate)                                       │
//! │  └── DbError          - Store / commit failures                        │
//! │                                                                         │
//! │  solo-sync errors (separate crate)                                     │
//! │  └── SyncError        - Relay auth / network / data-shape failures     │
//! │                                                                         │
//! │  Every error reports exactly one ErrorKind for the presentation layer  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// Classification shared by every error in the workspace.
///
/// The dashboard only needs to know which bucket an error falls into to
/// pick a message ("fix the input", "check credentials", "check network").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad user input, nothing was applied.
    Validation,
    /// A product or ingredient id no longer resolves.
    UnknownReference,
    /// Row-numbered CSV failure.
    ImportFormat,
    /// Relay refused the credentials or the token.
    ExternalAuth,
    /// Relay unreachable or timed out.
    ExternalNetwork,
    /// Relay answered with an unexpected payload.
    ExternalDataShape,
    /// The store rejected an atomic batch.
    CommitFailure,
    /// Record does not exist.
    NotFound,
    /// Operation not allowed in the record's current state.
    InvalidState,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Ingredient id does not resolve.
    ///
    /// ## When This Occurs
    /// - A recipe line points at a deleted ingredient
    /// - A loss targets an ingredient that was removed meanwhile
    ///
    /// The enclosing transaction is aborted; no stock moves.
    #[error("Unknown ingredient: {0}")]
    UnknownIngredient(String),

    /// Product id does not resolve.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// A record looked up by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Record is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Receiving a purchase order that is already received
    /// - Editing quantities on a received purchase order
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
        operation: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// CSV file rejected.
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        status: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            status: status.into(),
            operation: operation.into(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::UnknownIngredient(_) | CoreError::UnknownProduct(_) => {
                ErrorKind::UnknownReference
            }
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InvalidState { .. } => ErrorKind::InvalidState,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Import(_) => ErrorKind::ImportFormat,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any store access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Invalid format (e.g., invalid date, non-numeric amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Collection must contain at least one element.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn non_negative(field: impl Into<String>) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.into(),
        }
    }

    pub fn format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn empty(field: impl Into<String>) -> Self {
        ValidationError::Empty {
            field: field.into(),
        }
    }
}

// =============================================================================
// Import Error
// =============================================================================

/// One rejected CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RowError {
    /// Physical line in the file (header = 1).
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// A CSV file that was rejected as a whole.
///
/// Every failing row is listed; nothing from the file was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} invalid row(s) in {file}; first: {}", .rows.len(), first_row(.rows))]
pub struct ImportError {
    /// What was being imported ("ingredients", "products", "orders").
    pub file: String,
    pub rows: Vec<RowError>,
}

fn first_row(rows: &[RowError]) -> String {
    rows.first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
