//! # Sync Error Types
//!
//! Error types for the external sales import.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Import Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │  Relay / Auth   │  │  Relay / Transport      │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  AuthFailed     │  │  NetworkError           │ │
//! │  │  InvalidUrl     │  │  MissingToken   │  │  Timeout                │ │
//! │  │  ConfigLoad...  │  │                 │  │  RelayUnavailable       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Relay / Shape  │  │    Storage      │  │      Request            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidResponse│  │  Database       │  │  InvalidRange           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant maps to one [`ErrorKind`], and [`SyncError::user_message`]
//! tells the operator whether to check credentials, the network, or the
//! relay's payload format.

use solo_core::ErrorKind;
use solo_db::DbError;
use thiserror::Error;

/// Result type alias for import operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid import configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Request Errors
    // =========================================================================
    /// End date before start date.
    #[error("Invalid import range: {start} to {end}")]
    InvalidRange { start: String, end: String },

    // =========================================================================
    // Relay Errors
    // =========================================================================
    /// The relay refused the login or the token.
    #[error("Relay authentication failed: {0}")]
    AuthFailed(String),

    /// Login succeeded but carried no token.
    #[error("Relay login returned no token")]
    MissingToken,

    /// Relay unreachable.
    #[error("Relay unreachable: {0}")]
    NetworkError(String),

    #[error("Relay request timed out")]
    Timeout,

    /// Relay reachable but answered with an HTTP error.
    #[error("Relay error on page {page} (HTTP {status}): {message}")]
    RelayUnavailable {
        page: u32,
        status: u16,
        message: String,
    },

    /// Relay answered with something other than the expected payload.
    #[error("Unexpected relay response: {0}")]
    InvalidResponse(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error(transparent)]
    Database(#[from] DbError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else if err.is_decode() {
            SyncError::InvalidResponse(err.to_string())
        } else {
            SyncError::NetworkError(err.to_string())
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::InvalidConfig(_)
            | SyncError::InvalidUrl(_)
            | SyncError::ConfigLoadFailed(_)
            | SyncError::InvalidRange { .. } => ErrorKind::Validation,
            SyncError::AuthFailed(_) | SyncError::MissingToken => ErrorKind::ExternalAuth,
            SyncError::NetworkError(_) | SyncError::Timeout | SyncError::RelayUnavailable { .. } => {
                ErrorKind::ExternalNetwork
            }
            SyncError::InvalidResponse(_) => ErrorKind::ExternalDataShape,
            SyncError::Database(err) => err.kind(),
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_) | SyncError::InvalidUrl(_) | SyncError::ConfigLoadFailed(_)
        )
    }

    /// Sentence shown to the operator when an import stops.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::ExternalAuth => format!(
                "Authentication with the sales relay failed. Check the relay credentials. ({})",
                self
            ),
            ErrorKind::ExternalNetwork => format!(
                "Could not reach the sales relay. Check the network and the relay URL. ({})",
                self
            ),
            ErrorKind::ExternalDataShape => format!(
                "The sales relay answered in an unexpected format; the external API may have changed. ({})",
                self
            ),
            _ if self.is_config_error() => format!("Import configuration problem: {}", self),
            _ => format!("Import failed: {}", self),
        }
    }
}
