//! # solo-sync: External POS Import for the Solo Back-Office
//!
//! Pulls bills from the external point-of-sale system through the relay
//! service and records them as sales, with the matching stock deductions.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        External Sales Import                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 Reconciler (Import Orchestrator)                 │  │
//! │  │                                                                  │  │
//! │  │  Authenticates, pages, dedupes by bill number                    │  │
//! │  │  Streams progress, honours a cancel flag                         │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  RelayClient   │  │  group_bills   │  │ TransactionCoordinator │    │
//! │  │  (SalesFeed)   │  │                │  │ (solo-db)              │    │
//! │  │                │  │ Lines → bills  │  │                        │    │
//! │  │ POST login     │  │ Catalog match  │  │ Sale + stock deduction │    │
//! │  │ GET sales page │  │ Refund/discount│  │ in one batch per bill  │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`bill`] - Grouping raw lines into bills, line arithmetic
//! - [`config`] - Relay and database settings (TOML + environment)
//! - [`error`] - Import error types, classified auth / network / data shape
//! - [`reconciler`] - The import run itself
//! - [`relay`] - HTTP client for the relay service
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use solo_sync::{ImportConfig, Reconciler, RelayClient};
//!
//! let config = ImportConfig::load(None)?;
//! let feed = Arc::new(RelayClient::new(&config.relay)?);
//! let report = Reconciler::new(feed, &office, &config.relay)
//!     .run(start, end)
//!     .await?;
//! println!("{} bills imported", report.committed.len());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bill;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod relay;

// =============================================================================
// Re-exports
// =============================================================================

pub use bill::{group_bills, Bill, Grouping};
pub use config::{DatabaseSettings, ImportConfig, RelaySettings};
pub use error::{SyncError, SyncResult};
pub use reconciler::{BillFailure, ImportProgress, ImportReport, Reconciler};
pub use relay::{PageQuery, RawSaleLine, RelayClient, SalesFeed};
