//! # solo-db: Storage and Transactions for the Solo Back-Office
//!
//! Document storage, the stock ledger and every service that writes to it.
//! SQLite (through sqlx) is the production store; an in-memory store with
//! the same batch semantics backs the tests.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Solo Back-Office Data Flow                       │
//! │                                                                         │
//! │  Dashboard / solo-sync import                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     solo-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌─────────────┐  │   │
//! │  │   │  services/    │───►│ Transaction      │──►│ StockLedger │  │   │
//! │  │   │  Backoffice   │    │ Coordinator      │   │ (deltas)    │  │   │
//! │  │   └───────┬───────┘    └────────┬─────────┘   └──────┬──────┘  │   │
//! │  │           │  Repository<T>      │   WriteBatch       │         │   │
//! │  │           ▼                     ▼                    ▼         │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐  │   │
//! │  │   │  DocumentStore:  SqliteStore  |  MemoryStore            │  │   │
//! │  │   └─────────────────────────────────────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite: documents(collection, id, body JSON)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`store`] - Document store trait, write batches, SQLite and memory stores
//! - [`repository`] - Typed access to one collection
//! - [`ledger`] - Ingredient stock movements
//! - [`coordinator`] - Atomic sales, losses and purchase receipts
//! - [`invoice`] - Invoice file storage
//! - [`services`] - Catalog, purchasing, payroll, finance and reports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use solo_db::{Database, DbConfig, FsInvoiceStorage};
//!
//! let config = DbConfig::new("path/to/solo.db");
//! let db = Database::new(config).await?;
//!
//! let office = db.backoffice(Arc::new(FsInvoiceStorage::new("invoices")));
//! let sale = office.transactions().record_sale(new_sale).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coordinator;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod services;
pub mod store;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use coordinator::TransactionCoordinator;
pub use error::{DbError, DbResult};
pub use invoice::{FsInvoiceStorage, InvoiceStorage};
pub use ledger::StockLedger;
pub use pool::{Database, DbConfig};
pub use repository::Repository;
pub use services::Backoffice;
pub use store::{
    ChangeEvent, ChangeKind, Collection, Document, DocumentStore, MemoryStore, SharedStore,
    SqliteStore, WriteBatch, WriteOp,
};
