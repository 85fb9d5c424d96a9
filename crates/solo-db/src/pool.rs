//! # Database Handle
//!
//! Opens the SQLite file behind the document store and hands out the
//! back-office services over it.
//!
//! ```text
//! DbConfig::new(path) ──► Database::new(config) ──► db.backoffice(invoices)
//!                            │
//!                            ├── SqlitePool (WAL, NORMAL sync)
//!                            ├── embedded migrations
//!                            └── one SqliteStore shared by every handle
//! ```
//!
//! Every batch is one SQLite transaction, so a sale and its stock movements
//! land together or not at all.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::invoice::InvoiceStorage;
use crate::migrations;
use crate::services::Backoffice;
use crate::store::{SharedStore, SqliteStore};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Created on first open.
    pub database_path: PathBuf,
    /// One restaurant rarely needs more than a handful.
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Private in-memory database for tests. A single connection, since
    /// each `:memory:` connection is its own database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// The pool plus the document store built on it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    /// Shared by every clone so they all see one change feed.
    store: SqliteStore,
}

impl Database {
    /// Opens (or creates) the database file and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening back-office database");

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        Ok(Database {
            store: SqliteStore::new(pool.clone()),
            pool,
        })
    }

    pub fn store(&self) -> SqliteStore {
        self.store.clone()
    }

    /// The store as a trait object, ready for repositories.
    pub fn shared_store(&self) -> SharedStore {
        Arc::new(self.store.clone())
    }

    /// Every back-office service over this database.
    pub fn backoffice(&self, invoices: Arc<dyn InvoiceStorage>) -> Backoffice {
        Backoffice::new(self.shared_store(), invoices)
    }

    /// Store operations fail with `ConnectionFailed` afterwards.
    pub async fn close(&self) {
        info!("Closing back-office database");
        self.pool.close().await;
    }
}
