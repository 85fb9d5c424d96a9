//! # Migrations
//!
//! SQL files under `migrations/sqlite/`, embedded at compile time and applied
//! in filename order on every open.
//!
//! Records are JSON bodies, so most model changes need no migration; add a
//! new `NNN_description.sql` only for new indexes or tables, never edit an
//! applied one.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations. Safe to call on an up-to-date database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(migrations = MIGRATOR.migrations.len(), "Document schema up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collection, SqliteStore};
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_rerun_keeps_documents() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) \
             VALUES ('charges', 'c-1', '{}', '2024-03-01', '2024-03-01')",
        )
        .execute(&pool)
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();

        let store = SqliteStore::new(pool);
        assert_eq!(store.count(Collection::Charges).await.unwrap(), 1);
    }
}
