//! SQLite-backed document store.
//!
//! ## Schema
//! ```text
//! documents
//! ├── seq         INTEGER PK AUTOINCREMENT   insertion order
//! ├── collection  TEXT     ┐ UNIQUE
//! ├── id          TEXT     ┘
//! ├── body        TEXT     JSON document
//! ├── created_at  TEXT
//! └── updated_at  TEXT
//! ```
//!
//! Every batch runs inside one sqlx transaction. Reads made while applying
//! an op see the earlier ops of the same batch; any failure drops the
//! transaction, which rolls it back.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{
    check_guard, increment_field, merge_into, ChangeEvent, ChangeKind, ChangeSet, Collection,
    DocumentStore, WriteBatch, WriteOp, CHANGE_FEED_CAPACITY,
};
use crate::error::{DbError, DbResult};

/// Document store over the `documents` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteStore {
    /// Creates a store over an already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        SqliteStore { pool, changes }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: Collection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?1")
            .bind(collection.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn parse_body(collection: Collection, raw: &str) -> DbResult<Value> {
    serde_json::from_str(raw).map_err(|e| DbError::serialization(collection, e))
}

async fn load(
    conn: &mut SqliteConnection,
    collection: Collection,
    id: &str,
) -> DbResult<Option<Value>> {
    let raw: Option<String> =
        sqlx::query_scalar("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    raw.map(|b| parse_body(collection, &b)).transpose()
}

async fn insert_row(
    conn: &mut SqliteConnection,
    collection: Collection,
    id: &str,
    body: &Value,
) -> DbResult<()> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, body, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(body.to_string())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_row(
    conn: &mut SqliteConnection,
    collection: Collection,
    id: &str,
    body: &Value,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE documents SET body = ?3, updated_at = ?4
        WHERE collection = ?1 AND id = ?2
        "#,
    )
    .bind(collection.as_str())
    .bind(id)
    .bind(body.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn apply(conn: &mut SqliteConnection, op: WriteOp, changes: &mut ChangeSet) -> DbResult<()> {
    match op {
        WriteOp::Create {
            collection,
            id,
            body,
        } => {
            if load(conn, collection, &id).await?.is_some() {
                return Err(DbError::Duplicate { collection, id });
            }
            insert_row(conn, collection, &id, &body).await?;
            changes.record(collection, &id, ChangeKind::Created);
        }
        WriteOp::Set {
            collection,
            id,
            body,
        } => {
            if load(conn, collection, &id).await?.is_some() {
                update_row(conn, collection, &id, &body).await?;
                changes.record(collection, &id, ChangeKind::Updated);
            } else {
                insert_row(conn, collection, &id, &body).await?;
                changes.record(collection, &id, ChangeKind::Created);
            }
        }
        WriteOp::Merge {
            collection,
            id,
            patch,
        } => {
            let mut body = load(conn, collection, &id)
                .await?
                .ok_or_else(|| DbError::unknown_reference(collection, id.clone()))?;
            merge_into(collection, &id, &mut body, &patch)?;
            update_row(conn, collection, &id, &body).await?;
            changes.record(collection, &id, ChangeKind::Updated);
        }
        WriteOp::Delete { collection, id } => {
            let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection.as_str())
                .bind(&id)
                .execute(&mut *conn)
                .await?;
            if result.rows_affected() > 0 {
                changes.record(collection, &id, ChangeKind::Deleted);
            }
        }
        WriteOp::Increment {
            collection,
            id,
            field,
            delta,
        } => {
            let mut body = load(conn, collection, &id)
                .await?
                .ok_or_else(|| DbError::unknown_reference(collection, id.clone()))?;
            increment_field(collection, &id, &mut body, &field, delta)?;
            update_row(conn, collection, &id, &body).await?;
            changes.record(collection, &id, ChangeKind::Updated);
        }
        WriteOp::Guard {
            collection,
            id,
            field,
            equals,
        } => {
            let body = load(conn, collection, &id)
                .await?
                .ok_or_else(|| DbError::unknown_reference(collection, id.clone()))?;
            check_guard(collection, &id, &body, &field, &equals)?;
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: Collection, id: &str) -> DbResult<Option<Value>> {
        let mut conn = self.pool.acquire().await?;
        load(&mut *conn, collection, id).await
    }

    async fn list(&self, collection: Collection) -> DbResult<Vec<Value>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ?1 ORDER BY seq")
                .bind(collection.as_str())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(|raw| parse_body(collection, raw)).collect()
    }

    async fn commit(&self, batch: WriteBatch) -> DbResult<()> {
        let ops = batch.len();
        let mut tx = self.pool.begin().await?;
        let mut changes = ChangeSet::default();

        for op in batch.into_ops() {
            if let Err(e) = apply(&mut *tx, op, &mut changes).await {
                warn!(error = %e, "Batch rejected, rolling back");
                return Err(e);
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::CommitFailed(e.to_string()))?;

        debug!(ops, "Batch committed");
        changes.publish(&self.changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use rust_decimal::Decimal;
    use serde_json::json;

    async fn store() -> SqliteStore {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.store()
    }

    #[tokio::test]
    async fn test_batch_is_atomic() {
        let store = store().await;
        store
            .insert(Collection::Ingredients, "flour", json!({"id": "flour", "quantity": "10"}))
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch
            .increment(Collection::Ingredients, "flour", "quantity", Decimal::from(-4))
            .push(WriteOp::Create {
                collection: Collection::Orders,
                id: "s1".into(),
                body: json!({"id": "s1"}),
            })
            .increment(Collection::Ingredients, "missing", "quantity", Decimal::ONE);
        assert!(matches!(
            store.commit(batch).await,
            Err(DbError::UnknownReference { .. })
        ));

        let flour = store.get(Collection::Ingredients, "flour").await.unwrap().unwrap();
        assert_eq!(flour["quantity"], json!("10"));
        assert!(store.get(Collection::Orders, "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ops_see_earlier_writes_and_events_follow_commit() {
        let store = store().await;
        let mut rx = store.subscribe();

        let mut batch = WriteBatch::new();
        batch
            .push(WriteOp::Create {
                collection: Collection::PurchaseOrders,
                id: "po".into(),
                body: json!({"id": "po", "status": "pending"}),
            })
            .guard(Collection::PurchaseOrders, "po", "status", "pending")
            .merge(Collection::PurchaseOrders, "po", json!({"status": "received"}));
        store.commit(batch).await.unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, ChangeKind::Created);
        assert!(rx.try_recv().is_err());

        let mut again = WriteBatch::new();
        again.guard(Collection::PurchaseOrders, "po", "status", "pending");
        assert!(matches!(
            store.commit(again).await,
            Err(DbError::PreconditionFailed { .. })
        ));
        assert_eq!(store.count(Collection::PurchaseOrders).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let store = store().await;
        for id in ["z", "a", "m"] {
            store.insert(Collection::Suppliers, id, json!({"id": id})).await.unwrap();
        }
        assert!(store.delete(Collection::Suppliers, "a").await.unwrap());
        let ids: Vec<String> = store
            .list(Collection::Suppliers)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["z", "m"]);
    }
}
