//! In-process store with the same batch semantics as [`super::SqliteStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::{
    check_guard, increment_field, merge_into, ChangeEvent, ChangeKind, ChangeSet, Collection,
    DocumentStore, WriteBatch, WriteOp, CHANGE_FEED_CAPACITY,
};
use crate::error::{DbError, DbResult};

type Collections = HashMap<Collection, Vec<(String, Value)>>;

/// Documents kept in memory, in insertion order per collection.
///
/// A batch is applied to a copy of the state and swapped in only when every
/// op succeeded.
pub struct MemoryStore {
    state: RwLock<Collections>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        MemoryStore {
            state: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

fn find<'a>(
    state: &'a mut Collections,
    collection: Collection,
    id: &str,
) -> Option<&'a mut Value> {
    state
        .get_mut(&collection)
        .and_then(|docs| docs.iter_mut().find(|(key, _)| key == id))
        .map(|(_, body)| body)
}

fn apply(state: &mut Collections, op: WriteOp, changes: &mut ChangeSet) -> DbResult<()> {
    match op {
        WriteOp::Create {
            collection,
            id,
            body,
        } => {
            let docs = state.entry(collection).or_default();
            if docs.iter().any(|(key, _)| *key == id) {
                return Err(DbError::Duplicate { collection, id });
            }
            changes.record(collection, &id, ChangeKind::Created);
            docs.push((id, body));
        }
        WriteOp::Set {
            collection,
            id,
            body,
        } => match find(state, collection, &id) {
            Some(existing) => {
                *existing = body;
                changes.record(collection, &id, ChangeKind::Updated);
            }
            None => {
                changes.record(collection, &id, ChangeKind::Created);
                state.entry(collection).or_default().push((id, body));
            }
        },
        WriteOp::Merge {
            collection,
            id,
            patch,
        } => {
            let body = find(state, collection, &id)
                .ok_or_else(|| DbError::unknown_reference(collection, id.clone()))?;
            merge_into(collection, &id, body, &patch)?;
            changes.record(collection, &id, ChangeKind::Updated);
        }
        WriteOp::Delete { collection, id } => {
            if let Some(docs) = state.get_mut(&collection) {
                let before = docs.len();
                docs.retain(|(key, _)| *key != id);
                if docs.len() != before {
                    changes.record(collection, &id, ChangeKind::Deleted);
                }
            }
        }
        WriteOp::Increment {
            collection,
            id,
            field,
            delta,
        } => {
            let body = find(state, collection, &id)
                .ok_or_else(|| DbError::unknown_reference(collection, id.clone()))?;
            increment_field(collection, &id, body, &field, delta)?;
            changes.record(collection, &id, ChangeKind::Updated);
        }
        WriteOp::Guard {
            collection,
            id,
            field,
            equals,
        } => {
            let body = find(state, collection, &id)
                .ok_or_else(|| DbError::unknown_reference(collection, id.clone()))?;
            check_guard(collection, &id, body, &field, &equals)?;
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> DbResult<Option<Value>> {
        let state = self.state.read().await;
        Ok(state
            .get(&collection)
            .and_then(|docs| docs.iter().find(|(key, _)| key == id))
            .map(|(_, body)| body.clone()))
    }

    async fn list(&self, collection: Collection) -> DbResult<Vec<Value>> {
        let state = self.state.read().await;
        Ok(state
            .get(&collection)
            .map(|docs| docs.iter().map(|(_, body)| body.clone()).collect())
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> DbResult<()> {
        let ops = batch.len();
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let mut changes = ChangeSet::default();
        for op in batch.into_ops() {
            apply(&mut next, op, &mut changes)?;
        }
        *state = next;
        drop(state);

        debug!(ops, "Batch committed (memory)");
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
    use rust_decimal::Decimal;
    use serde_json::json;

    #[tokio::test]
    async fn test_failed_batch_leaves_nothing_behind() {
        let store = MemoryStore::new();
        store
            .insert(Collection::Ingredients, "flour", json!({"id": "flour", "quantity": "10"}))
            .await
            .unwrap();
        let mut rx = store.subscribe();

        let mut batch = WriteBatch::new();
        batch
            .increment(Collection::Ingredients, "flour", "quantity", Decimal::from(-2))
            .increment(Collection::Ingredients, "gone", "quantity", Decimal::from(-1));
        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, DbError::UnknownReference { .. }));

        let flour = store.get(Collection::Ingredients, "flour").await.unwrap().unwrap();
        assert_eq!(flour["quantity"], json!("10"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order_and_set_replaces() {
        let store = MemoryStore::new();
        for id in ["b", "a", "c"] {
            store.insert(Collection::Charges, id, json!({"id": id})).await.unwrap();
        }
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Set {
            collection: Collection::Charges,
            id: "a".into(),
            body: json!({"id": "a", "name": "Loyer"}),
        });
        store.commit(batch).await.unwrap();

        let ids: Vec<_> = store
            .list(Collection::Charges)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(store.insert(Collection::Charges, "a", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update(Collection::Suppliers, "x", json!({"name": "Metro"})).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(!store.delete(Collection::Suppliers, "x").await.unwrap());
    }
}
