//! # Document Store
//!
//! Keyed JSON collections with an atomic multi-write batch and a change feed.
//!
//! ## Batch Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WriteBatch                                                             │
//! │  ├── Create    { collection, id, body }   fails if the id exists        │
//! │  ├── Set       { collection, id, body }   create or replace             │
//! │  ├── Merge     { collection, id, patch }  shallow object merge          │
//! │  ├── Delete    { collection, id }         no-op when missing            │
//! │  ├── Increment { collection, id, field, delta }                         │
//! │  │        relative decimal delta applied inside the commit              │
//! │  └── Guard     { collection, id, field, equals }                        │
//! │           precondition checked inside the commit                        │
//! │                                                                         │
//! │  commit(batch) ──► all ops applied ──► ChangeEvent per touched doc      │
//! │               └──► any op fails   ──► nothing applied, no events        │
//! │                                                                         │
//! │  Merge / Increment / Guard on a missing document → UnknownReference     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two implementations share these rules: [`SqliteStore`] (production) and
//! [`MemoryStore`] (tests, demos).

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::{DbError, DbResult};

/// Capacity of the change feed before slow subscribers start lagging.
pub(crate) const CHANGE_FEED_CAPACITY: usize = 256;

// =============================================================================
// Collections
// =============================================================================

/// One collection per stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Ingredients,
    Products,
    Orders,
    Losses,
    Suppliers,
    PurchaseOrders,
    Charges,
    Employees,
    Absences,
    SalaryPayments,
    DailyPayments,
}

impl Collection {
    pub const ALL: [Collection; 11] = [
        Collection::Ingredients,
        Collection::Products,
        Collection::Orders,
        Collection::Losses,
        Collection::Suppliers,
        Collection::PurchaseOrders,
        Collection::Charges,
        Collection::Employees,
        Collection::Absences,
        Collection::SalaryPayments,
        Collection::DailyPayments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Ingredients => "ingredients",
            Collection::Products => "products",
            Collection::Orders => "orders",
            Collection::Losses => "losses",
            Collection::Suppliers => "suppliers",
            Collection::PurchaseOrders => "purchaseOrders",
            Collection::Charges => "charges",
            Collection::Employees => "employees",
            Collection::Absences => "absences",
            Collection::SalaryPayments => "salaryPayments",
            Collection::DailyPayments => "dailyPayments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown collection: {}", s))
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A record stored in exactly one collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
    /// Human name used in NotFound errors.
    const ENTITY: &'static str;

    fn id(&self) -> &str;
}

pub(crate) fn encode<T: Document>(record: &T) -> DbResult<Value> {
    serde_json::to_value(record).map_err(|e| DbError::serialization(T::COLLECTION, e))
}

pub(crate) fn decode<T: Document>(body: Value) -> DbResult<T> {
    serde_json::from_value(body).map_err(|e| DbError::serialization(T::COLLECTION, e))
}

// =============================================================================
// Write Batch
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create {
        collection: Collection,
        id: String,
        body: Value,
    },
    Set {
        collection: Collection,
        id: String,
        body: Value,
    },
    Merge {
        collection: Collection,
        id: String,
        patch: Value,
    },
    Delete {
        collection: Collection,
        id: String,
    },
    Increment {
        collection: Collection,
        id: String,
        field: String,
        delta: Decimal,
    },
    Guard {
        collection: Collection,
        id: String,
        field: String,
        equals: Value,
    },
}

impl WriteOp {
    pub fn collection(&self) -> Collection {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::Set { collection, .. }
            | WriteOp::Merge { collection, .. }
            | WriteOp::Delete { collection, .. }
            | WriteOp::Increment { collection, .. }
            | WriteOp::Guard { collection, .. } => *collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Create { id, .. }
            | WriteOp::Set { id, .. }
            | WriteOp::Merge { id, .. }
            | WriteOp::Delete { id, .. }
            | WriteOp::Increment { id, .. }
            | WriteOp::Guard { id, .. } => id,
        }
    }
}

/// Ordered list of writes committed all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    /// Adds a new record; the commit fails if its id is taken.
    pub fn create<T: Document>(&mut self, record: &T) -> DbResult<&mut Self> {
        let body = encode(record)?;
        Ok(self.push(WriteOp::Create {
            collection: T::COLLECTION,
            id: record.id().to_string(),
            body,
        }))
    }

    /// Writes a record, replacing any previous body.
    pub fn set<T: Document>(&mut self, record: &T) -> DbResult<&mut Self> {
        let body = encode(record)?;
        Ok(self.push(WriteOp::Set {
            collection: T::COLLECTION,
            id: record.id().to_string(),
            body,
        }))
    }

    pub fn merge(&mut self, collection: Collection, id: &str, patch: Value) -> &mut Self {
        self.push(WriteOp::Merge {
            collection,
            id: id.to_string(),
            patch,
        })
    }

    pub fn delete(&mut self, collection: Collection, id: &str) -> &mut Self {
        self.push(WriteOp::Delete {
            collection,
            id: id.to_string(),
        })
    }

    pub fn increment(
        &mut self,
        collection: Collection,
        id: &str,
        field: &str,
        delta: Decimal,
    ) -> &mut Self {
        self.push(WriteOp::Increment {
            collection,
            id: id.to_string(),
            field: field.to_string(),
            delta,
        })
    }

    pub fn guard(
        &mut self,
        collection: Collection,
        id: &str,
        field: &str,
        equals: impl Into<Value>,
    ) -> &mut Self {
        self.push(WriteOp::Guard {
            collection,
            id: id.to_string(),
            field: field.to_string(),
            equals: equals.into(),
        })
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

// =============================================================================
// Change Feed
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Emitted once per touched document after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: String,
    pub kind: ChangeKind,
}

/// Folds per-op events so each document reports once, with its net effect.
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    events: Vec<ChangeEvent>,
}

impl ChangeSet {
    pub(crate) fn record(&mut self, collection: Collection, id: &str, kind: ChangeKind) {
        match self
            .events
            .iter_mut()
            .find(|e| e.collection == collection && e.id == id)
        {
            Some(existing) => {
                existing.kind = match (existing.kind, kind) {
                    (_, ChangeKind::Deleted) => ChangeKind::Deleted,
                    (ChangeKind::Created, _) => ChangeKind::Created,
                    (ChangeKind::Deleted, _) => ChangeKind::Updated,
                    (_, other) => other,
                }
            }
            None => self.events.push(ChangeEvent {
                collection,
                id: id.to_string(),
                kind,
            }),
        }
    }

    pub(crate) fn publish(self, sender: &broadcast::Sender<ChangeEvent>) {
        for event in self.events {
            // Err only means nobody is listening.
            let _ = sender.send(event);
        }
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// The persistent collection store.
///
/// Implementations must apply a [`WriteBatch`] atomically and publish change
/// events only after the batch is durable.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> DbResult<Option<Value>>;

    /// Every document of the collection, in insertion order.
    async fn list(&self, collection: Collection) -> DbResult<Vec<Value>>;

    async fn commit(&self, batch: WriteBatch) -> DbResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    async fn insert(&self, collection: Collection, id: &str, body: Value) -> DbResult<()> {
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::Create {
            collection,
            id: id.to_string(),
            body,
        });
        self.commit(batch).await
    }

    /// Shallow-merges `patch` into an existing document.
    async fn update(&self, collection: Collection, id: &str, patch: Value) -> DbResult<()> {
        if self.get(collection, id).await?.is_none() {
            return Err(DbError::not_found(collection.as_str(), id));
        }
        let mut batch = WriteBatch::new();
        batch.merge(collection, id, patch);
        self.commit(batch).await
    }

    /// Returns false when there was nothing to delete.
    async fn delete(&self, collection: Collection, id: &str) -> DbResult<bool> {
        if self.get(collection, id).await?.is_none() {
            return Ok(false);
        }
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch).await?;
        Ok(true)
    }
}

/// Shared handle used by every service.
pub type SharedStore = Arc<dyn DocumentStore>;

// =============================================================================
// Op Semantics (shared by both stores)
// =============================================================================

/// Shallow merge: top-level keys of `patch` overwrite those of `body`.
pub(crate) fn merge_into(
    collection: Collection,
    id: &str,
    body: &mut Value,
    patch: &Value,
) -> DbResult<()> {
    let (Some(target), Some(source)) = (body.as_object_mut(), patch.as_object()) else {
        return Err(DbError::CommitFailed(format!(
            "merge into {}/{} needs JSON objects",
            collection, id
        )));
    };
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
    Ok(())
}

/// Adds `delta` to a decimal field stored as a string (or a legacy number).
/// A missing field counts as zero.
pub(crate) fn increment_field(
    collection: Collection,
    id: &str,
    body: &mut Value,
    field: &str,
    delta: Decimal,
) -> DbResult<()> {
    let object: &mut Map<String, Value> = body.as_object_mut().ok_or_else(|| {
        DbError::CommitFailed(format!("{}/{} is not a JSON object", collection, id))
    })?;
    let current = match object.get(field) {
        None | Some(Value::Null) => Decimal::ZERO,
        Some(Value::String(s)) => Decimal::from_str(s).map_err(|e| {
            DbError::serialization(collection, format!("{}/{}.{}: {}", id, field, s, e))
        })?,
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()).map_err(|e| {
            DbError::serialization(collection, format!("{}/{}.{}: {}", id, field, n, e))
        })?,
        Some(other) => {
            return Err(DbError::serialization(
                collection,
                format!("{}.{} is not numeric: {}", id, field, other),
            ))
        }
    };
    let next = (current + delta).normalize();
    object.insert(field.to_string(), Value::String(next.to_string()));
    Ok(())
}

pub(crate) fn check_guard(
    collection: Collection,
    id: &str,
    body: &Value,
    field: &str,
    equals: &Value,
) -> DbResult<()> {
    let actual = body.get(field).cloned().unwrap_or(Value::Null);
    if &actual != equals {
        return Err(DbError::PreconditionFailed {
            collection,
            id: id.to_string(),
            field: field.to_string(),
            expected: equals.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_names_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
        assert!("recipes".parse::<Collection>().is_err());
    }

    #[test]
    fn test_increment_reads_strings_and_numbers() {
        let mut body = json!({"quantity": "10.5"});
        increment_field(Collection::Ingredients, "a", &mut body, "quantity", Decimal::new(-25, 1))
            .unwrap();
        assert_eq!(body["quantity"], json!("8"));

        let mut legacy = json!({"quantity": 3});
        increment_field(Collection::Ingredients, "b", &mut legacy, "quantity", Decimal::ONE).unwrap();
        assert_eq!(legacy["quantity"], json!("4"));

        let mut missing = json!({});
        increment_field(Collection::Ingredients, "c", &mut missing, "quantity", Decimal::TWO).unwrap();
        assert_eq!(missing["quantity"], json!("2"));
    }

    #[test]
    fn test_increment_rejects_non_numeric_fields() {
        let mut body = json!({"quantity": ["1"]});
        let err = increment_field(Collection::Ingredients, "d", &mut body, "quantity", Decimal::ONE)
            .unwrap_err();
        match err {
            DbError::Serialization { collection, reason } => {
                assert_eq!(collection, Collection::Ingredients);
                assert!(reason.starts_with("d.quantity is not numeric"));
            }
            other => panic!("expected serialization error, got {:?}", other),
        }
        assert_eq!(body["quantity"], json!(["1"]));

        let mut text = json!({"quantity": "beaucoup"});
        assert!(increment_field(Collection::Ingredients, "e", &mut text, "quantity", Decimal::ONE).is_err());
    }

    #[test]
    fn test_guard_and_merge() {
        let mut body = json!({"status": "pending", "total": "5"});
        assert!(check_guard(Collection::PurchaseOrders, "po", &body, "status", &json!("pending")).is_ok());
        assert!(matches!(
            check_guard(Collection::PurchaseOrders, "po", &body, "status", &json!("received")),
            Err(DbError::PreconditionFailed { .. })
        ));

        merge_into(Collection::PurchaseOrders, "po", &mut body, &json!({"status": "received"})).unwrap();
        assert_eq!(body, json!({"status": "received", "total": "5"}));
    }

    #[test]
    fn test_change_set_folds_per_document() {
        let (tx, mut rx) = broadcast::channel(8);
        let mut changes = ChangeSet::default();
        changes.record(Collection::Orders, "s1", ChangeKind::Created);
        changes.record(Collection::Orders, "s1", ChangeKind::Updated);
        changes.record(Collection::Ingredients, "i1", ChangeKind::Updated);
        changes.publish(&tx);

        assert_eq!(rx.try_recv().unwrap().kind, ChangeKind::Created);
        assert_eq!(rx.try_recv().unwrap().id, "i1");
        assert!(rx.try_recv().is_err());
    }
}
