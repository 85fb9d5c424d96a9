//! # Repository Module
//!
//! Typed access to the document collections.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service (catalog, purchasing, payroll...)                              │
//! │       │                                                                 │
//! │       │  Repository::<Ingredient>::new(store).require("id")             │
//! │       ▼                                                                 │
//! │  Repository<T: Document>                                                │
//! │  ├── get / require                                                      │
//! │  ├── list            (insertion order)                                  │
//! │  ├── create / save   (single-op batches)                                │
//! │  └── delete                                                             │
//! │       │                                                                 │
//! │       │  JSON bodies                                                    │
//! │       ▼                                                                 │
//! │  SharedStore (SqliteStore | MemoryStore)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Anything touching stock goes through [`crate::coordinator`] instead, so
//! the stock mutation and the record land in the same batch.

mod documents;

use std::marker::PhantomData;

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::store::{decode, Document, SharedStore, WriteBatch};

/// Typed view over one collection.
pub struct Repository<T: Document> {
    store: SharedStore,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: SharedStore) -> Self {
        Repository {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<T>> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(decode::<T>)
            .transpose()
    }

    /// Like [`Repository::get`] but a missing record is an error.
    pub async fn require(&self, id: &str) -> DbResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found(T::ENTITY, id))
    }

    pub async fn list(&self) -> DbResult<Vec<T>> {
        let bodies = self.store.list(T::COLLECTION).await?;
        debug!(collection = %T::COLLECTION, count = bodies.len(), "Listed documents");
        bodies.into_iter().map(decode::<T>).collect()
    }

    /// Inserts a new record; fails if the id is taken.
    pub async fn create(&self, record: &T) -> DbResult<()> {
        let mut batch = WriteBatch::new();
        batch.create(record)?;
        self.store.commit(batch).await?;
        debug!(collection = %T::COLLECTION, id = %record.id(), "Created document");
        Ok(())
    }

    /// Writes the whole record, creating it if needed.
    pub async fn save(&self, record: &T) -> DbResult<()> {
        let mut batch = WriteBatch::new();
        batch.set(record)?;
        self.store.commit(batch).await?;
        debug!(collection = %T::COLLECTION, id = %record.id(), "Saved document");
        Ok(())
    }

    /// Returns false when the record did not exist.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let deleted = self.store.delete(T::COLLECTION, id).await?;
        debug!(collection = %T::COLLECTION, id = %id, deleted, "Deleted document");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use solo_core::{Ingredient, Money, Supplier};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_typed_round_trip_through_store() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let repo = Repository::<Ingredient>::new(store.clone());

        let flour = Ingredient::new("Farine", Decimal::from(25), "kg", Money::from_cents(120)).unwrap();
        repo.create(&flour).await.unwrap();
        assert!(repo.create(&flour).await.is_err());

        let loaded = repo.require(&flour.id).await.unwrap();
        assert_eq!(loaded, flour);

        let raw = store.get(Ingredient::COLLECTION, &flour.id).await.unwrap().unwrap();
        assert_eq!(raw["quantity"], serde_json::json!("25"));
    }

    #[tokio::test]
    async fn test_require_reports_entity_name() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let repo = Repository::<Supplier>::new(store);
        let err = repo.require("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Supplier not found: nope");
    }
}
