//! Document store port and the in-memory adapter.

use std::collections::{BTreeMap, HashMap};

use taxi_zones_codec::Record;
use tokio::sync::RwLock;

use crate::RepositoryError;

/// A stored record with its document id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub record: Record,
}

/// A document store holding zone records keyed by id within named
/// collections.
///
/// Implementations must make `upsert` replace the whole record and make
/// `delete` succeed when the id is absent.
#[async_trait::async_trait]
pub trait ZoneStore: Send + Sync {
    /// Returns every record in the collection.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredRecord>, RepositoryError>;

    /// Inserts or fully replaces one record.
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        record: Record,
    ) -> Result<(), RepositoryError>;

    /// Removes one record. Missing ids are not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepositoryError>;

    /// Returns one record, if present.
    async fn fetch(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredRecord>, RepositoryError> {
        Ok(self
            .fetch_all(collection)
            .await?
            .into_iter()
            .find(|stored| stored.id == id))
    }
}

/// Process-local store, used for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Record>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with raw records.
    #[must_use]
    pub fn with_records(
        collection: &str,
        records: impl IntoIterator<Item = (String, Record)>,
    ) -> Self {
        let mut collections = HashMap::new();
        collections.insert(collection.to_string(), records.into_iter().collect());
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Number of records in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait::async_trait]
impl ZoneStore for MemoryStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredRecord>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(id, record)| StoredRecord {
                        id: id.clone(),
                        record: record.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        record: Record,
    ) -> Result<(), RepositoryError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), record);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepositoryError> {
        if let Some(records) = self.collections.write().await.get_mut(collection) {
            records.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> Record {
        let mut record = Record::new();
        record.insert("name".to_string(), serde_json::Value::from(name));
        record
    }

    #[tokio::test]
    async fn upsert_replaces_whole_record() {
        let store = MemoryStore::new();
        store.upsert("zones", "a", record("first")).await.unwrap();
        store.upsert("zones", "a", Record::new()).await.unwrap();

        let all = store.fetch_all("zones").await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].record.is_empty());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = MemoryStore::new();
        store.upsert("zones", "a", record("a")).await.unwrap();

        assert!(store.fetch_all("other").await.unwrap().is_empty());
        assert_eq!(store.len("zones").await, 1);
    }

    #[tokio::test]
    async fn delete_missing_is_ok() {
        let store = MemoryStore::new();
        store.delete("zones", "nope").await.unwrap();
        store.upsert("zones", "a", record("a")).await.unwrap();
        store.delete("zones", "a").await.unwrap();
        store.delete("zones", "a").await.unwrap();
        assert_eq!(store.len("zones").await, 0);
    }

    #[tokio::test]
    async fn fetch_finds_by_id() {
        let store = MemoryStore::with_records(
            "zones",
            [("a".to_string(), record("a")), ("b".to_string(), record("b"))],
        );
        let found = store.fetch("zones", "b").await.unwrap().unwrap();
        assert_eq!(found.record, record("b"));
        assert!(store.fetch("zones", "c").await.unwrap().is_none());
    }
}
