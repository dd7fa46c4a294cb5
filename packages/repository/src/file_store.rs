//! JSON file store: one pretty-printed document per collection.
//!
//! Each collection lives at `<dir>/<collection>.json` as an object mapping
//! record ids to records. Writes go to a temporary file that is renamed
//! over the original.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use taxi_zones_codec::Record;
use tokio::sync::RwLock;

use crate::{RepositoryError, StoredRecord, ZoneStore};

type Collection = BTreeMap<String, Record>;

/// A [`ZoneStore`] backed by JSON files in a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    async fn read_collection(&self, collection: &str) -> Result<Collection, RepositoryError> {
        let path = self.collection_path(collection);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Ok(Collection::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Collection::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_collection(
        &self,
        collection: &str,
        records: &Collection,
    ) -> Result<(), RepositoryError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.collection_path(collection);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(records)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                log::warn!("Failed to remove {}: {cleanup}", tmp.display());
            }
            return Err(e.into());
        }

        log::debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ZoneStore for JsonFileStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredRecord>, RepositoryError> {
        let _guard = self.lock.read().await;
        Ok(self
            .read_collection(collection)
            .await?
            .into_iter()
            .map(|(id, record)| StoredRecord { id, record })
            .collect())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        record: Record,
    ) -> Result<(), RepositoryError> {
        let _guard = self.lock.write().await;
        let mut records = self.read_collection(collection).await?;
        records.insert(id.to_string(), record);
        self.write_collection(collection, &records).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepositoryError> {
        let _guard = self.lock.write().await;
        let mut records = self.read_collection(collection).await?;
        if records.remove(id).is_some() {
            self.write_collection(collection, &records).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("taxi-zones-{}", uuid::Uuid::new_v4()))
    }

    fn record(name: &str) -> Record {
        let mut record = Record::new();
        record.insert("name".to_string(), serde_json::Value::from(name));
        record
    }

    #[tokio::test]
    async fn missing_file_is_empty_collection() {
        let store = JsonFileStore::new(scratch_dir());
        assert!(store.fetch_all("zones").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_persist_across_instances() {
        let dir = scratch_dir();
        {
            let store = JsonFileStore::new(&dir);
            store.upsert("zones", "a", record("Airport")).await.unwrap();
            store.upsert("zones", "b", record("Harbour")).await.unwrap();
            store.delete("zones", "b").await.unwrap();
        }

        let store = JsonFileStore::new(&dir);
        let all = store.fetch_all("zones").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "a");
        assert_eq!(all[0].record, record("Airport"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = scratch_dir();
        // A non-empty directory at the target path blocks the rename.
        let blocker = dir.join("zones.json");
        std::fs::create_dir_all(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), "x").unwrap();

        let store = JsonFileStore::new(&dir);
        let result = store.write_collection("zones", &Collection::new()).await;

        assert!(matches!(result, Err(RepositoryError::Io(_))));
        assert!(!dir.join("zones.json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_a_json_error() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("zones.json"), "{ not json").unwrap();

        let store = JsonFileStore::new(&dir);
        assert!(matches!(
            store.fetch_all("zones").await,
            Err(RepositoryError::Json(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
