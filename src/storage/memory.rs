//! In-memory object store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ObjectMeta, ObjectStore, StorageError, StorageResult, validate_key};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// Object store kept in a process-local map
#[derive(Debug)]
pub struct MemoryStore {
    zone: String,
    created: AtomicBool,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    /// An existing, empty zone
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            created: AtomicBool::new(true),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// A zone that has not been created yet
    pub fn missing(zone: impl Into<String>) -> Self {
        let store = Self::new(zone);
        store.created.store(false, Ordering::SeqCst);
        store
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// All keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    fn ensure_created(&self) -> StorageResult<()> {
        if self.created.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::ZoneNotFound(self.zone.clone()))
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn zone(&self) -> &str {
        &self.zone
    }

    fn uri(&self, key: &str) -> String {
        format!("memory://{}/{}", self.zone, key)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>> {
        self.ensure_created()?;
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectMeta {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .collect())
    }

    async fn read(&self, key: &str) -> StorageResult<Bytes> {
        self.ensure_created()?;
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.ensure_created()?;
        validate_key(key)?;
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn exists(&self) -> StorageResult<bool> {
        Ok(self.created.load(Ordering::SeqCst))
    }

    async fn create(&self) -> StorageResult<()> {
        self.created.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_replaces_existing() {
        let store = MemoryStore::new("processed");
        store
            .write("orders/a.parquet", Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .write("orders/a.parquet", Bytes::from_static(b"second"))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.read("orders/a.parquet").await.unwrap(),
            Bytes::from_static(b"second")
        );
    }

    #[tokio::test]
    async fn test_list_by_prefix_sorted() {
        let store = MemoryStore::new("raw");
        for key in ["orders/b.csv", "products/p.csv", "orders/a.csv", "ordersx/c.csv"] {
            store.write(key, Bytes::from_static(b"x")).await.unwrap();
        }

        let keys: Vec<_> = store
            .list("orders/")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["orders/a.csv", "orders/b.csv"]);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let store = MemoryStore::new("raw");
        assert_eq!(
            store.read("nope.csv").await.unwrap_err(),
            StorageError::NotFound("nope.csv".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_zone() {
        let store = MemoryStore::missing("raw");
        assert!(!store.exists().await.unwrap());
        assert!(matches!(
            store.list("").await,
            Err(StorageError::ZoneNotFound(_))
        ));

        store.create().await.unwrap();
        assert!(store.exists().await.unwrap());
        assert!(store.list("").await.unwrap().is_empty());
    }
}
