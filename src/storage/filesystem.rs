//! Local filesystem object store
//!
//! Each zone is a directory under a common root and object keys map onto
//! relative paths. Writes land in a hidden temporary file next to the target
//! and are renamed into place, so readers never observe a partial object.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{ObjectMeta, ObjectStore, StorageError, StorageResult, validate_key};

/// Marker for in-flight writes; such files are never listed
const TEMP_SUFFIX: &str = ".inflight";

/// Object store rooted at `<root>/<zone>`
#[derive(Debug, Clone)]
pub struct LocalStore {
    zone: String,
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>, zone: impl Into<String>) -> Self {
        let zone = zone.into();
        Self {
            dir: root.as_ref().join(&zone),
            zone,
        }
    }

    /// Directory backing this zone
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.dir.clone(), |p, s| p.join(s)))
    }

    fn list_blocking(dir: &Path, prefix: &str) -> StorageResult<Vec<ObjectMeta>> {
        let pattern = format!("{}/**/*", glob::Pattern::escape(&dir.display().to_string()));
        let entries = glob::glob(&pattern)
            .map_err(|e| StorageError::Io(format!("{}: {}", pattern, e)))?;

        let mut objects = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("Error accessing path: {}", e);
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !key.starts_with(prefix) || is_temp_file(&key) {
                continue;
            }

            let metadata = std::fs::metadata(&path).map_err(|e| StorageError::Io(e.to_string()))?;
            objects.push(ObjectMeta {
                key,
                size: metadata.len(),
                last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

fn is_temp_file(key: &str) -> bool {
    key.rsplit('/')
        .next()
        .map(|name| name.starts_with('.') && name.ends_with(TEMP_SUFFIX))
        .unwrap_or(false)
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn zone(&self) -> &str {
        &self.zone
    }

    fn uri(&self, key: &str) -> String {
        let dir = std::path::absolute(&self.dir).unwrap_or_else(|_| self.dir.clone());
        format!("file://{}/{}", dir.display(), key)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>> {
        if !self.exists().await? {
            return Err(StorageError::ZoneNotFound(self.zone.clone()));
        }

        let dir = self.dir.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || Self::list_blocking(&dir, &prefix))
            .await
            .map_err(|e| StorageError::Io(format!("listing task failed: {}", e)))?
    }

    async fn read(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn write(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if !self.exists().await? {
            return Err(StorageError::ZoneNotFound(self.zone.clone()));
        }

        let path = self.path_for(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?
            .to_string_lossy()
            .into_owned();

        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;

        let temp = parent.join(format!(
            ".{}.{}{}",
            file_name,
            uuid::Uuid::new_v4().simple(),
            TEMP_SUFFIX
        ));
        if let Err(e) = tokio::fs::write(&temp, &data).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error(&temp, e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error(&path, e));
        }

        Ok(())
    }

    async fn exists(&self) -> StorageResult<bool> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&self.dir, e)),
        }
    }

    async fn create(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path(), "acme-raw");
        store.create().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_read_nested_key() {
        let (_dir, store) = store().await;
        store
            .write("orders/2025-01-01/orders.csv", Bytes::from_static(b"a,b\n1,2\n"))
            .await
            .unwrap();

        let data = store.read("orders/2025-01-01/orders.csv").await.unwrap();
        assert_eq!(data, Bytes::from_static(b"a,b\n1,2\n"));
        assert!(store.dir().join("orders/2025-01-01/orders.csv").is_file());
    }

    #[tokio::test]
    async fn test_list_skips_other_prefixes_and_temp_files() {
        let (_dir, store) = store().await;
        store
            .write("orders/2025-01-02/orders.csv", Bytes::from_static(b"x"))
            .await
            .unwrap();
        store
            .write("orders/2025-01-01/orders.csv", Bytes::from_static(b"xy"))
            .await
            .unwrap();
        store
            .write("stores/ref_data/stores.csv", Bytes::from_static(b"z"))
            .await
            .unwrap();
        std::fs::write(
            store.dir().join("orders/2025-01-01/.orders.csv.abc.inflight"),
            b"partial",
        )
        .unwrap();

        let listed = store.list("orders/").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["orders/2025-01-01/orders.csv", "orders/2025-01-02/orders.csv"]
        );
        assert_eq!(listed[0].size, 2);
    }

    #[tokio::test]
    async fn test_overwrite_leaves_single_object() {
        let (_dir, store) = store().await;
        store
            .write("products/ref_data/products.parquet", Bytes::from_static(b"v1"))
            .await
            .unwrap();
        store
            .write("products/ref_data/products.parquet", Bytes::from_static(b"v2"))
            .await
            .unwrap();

        let listed = store.list("products/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            store.read("products/ref_data/products.parquet").await.unwrap(),
            Bytes::from_static(b"v2")
        );
    }

    #[tokio::test]
    async fn test_missing_zone() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path(), "absent");
        assert!(!store.exists().await.unwrap());
        assert!(matches!(
            store.list("").await,
            Err(StorageError::ZoneNotFound(_))
        ));
        assert!(matches!(
            store.read("a/b.csv").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let (_dir, store) = store().await;
        assert!(matches!(
            store.write("../outside.csv", Bytes::new()).await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
