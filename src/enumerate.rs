//! Object source enumeration
//!
//! Lists the raw zone under a dataset prefix and yields the objects carrying
//! the recognized input suffix. Anything else under the prefix is skipped and
//! counted. Each call to [`SourceEnumerator::list`] reflects current storage
//! state, so listing again is always safe.

use std::sync::Arc;
use std::vec::IntoIter;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::PathMapper;
use crate::storage::{ObjectMeta, ObjectStore, StorageResult};

/// Handle to one raw object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    /// When this listing saw the object
    pub discovered_at: DateTime<Utc>,
}

/// Enumerates recognized raw inputs in one zone
#[derive(Clone)]
pub struct SourceEnumerator {
    store: Arc<dyn ObjectStore>,
    mapper: PathMapper,
}

impl SourceEnumerator {
    pub fn new(store: Arc<dyn ObjectStore>, mapper: PathMapper) -> Self {
        Self { store, mapper }
    }

    /// Store being enumerated
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// List a prefix. Fails only if the storage listing itself fails.
    pub async fn list(&self, prefix: &str) -> StorageResult<SourceListing> {
        let entries = self.store.list(prefix).await?;
        tracing::debug!(zone = self.store.zone(), prefix, entries = entries.len(), "Listed prefix");

        Ok(SourceListing {
            entries: entries.into_iter(),
            mapper: self.mapper.clone(),
            discovered_at: Utc::now(),
            matched: 0,
            skipped: 0,
        })
    }

    /// Fetch the bytes of a listed object
    pub async fn read(&self, object: &SourceObject) -> StorageResult<Bytes> {
        self.store.read(&object.key).await
    }
}

/// Result of one listing, consumed lazily in key order
#[derive(Debug)]
pub struct SourceListing {
    entries: IntoIter<ObjectMeta>,
    mapper: PathMapper,
    discovered_at: DateTime<Utc>,
    matched: usize,
    skipped: usize,
}

impl SourceListing {
    /// Recognized objects yielded so far
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Non-matching objects passed over so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Drain the listing, returning every recognized object
    pub fn collect_all(&mut self) -> Vec<SourceObject> {
        self.by_ref().collect()
    }
}

impl Iterator for SourceListing {
    type Item = SourceObject;

    fn next(&mut self) -> Option<SourceObject> {
        for meta in self.entries.by_ref() {
            if !self.mapper.accepts(&meta.key) {
                tracing::debug!(key = %meta.key, "Skipping unrecognized object");
                self.skipped += 1;
                continue;
            }
            self.matched += 1;
            return Some(SourceObject {
                key: meta.key,
                size: meta.size,
                last_modified: meta.last_modified,
                discovered_at: self.discovered_at,
            });
        }
        None
    }
}
