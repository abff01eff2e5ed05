//! In-process [`BlobStore`] for tests and local experiments.

use super::{BlobStore, DeleteError, ObjectStat, ObjectStream, RemoteError, RemoteResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// Buckets and objects kept in memory.
///
/// Failures can be injected per object key for removals, and globally for
/// writes and stat calls, to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    buckets: Mutex<HashMap<String, HashMap<String, StoredObject>>>,
    failing_deletes: Mutex<HashSet<String>>,
    fail_writes: AtomicBool,
    fail_stats: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing, empty bucket.
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store.buckets().insert(bucket.to_string(), HashMap::new());
        store
    }

    /// Make every removal of `key` fail.
    pub fn fail_deletes_for(&self, key: &str) {
        self.failing_deletes().insert(key.to_string());
    }

    /// Make object writes fail until switched off again.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make stat calls fail until switched off again.
    pub fn fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets().contains_key(bucket)
    }

    /// Stored bytes (for test assertions)
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.clone())
    }

    /// Stored content type (for test assertions)
    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.buckets()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.content_type.clone())
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets().get(bucket).map_or(0, HashMap::len)
    }

    fn buckets(&self) -> MutexGuard<'_, HashMap<String, HashMap<String, StoredObject>>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn failing_deletes(&self) -> MutexGuard<'_, HashSet<String>> {
        self.failing_deletes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_one(&self, bucket: &str, key: &str) -> RemoteResult<()> {
        if self.failing_deletes().contains(key) {
            let message = format!("Access denied removing {}", key);
            return Err(RemoteError::Request(message));
        }
        let mut buckets = self.buckets();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| RemoteError::BucketNotFound(bucket.to_string()))?;
        objects.remove(key);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn endpoint(&self) -> &str {
        "memory://"
    }

    async fn bucket_exists(&self, bucket: &str) -> RemoteResult<bool> {
        Ok(self.has_bucket(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> RemoteResult<()> {
        self.buckets().entry(bucket.to_string()).or_default();
        Ok(())
    }

    async fn remove_bucket(&self, bucket: &str) -> RemoteResult<()> {
        let mut buckets = self.buckets();
        match buckets.get(bucket) {
            Some(objects) if !objects.is_empty() => Err(RemoteError::Request(format!(
                "Bucket {} is not empty",
                bucket
            ))),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
            None => Err(RemoteError::BucketNotFound(bucket.to_string())),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> RemoteResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Request(format!("Write of {} rejected", key)));
        }
        let mut buckets = self.buckets();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| RemoteError::BucketNotFound(bucket.to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> RemoteResult<ObjectStream> {
        let data = self.object(bucket, key).ok_or_else(|| RemoteError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        Ok(stream::once(async move { Ok(data) }).boxed())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> RemoteResult<ObjectStat> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(RemoteError::Request(format!("Stat of {} rejected", key)));
        }
        self.buckets()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| ObjectStat {
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
                e_tag: None,
            })
            .ok_or_else(|| RemoteError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> RemoteResult<()> {
        self.remove_one(bucket, key)
    }

    fn remove_objects<'a>(
        &'a self,
        bucket: &'a str,
        keys: Vec<String>,
    ) -> BoxStream<'a, DeleteError> {
        let failures: Vec<DeleteError> = keys
            .into_iter()
            .filter_map(|key| {
                self.remove_one(bucket, &key).err().map(|e| DeleteError {
                    object_name: Some(key),
                    message: e.to_string(),
                })
            })
            .collect();
        stream::iter(failures).boxed()
    }

    async fn presigned_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> RemoteResult<String> {
        Ok(format!(
            "memory://{}/{}?expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_requires_bucket() {
        let store = MemoryBlobStore::new();
        let err = store
            .put_object("files", "a.txt", Bytes::from_static(b"a"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::BucketNotFound(_)));

        store.make_bucket("files").await.unwrap();
        store
            .put_object("files", "a.txt", Bytes::from_static(b"a"), "text/plain")
            .await
            .unwrap();
        let content_type = store.content_type("files", "a.txt");
        assert_eq!(content_type.as_deref(), Some("text/plain"));
        assert_eq!(store.stat_object("files", "a.txt").await.unwrap().size, 1);
    }

    #[tokio::test]
    async fn remove_objects_reports_only_failures() {
        let store = MemoryBlobStore::with_bucket("files");
        for key in ["a", "b", "c"] {
            store
                .put_object("files", key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap();
        }
        store.fail_deletes_for("b");

        let failures: Vec<DeleteError> = store
            .remove_objects("files", vec!["a".into(), "b".into(), "c".into()])
            .collect()
            .await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].object_name.as_deref(), Some("b"));
        assert_eq!(store.object_count("files"), 1);
    }

    #[tokio::test]
    async fn remove_bucket_refuses_non_empty() {
        let store = MemoryBlobStore::with_bucket("files");
        store
            .put_object("files", "a", Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap();
        assert!(store.remove_bucket("files").await.is_err());
        store.remove_object("files", "a").await.unwrap();
        store.remove_bucket("files").await.unwrap();
        assert!(!store.bucket_exists("files").await.unwrap());
    }
}
