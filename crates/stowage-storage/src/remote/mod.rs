//! Client seam for bucket-based remote object stores.
//!
//! [`crate::ObjectStorage`] only talks to a store through [`BlobStore`], so
//! the same upload/delete/sign logic runs against MinIO or any other
//! S3-compatible service, and against [`MemoryBlobStore`] in tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;

pub use memory::MemoryBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;

/// Errors reported by a remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("Bucket {0} not found")]
    BucketNotFound(String),

    #[error("Remote request failed: {0}")]
    Request(String),

    #[error("Invalid remote store configuration: {0}")]
    Config(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// One object the store failed to remove during a batch removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteError {
    /// Not every store reports which object failed.
    pub object_name: Option<String>,
    pub message: String,
}

/// Object metadata returned by a stat call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub e_tag: Option<String>,
}

/// Stream of an object's content.
pub type ObjectStream = BoxStream<'static, RemoteResult<Bytes>>;

/// Operations a remote object store must provide.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Server address, used as the fallback public URL prefix.
    fn endpoint(&self) -> &str;

    async fn bucket_exists(&self, bucket: &str) -> RemoteResult<bool>;

    async fn make_bucket(&self, bucket: &str) -> RemoteResult<()>;

    async fn remove_bucket(&self, bucket: &str) -> RemoteResult<()>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> RemoteResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> RemoteResult<ObjectStream>;

    async fn stat_object(&self, bucket: &str, key: &str) -> RemoteResult<ObjectStat>;

    async fn remove_object(&self, bucket: &str, key: &str) -> RemoteResult<()>;

    /// Remove several objects in one call.
    ///
    /// The returned stream yields only the failures; an empty stream means
    /// every object was removed. Callers must drain it to learn the outcome.
    fn remove_objects<'a>(
        &'a self,
        bucket: &'a str,
        keys: Vec<String>,
    ) -> BoxStream<'a, DeleteError>;

    /// Time-limited GET URL for an object.
    async fn presigned_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> RemoteResult<String>;
}
