//! Storage abstraction trait
//!
//! This module defines the Storage trait that every storage backend implements.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use stowage_core::{File, FileStorageType};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Storage backend {0} is not implemented")]
    Unimplemented(FileStorageType),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazy, single-use stream over a stored file's bytes.
///
/// Dropping the stream releases the underlying file handle or connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// Each backend (local filesystem, S3-compatible object store) implements this
/// capability set. Callers normally go through [`crate::FileStorage`], which
/// builds the metadata record before handing it to [`Storage::put`].
///
/// Name-based operations take a storage key: the string returned by
/// [`Storage::storage_key`] for a stored record.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get the storage backend type
    fn backend_type(&self) -> FileStorageType;

    /// Persist `data` and fill `file_name`, `relative_path` and `url` into the
    /// record. The record is left untouched when the write fails.
    async fn put(&self, file: &mut File, data: Bytes) -> StorageResult<()>;

    /// Open a stored file as a byte stream.
    ///
    /// Never fails: a missing or unreadable file is logged and yields `None`.
    async fn get_stream(&self, name: &str) -> Option<ByteStream>;

    /// Check if a file exists. Any error counts as "does not exist".
    async fn exists(&self, name: &str) -> bool;

    /// Delete one file by storage key.
    async fn delete(&self, name: &str) -> bool;

    /// Delete several files by storage key. Empty input reports `false`.
    async fn delete_many(&self, names: &[String]) -> bool;

    /// Delete the bytes a record points to.
    async fn delete_file(&self, file: &File) -> bool;

    /// Delete the bytes of several records. Empty input reports `false`.
    async fn delete_files(&self, files: &[File]) -> bool;

    /// Access URL for a stored file. The name must carry an extension.
    async fn resolve_url(&self, name: &str) -> StorageResult<String>;

    /// Key under which this backend's name-based operations find the record.
    fn storage_key(&self, file: &File) -> String;
}

/// Reject names without an extension separator.
pub(crate) fn require_extension(name: &str) -> StorageResult<()> {
    if name.contains('.') {
        Ok(())
    } else {
        Err(StorageError::Validation(format!(
            "File name '{}' has no extension",
            name
        )))
    }
}
