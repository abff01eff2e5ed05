//! Stowage Storage Library
//!
//! Pluggable file storage: a [`Storage`] trait with a local filesystem backend
//! and a bucket-based object store backend, plus the [`FileStorage`] strategy
//! that builds metadata records and dispatches to the configured backend.
//!
//! # Storage layout
//!
//! - **Local**: `{endpoint}/{bucket}/[{dir}/]{yyyy-MM}/{uuid}.{ext}`
//! - **Object store**: `[{dir}/{bucket}/]{yyyy-MM}/{uuid}.{ext}` inside the bucket
//!
//! Name-based operations take the key returned by [`FileStorage::storage_key`].
//! Keys must not contain `..` or a leading `/`. Layout rules live in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod metadata;
pub mod object;
pub mod remote;
pub mod strategy;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use metadata::build_file;
pub use object::ObjectStorage;
pub use remote::{BlobStore, MemoryBlobStore};
#[cfg(feature = "storage-s3")]
pub use remote::S3BlobStore;
pub use stowage_core::FileStorageType;
pub use strategy::FileStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
