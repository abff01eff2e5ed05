//! Backend selection and the uniform upload/delete/url API.

use crate::local::LocalStorage;
use crate::metadata::build_file;
use crate::object::ObjectStorage;
use crate::traits::{require_extension, ByteStream, Storage, StorageError, StorageResult};
use bytes::Bytes;
use stowage_core::{File, FileStorageType};

/// The storage strategy chosen at startup.
///
/// Built once by [`crate::create_storage`] and never switched afterwards.
/// Share it behind an `Arc` when several tasks need it.
#[derive(Debug, Clone)]
pub enum FileStorage {
    Local(LocalStorage),
    Object(ObjectStorage),
    /// A recognised storage type without a backend. Every operation reports
    /// [`StorageError::Unimplemented`].
    Unimplemented(FileStorageType),
}

impl FileStorage {
    pub fn backend_type(&self) -> FileStorageType {
        match self {
            FileStorage::Local(storage) => storage.backend_type(),
            FileStorage::Object(storage) => storage.backend_type(),
            FileStorage::Unimplemented(kind) => *kind,
        }
    }

    /// The active backend behind the [`Storage`] capability set.
    pub fn backend(&self) -> StorageResult<&dyn Storage> {
        match self {
            FileStorage::Local(storage) => Ok(storage),
            FileStorage::Object(storage) => Ok(storage),
            FileStorage::Unimplemented(kind) => Err(StorageError::Unimplemented(*kind)),
        }
    }

    /// Object-store backend, for bucket administration.
    pub fn as_object(&self) -> Option<&ObjectStorage> {
        match self {
            FileStorage::Object(storage) => Some(storage),
            _ => None,
        }
    }

    /// Store an upload at the bucket root and return its record.
    pub async fn upload(
        &self,
        data: impl Into<Bytes>,
        original_name: &str,
        content_type: &str,
    ) -> StorageResult<File> {
        self.upload_to(data, original_name, content_type, None)
            .await
    }

    /// Store an upload under a logical directory and return its record.
    ///
    /// The record is validated before the backend is touched, so a bad name
    /// never reaches the disk or the network.
    pub async fn upload_to(
        &self,
        data: impl Into<Bytes>,
        original_name: &str,
        content_type: &str,
        dir: Option<&str>,
    ) -> StorageResult<File> {
        let data = data.into();
        let mut file = build_file(
            data.len() as u64,
            content_type,
            original_name,
            dir,
            chrono::Local::now().naive_local(),
        )?;

        self.backend()?.put(&mut file, data).await?;
        Ok(file)
    }

    pub async fn delete(&self, name: &str) -> StorageResult<bool> {
        Ok(self.backend()?.delete(name).await)
    }

    pub async fn delete_many(&self, names: &[String]) -> StorageResult<bool> {
        Ok(self.backend()?.delete_many(names).await)
    }

    pub async fn delete_file(&self, file: &File) -> StorageResult<bool> {
        Ok(self.backend()?.delete_file(file).await)
    }

    pub async fn delete_files(&self, files: &[File]) -> StorageResult<bool> {
        Ok(self.backend()?.delete_files(files).await)
    }

    pub async fn resolve_url(&self, name: &str) -> StorageResult<String> {
        require_extension(name)?;
        self.backend()?.resolve_url(name).await
    }

    /// URL through the intranet prefix, when the deployment has one.
    pub async fn resolve_inner_url(&self, name: &str) -> StorageResult<String> {
        require_extension(name)?;
        match self {
            FileStorage::Local(storage) => storage.resolve_inner_url(name),
            FileStorage::Object(storage) => storage.resolve_inner_url(name).await,
            FileStorage::Unimplemented(kind) => Err(StorageError::Unimplemented(*kind)),
        }
    }

    /// `Ok(None)` when the file is missing or unreadable.
    pub async fn get_stream(&self, name: &str) -> StorageResult<Option<ByteStream>> {
        Ok(self.backend()?.get_stream(name).await)
    }

    /// Never fails; unimplemented backends report `false`.
    pub async fn exists(&self, name: &str) -> bool {
        match self.backend() {
            Ok(backend) => backend.exists(name).await,
            Err(e) => {
                tracing::error!(error = %e, key = %name, "Existence check unavailable");
                false
            }
        }
    }

    pub fn storage_key(&self, file: &File) -> StorageResult<String> {
        Ok(self.backend()?.storage_key(file))
    }
}
