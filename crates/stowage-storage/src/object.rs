use crate::keys;
use crate::remote::{BlobStore, RemoteError};
use crate::traits::{require_extension, ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stowage_core::{BackendProperties, File, FileStorageType};

/// Bucket-based object store backend (MinIO and other S3-compatible services)
///
/// Objects are keyed `[{dir}/{bucket}/]{yyyy-MM}/{uuid}.{ext}` inside the
/// configured bucket; that key is also the record's `relative_path`.
#[derive(Clone)]
pub struct ObjectStorage {
    client: Arc<dyn BlobStore>,
    kind: FileStorageType,
    bucket: String,
    uri_prefix: String,
    inner_uri_prefix: Option<String>,
    presign_expiry: Duration,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("kind", &self.kind)
            .field("endpoint", &self.client.endpoint())
            .field("bucket", &self.bucket)
            .field("uri_prefix", &self.uri_prefix)
            .finish()
    }
}

impl ObjectStorage {
    /// Wrap a remote client for the given backend block.
    ///
    /// The public URL prefix is the block's own, else `global_uri_prefix`,
    /// else the client's endpoint.
    pub fn new(
        client: Arc<dyn BlobStore>,
        kind: FileStorageType,
        props: &BackendProperties,
        global_uri_prefix: Option<&str>,
        inner_uri_prefix: Option<&str>,
        presign_expiry: Duration,
    ) -> StorageResult<Self> {
        let bucket = props.bucket_name.trim().to_string();
        if bucket.is_empty() {
            return Err(StorageError::ConfigError(format!(
                "{} bucket name is empty",
                kind
            )));
        }

        let uri_prefix = props
            .uri_prefix
            .as_deref()
            .or(global_uri_prefix)
            .unwrap_or(client.endpoint())
            .to_string();

        tracing::info!(
            backend = %kind,
            endpoint = %client.endpoint(),
            bucket = %bucket,
            uri_prefix = %uri_prefix,
            "Object storage strategy initialised"
        );

        Ok(ObjectStorage {
            client,
            kind,
            bucket,
            uri_prefix,
            inner_uri_prefix: inner_uri_prefix.map(String::from),
            presign_expiry,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the configured bucket when it does not exist yet.
    async fn ensure_bucket(&self) -> StorageResult<()> {
        let exists = self
            .client
            .bucket_exists(&self.bucket)
            .await
            .map_err(|e| remote_error(StorageError::UploadFailed, e))?;
        if !exists {
            self.client
                .make_bucket(&self.bucket)
                .await
                .map_err(|e| remote_error(StorageError::UploadFailed, e))?;
            tracing::info!(bucket = %self.bucket, "Created missing bucket");
        }
        Ok(())
    }

    /// Create a bucket. Errors are logged and reported as `false`.
    pub async fn make_bucket(&self, bucket: &str) -> bool {
        match self.client.make_bucket(bucket).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, bucket = %bucket, "Failed to create bucket");
                false
            }
        }
    }

    /// Remove an empty bucket. Errors are logged and reported as `false`.
    pub async fn remove_bucket(&self, bucket: &str) -> bool {
        match self.client.remove_bucket(bucket).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, bucket = %bucket, "Failed to remove bucket");
                false
            }
        }
    }

    /// Remove all keys in one call and drain every reported failure.
    async fn remove_all(&self, names: Vec<String>) -> bool {
        let start = Instant::now();
        let requested = names.len();
        let mut failures = 0usize;

        let mut errors = self.client.remove_objects(&self.bucket, names);
        while let Some(err) = errors.next().await {
            failures += 1;
            tracing::error!(
                bucket = %self.bucket,
                object = err.object_name.as_deref().unwrap_or("<unknown>"),
                error = %err.message,
                "Object storage batch delete error"
            );
        }

        tracing::info!(
            bucket = %self.bucket,
            requested = requested,
            failures = failures,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object storage batch delete finished"
        );

        failures == 0
    }

    /// URL through the intranet prefix when configured, else [`Storage::resolve_url`].
    pub async fn resolve_inner_url(&self, name: &str) -> StorageResult<String> {
        require_extension(name)?;
        match self.inner_uri_prefix.as_deref() {
            Some(prefix) => Ok(self.public_url(prefix, name)),
            None => self.resolve_url(name).await,
        }
    }

    fn public_url(&self, prefix: &str, key: &str) -> String {
        keys::join_url(prefix, &keys::join_path([self.bucket.as_str(), key]))
    }
}

fn remote_error(wrap: fn(String) -> StorageError, err: RemoteError) -> StorageError {
    match err {
        RemoteError::NotFound { bucket, key } => {
            StorageError::NotFound(format!("{}/{}", bucket, key))
        }
        other => wrap(other.to_string()),
    }
}

#[async_trait]
impl Storage for ObjectStorage {
    fn backend_type(&self) -> FileStorageType {
        self.kind
    }

    async fn put(&self, file: &mut File, data: Bytes) -> StorageResult<()> {
        let start = Instant::now();
        self.ensure_bucket().await.inspect_err(|e| {
            tracing::error!(error = %e, bucket = %self.bucket, "Bucket check before upload failed");
        })?;

        let file_name = keys::generate_file_name(&file.ext);
        let month = file.month_bucket(chrono::Local::now().naive_local());
        let key = keys::object_key(&self.bucket, file.dir(), &month, &file_name);
        let size = data.len();

        self.client
            .put_object(&self.bucket, &key, data, &file.content_type)
            .await
            .map_err(|e| remote_error(StorageError::UploadFailed, e))
            .inspect_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    "Object storage upload failed"
                );
            })?;

        file.url = self.public_url(&self.uri_prefix, &key);
        file.file_name = file_name;
        file.relative_path = key;

        tracing::info!(
            bucket = %self.bucket,
            key = %file.relative_path,
            size_bytes = size,
            content_type = %file.content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object storage upload successful"
        );

        Ok(())
    }

    async fn get_stream(&self, name: &str) -> Option<ByteStream> {
        match self.client.get_object(&self.bucket, name).await {
            Ok(stream) => {
                let key = name.to_string();
                let stream = stream.map(move |chunk| {
                    chunk.map_err(|e| {
                        tracing::error!(error = %e, key = %key, "Object storage stream read error");
                        StorageError::DownloadFailed(e.to_string())
                    })
                });
                Some(Box::pin(stream))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %name,
                    "Failed to read file stream"
                );
                None
            }
        }
    }

    async fn exists(&self, name: &str) -> bool {
        match self.client.stat_object(&self.bucket, name).await {
            Ok(_) => true,
            Err(RemoteError::NotFound { .. }) => false,
            Err(e) => {
                tracing::debug!(error = %e, key = %name, "Existence check failed");
                false
            }
        }
    }

    async fn delete(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            tracing::error!("No file given for deletion");
            return false;
        }
        match self.client.remove_object(&self.bucket, name).await {
            Ok(()) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %name,
                    "Object storage delete successful"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %name,
                    "Object storage delete failed"
                );
                false
            }
        }
    }

    async fn delete_many(&self, names: &[String]) -> bool {
        if names.is_empty() {
            tracing::error!("No files given for batch deletion");
            return false;
        }
        self.remove_all(names.to_vec()).await
    }

    async fn delete_file(&self, file: &File) -> bool {
        self.delete(&file.relative_path).await
    }

    async fn delete_files(&self, files: &[File]) -> bool {
        if files.is_empty() {
            tracing::error!("No files given for batch deletion");
            return false;
        }
        self.remove_all(files.iter().map(|f| f.relative_path.clone()).collect())
            .await
    }

    /// Presigned GET URL valid for the configured expiry.
    async fn resolve_url(&self, name: &str) -> StorageResult<String> {
        require_extension(name)?;
        self.client
            .presigned_get(&self.bucket, name, self.presign_expiry)
            .await
            .map_err(|e| remote_error(StorageError::BackendError, e))
    }

    fn storage_key(&self, file: &File) -> String {
        file.relative_path.clone()
    }
}
