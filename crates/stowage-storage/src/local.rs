use crate::keys;
use crate::traits::{require_extension, ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use stowage_core::{BackendProperties, File, FileStorageType};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Files live under `{endpoint}/{bucket}/[{dir}/]{yyyy-MM}/{uuid}.{ext}`.
/// Name-based operations take keys relative to the endpoint.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    endpoint: String,
    bucket: String,
    uri_prefix: String,
    inner_uri_prefix: Option<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `props` - Local backend block; `endpoint` is the root directory
    /// * `global_uri_prefix` - Used when the block has no URI prefix of its own
    /// * `inner_uri_prefix` - Intranet prefix for [`LocalStorage::resolve_inner_url`]
    pub async fn new(
        props: &BackendProperties,
        global_uri_prefix: Option<&str>,
        inner_uri_prefix: Option<&str>,
    ) -> StorageResult<Self> {
        let endpoint = keys::join_path([props.endpoint.as_str()]);
        if endpoint.is_empty() {
            return Err(StorageError::ConfigError(
                "Local storage endpoint is empty".to_string(),
            ));
        }
        if props.bucket_name.trim().is_empty() {
            return Err(StorageError::ConfigError(
                "Local storage bucket name is empty".to_string(),
            ));
        }

        let base_path = PathBuf::from(&endpoint);
        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let uri_prefix = props
            .uri_prefix
            .as_deref()
            .or(global_uri_prefix)
            .unwrap_or(endpoint.as_str())
            .to_string();

        tracing::info!(
            endpoint = %endpoint,
            bucket = %props.bucket_name,
            uri_prefix = %uri_prefix,
            "Local storage strategy initialised"
        );

        Ok(LocalStorage {
            base_path,
            endpoint,
            bucket: props.bucket_name.trim().to_string(),
            uri_prefix,
            inner_uri_prefix: inner_uri_prefix.map(String::from),
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Keys must stay below the endpoint, including after symlinks are
    /// resolved for paths that already exist.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        keys::validate_key(storage_key)?;

        let path = self.base_path.join(storage_key.replace('\\', "/"));

        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
            })?;
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        self.ensure_parent_dir(path).await?;

        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Remove one file. A file that is already gone counts as removed.
    async fn remove(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage delete successful"
                );
                Ok(())
            }
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                tracing::debug!(key = %storage_key, "Local storage delete: file already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Delete keys in order, stopping at the first failure.
    async fn remove_all<'a>(&self, storage_keys: impl IntoIterator<Item = &'a str>) -> bool {
        for key in storage_keys {
            if let Err(e) = self.remove(key).await {
                tracing::error!(error = %e, key = %key, "Local storage batch delete aborted");
                return false;
            }
        }
        true
    }

    /// Access URL through the intranet prefix, when one is configured.
    pub fn resolve_inner_url(&self, name: &str) -> StorageResult<String> {
        require_extension(name)?;
        let prefix = self.inner_uri_prefix.as_deref().unwrap_or(&self.uri_prefix);
        Ok(keys::join_url(prefix, name))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn backend_type(&self) -> FileStorageType {
        FileStorageType::Local
    }

    async fn put(&self, file: &mut File, data: Bytes) -> StorageResult<()> {
        let start = Instant::now();
        let file_name = keys::generate_file_name(&file.ext);
        let month = file.month_bucket(chrono::Local::now().naive_local());
        let dir = file.dir().map(String::from);

        let relative_path =
            keys::local_relative_dir(&self.endpoint, &self.bucket, dir.as_deref(), &month);
        let key = keys::local_storage_key(&self.bucket, dir.as_deref(), &month, &file_name);
        let path = self.key_to_path(&key)?;

        self.write_file(&path, &data).await.inspect_err(|e| {
            tracing::error!(
                error = %e,
                path = %path.display(),
                size_bytes = data.len(),
                "Local storage upload failed"
            );
        })?;

        file.url = keys::join_url(&self.uri_prefix, &key);
        file.file_name = file_name;
        file.relative_path = relative_path;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn get_stream(&self, name: &str) -> Option<ByteStream> {
        let path = match self.key_to_path(name) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(error = %e, key = %name, "Failed to read file stream");
                return None;
            }
        };

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                let err = if e.kind() == ErrorKind::NotFound {
                    StorageError::NotFound(name.to_string())
                } else {
                    StorageError::DownloadFailed(format!(
                        "Failed to open file {}: {}",
                        path.display(),
                        e
                    ))
                };
                tracing::error!(error = %err, path = %path.display(), "Failed to read file stream");
                return None;
            }
        };

        // Opening a directory succeeds on some platforms.
        match file.metadata().await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                tracing::error!(path = %path.display(), "Failed to read file stream: not a file");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "Failed to read file stream");
                return None;
            }
        }

        let key = name.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(error = %e, key = %key, "Local storage stream read error");
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Some(Box::pin(stream))
    }

    async fn exists(&self, name: &str) -> bool {
        match self.key_to_path(name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(e) => {
                tracing::debug!(error = %e, key = %name, "Existence check on invalid key");
                false
            }
        }
    }

    async fn delete(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            tracing::error!("No file given for deletion");
            return false;
        }
        match self.remove(name).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, key = %name, "Local storage delete failed");
                false
            }
        }
    }

    async fn delete_many(&self, names: &[String]) -> bool {
        if names.is_empty() {
            tracing::error!("No files given for batch deletion");
            return false;
        }
        self.remove_all(names.iter().map(String::as_str)).await
    }

    async fn delete_file(&self, file: &File) -> bool {
        if file.file_name.is_empty() {
            tracing::error!("Record has no stored file name, nothing to delete");
            return false;
        }
        let key = self.storage_key(file);
        match self.remove(&key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    file_name = %file.file_name,
                    "Local storage delete failed"
                );
                false
            }
        }
    }

    async fn delete_files(&self, files: &[File]) -> bool {
        if files.is_empty() {
            tracing::error!("No files given for batch deletion");
            return false;
        }
        let keys: Vec<String> = files.iter().map(|f| self.storage_key(f)).collect();
        self.remove_all(keys.iter().map(String::as_str)).await
    }

    async fn resolve_url(&self, name: &str) -> StorageResult<String> {
        require_extension(name)?;
        Ok(keys::join_url(&self.uri_prefix, name))
    }

    /// `relative_path` minus the endpoint, plus the file name.
    ///
    /// Records whose directory is not below this endpoint fall back to the
    /// layout computed from bucket, dir and month.
    fn storage_key(&self, file: &File) -> String {
        let relative = file.relative_path.replace('\\', "/");
        let below_endpoint = relative.strip_prefix(self.endpoint.as_str()).filter(|rest| {
            rest.is_empty() || rest.starts_with('/') || self.endpoint.ends_with('/')
        });

        match below_endpoint {
            Some(rest) => keys::join_path([rest.trim_start_matches('/'), file.file_name.as_str()]),
            None => keys::local_storage_key(
                &self.bucket,
                file.dir(),
                &file.create_month,
                &file.file_name,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::build_file;
    use chrono::NaiveDate;
    use tempfile::{tempdir, TempDir};

    fn props(dir: &TempDir) -> BackendProperties {
        BackendProperties {
            uri_prefix: Some("http://localhost:8080/files/".to_string()),
            endpoint: dir.path().display().to_string(),
            access_key: None,
            secret_key: None,
            bucket_name: "oss-file-service".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    async fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(&props(dir), None, None).await.unwrap()
    }

    fn record(name: &str, dir: Option<&str>) -> File {
        let now = NaiveDate::from_ymd_opt(2024, 3, 8)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        build_file(5, "text/plain", name, dir, now).unwrap()
    }

    async fn read_all(storage: &LocalStorage, key: &str) -> Vec<u8> {
        let mut stream = storage.get_stream(key).await.expect("stream");
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_local_storage_put_and_stream() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let mut file = record("a.txt", None);

        storage
            .put(&mut file, Bytes::from_static(b"hello"))
            .await
            .unwrap();

        assert!(file.file_name.ends_with(".txt"));
        assert_eq!(
            file.relative_path,
            format!("{}/oss-file-service/2024-03", storage.endpoint())
        );
        let on_disk = Path::new(&file.relative_path).join(&file.file_name);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"hello");

        let key = storage.storage_key(&file);
        assert_eq!(key, format!("oss-file-service/2024-03/{}", file.file_name));
        assert_eq!(
            file.url,
            format!("http://localhost:8080/files/{}", key)
        );
        assert_eq!(read_all(&storage, &key).await, b"hello");
    }

    #[tokio::test]
    async fn test_local_storage_put_with_dir() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let mut file = record("photo.png", Some("avatars"));

        storage
            .put(&mut file, Bytes::from_static(b"png"))
            .await
            .unwrap();

        let dir_suffix = "/oss-file-service/avatars/2024-03";
        assert!(file.relative_path.ends_with(dir_suffix));
        let key = storage.storage_key(&file);
        assert!(key.starts_with("oss-file-service/avatars/2024-03/"));
        assert!(storage.exists(&key).await);
    }

    #[tokio::test]
    async fn test_generated_names_are_unique() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let mut first = record("a.txt", None);
        let mut second = record("a.txt", None);

        storage
            .put(&mut first, Bytes::from_static(b"1"))
            .await
            .unwrap();
        storage
            .put(&mut second, Bytes::from_static(b"2"))
            .await
            .unwrap();

        assert_ne!(first.file_name, second.file_name);
        let first_key = storage.storage_key(&first);
        let second_key = storage.storage_key(&second);
        assert_eq!(read_all(&storage, &first_key).await, b"1");
        assert_eq!(read_all(&storage, &second_key).await, b"2");
    }

    #[tokio::test]
    async fn test_failed_put_leaves_record_untouched() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        // A regular file where the bucket directory should be.
        let blocker = dir.path().join("oss-file-service");
        std::fs::write(&blocker, b"blocker").unwrap();
        let mut file = record("a.txt", None);

        let err = storage
            .put(&mut file, Bytes::from_static(b"hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::UploadFailed(_)));
        assert!(file.file_name.is_empty());
        assert!(file.relative_path.is_empty());
        assert!(file.url.is_empty());
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        assert!(storage.delete("nonexistent/file.txt").await);

        let mut ghost = record("ghost.txt", None);
        assert!(!storage.delete_file(&ghost).await);
        ghost.file_name = "0b1e6a56-0000-4000-8000-000000000000.txt".to_string();
        assert!(storage.delete_file(&ghost).await);
    }

    #[tokio::test]
    async fn test_delete_twice_is_quiet() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let mut file = record("a.txt", None);
        storage
            .put(&mut file, Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(storage.delete_file(&file).await);
        assert!(!storage.exists(&storage.storage_key(&file)).await);
        assert!(storage.delete_file(&file).await);
    }

    #[tokio::test]
    async fn test_empty_delete_requests_fail() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        assert!(!storage.delete("").await);
        assert!(!storage.delete_many(&[]).await);
        assert!(!storage.delete_files(&[]).await);
    }

    #[tokio::test]
    async fn test_batch_delete_stops_at_first_error() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let mut first = record("a.txt", None);
        let mut last = record("b.txt", None);
        storage
            .put(&mut first, Bytes::from_static(b"a"))
            .await
            .unwrap();
        storage
            .put(&mut last, Bytes::from_static(b"b"))
            .await
            .unwrap();

        // Removing a directory with remove_file fails.
        let blocked = dir.path().join("oss-file-service/blocked.txt");
        std::fs::create_dir_all(&blocked).unwrap();

        let names = vec![
            storage.storage_key(&first),
            "oss-file-service/blocked.txt".to_string(),
            storage.storage_key(&last),
        ];
        assert!(!storage.delete_many(&names).await);

        assert!(!storage.exists(&names[0]).await);
        assert!(storage.exists(&names[2]).await);
    }

    #[tokio::test]
    async fn test_batch_delete_of_records() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let mut files = vec![record("a.txt", None), record("b.txt", Some("docs"))];
        for file in files.iter_mut() {
            storage
                .put(file, Bytes::from_static(b"data"))
                .await
                .unwrap();
        }

        assert!(storage.delete_files(&files).await);
        for file in &files {
            assert!(!storage.exists(&storage.storage_key(file)).await);
        }
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        assert!(storage.get_stream("../../../etc/passwd").await.is_none());
        assert!(!storage.delete("../etc/passwd").await);
        assert!(!storage.exists("/etc/passwd").await);
    }

    #[tokio::test]
    async fn test_missing_file_stream_is_absent() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let missing = "oss-file-service/none.txt";
        assert!(storage.get_stream(missing).await.is_none());
        assert!(!storage.exists(missing).await);
    }

    #[tokio::test]
    async fn test_directory_stream_is_absent() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let mut file = record("a.txt", None);
        storage
            .put(&mut file, Bytes::from_static(b"x"))
            .await
            .unwrap();

        let month_dir = format!("oss-file-service/{}", file.create_month);
        assert!(storage.get_stream("oss-file-service").await.is_none());
        assert!(storage.get_stream(&month_dir).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_below_a_file_is_quiet() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let mut file = record("a.txt", None);
        storage
            .put(&mut file, Bytes::from_static(b"x"))
            .await
            .unwrap();

        let child = format!("{}/child.txt", storage.storage_key(&file));
        assert!(storage.delete(&child).await);
        assert!(storage.exists(&storage.storage_key(&file)).await);
    }

    #[tokio::test]
    async fn test_resolve_url() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        assert_eq!(
            storage.resolve_url("a/b.png").await.unwrap(),
            "http://localhost:8080/files/a/b.png"
        );
        assert!(matches!(
            storage.resolve_url("noext").await,
            Err(StorageError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_uri_prefix_fallbacks() {
        let dir = tempdir().unwrap();
        let mut props = props(&dir);
        props.uri_prefix = None;

        let global = LocalStorage::new(&props, Some("http://cdn.example.com"), None)
            .await
            .unwrap();
        assert_eq!(
            global.resolve_url("x.png").await.unwrap(),
            "http://cdn.example.com/x.png"
        );

        let raw = LocalStorage::new(&props, None, Some("http://10.0.0.5/files"))
            .await
            .unwrap();
        assert_eq!(
            raw.resolve_url("x.png").await.unwrap(),
            format!("{}/x.png", raw.endpoint())
        );
        assert_eq!(
            raw.resolve_inner_url("x.png").unwrap(),
            "http://10.0.0.5/files/x.png"
        );
    }

    #[tokio::test]
    async fn test_storage_key_falls_back_for_foreign_records() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let mut file = record("a.txt", Some("docs"));
        file.file_name = "f.txt".to_string();
        file.relative_path = "/somewhere/else/2024-03".to_string();

        assert_eq!(
            storage.storage_key(&file),
            "oss-file-service/docs/2024-03/f.txt"
        );
    }
}
