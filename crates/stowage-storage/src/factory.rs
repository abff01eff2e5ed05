use crate::local::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::object::ObjectStorage;
#[cfg(feature = "storage-s3")]
use crate::remote::S3BlobStore;
use crate::{FileStorage, StorageError, StorageResult};
#[cfg(feature = "storage-s3")]
use std::sync::Arc;
use stowage_core::{BackendProperties, Config, FileStorageType};

/// Create the storage strategy selected by configuration
pub async fn create_storage(config: &Config) -> StorageResult<FileStorage> {
    let kind = config.storage_type;

    match kind {
        FileStorageType::Local => {
            let props = required_properties(config, kind)?;
            let storage = LocalStorage::new(
                props,
                config.uri_prefix.as_deref(),
                config.inner_uri_prefix.as_deref(),
            )
            .await?;
            Ok(FileStorage::Local(storage))
        }

        #[cfg(feature = "storage-s3")]
        FileStorageType::Minio => {
            let props = required_properties(config, kind)?;
            let client = S3BlobStore::new(props)
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;
            let storage = ObjectStorage::new(
                Arc::new(client),
                kind,
                props,
                config.uri_prefix.as_deref(),
                config.inner_uri_prefix.as_deref(),
                config.presigned_url_expiry(),
            )?;
            Ok(FileStorage::Object(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        FileStorageType::Minio => Err(StorageError::ConfigError(
            "MinIO storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        FileStorageType::AliOss | FileStorageType::QiNiu | FileStorageType::Tencent => {
            tracing::warn!(
                storage_type = %kind,
                "Storage type has no backend; every operation will fail"
            );
            Ok(FileStorage::Unimplemented(kind))
        }
    }
}

fn required_properties(
    config: &Config,
    kind: FileStorageType,
) -> StorageResult<&BackendProperties> {
    config.backend_properties(kind).ok_or_else(|| {
        StorageError::ConfigError(format!(
            "{}_ENDPOINT not configured for the {} storage type",
            kind.env_prefix(),
            kind
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn local_is_selected_by_default() {
        let dir = tempdir().unwrap();
        let endpoint = dir.path().display().to_string();
        let config = config_from(&[
            ("FILE_LOCAL_ENDPOINT", endpoint.as_str()),
            ("FILE_LOCAL_BUCKET_NAME", "oss-file-service"),
        ]);

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), FileStorageType::Local);
        match storage {
            FileStorage::Local(local) => assert_eq!(local.bucket(), "oss-file-service"),
            other => panic!("expected local storage, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_block_is_a_config_error() {
        let config = config_from(&[("FILE_STORAGE_TYPE", "local")]);
        assert!(matches!(
            create_storage(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[cfg(feature = "storage-s3")]
    #[tokio::test]
    async fn minio_builds_object_storage() {
        let config = config_from(&[
            ("FILE_STORAGE_TYPE", "MINIO"),
            ("FILE_MINIO_ENDPOINT", "http://127.0.0.1:9000"),
            ("FILE_MINIO_ACCESS_KEY", "minioadmin"),
            ("FILE_MINIO_SECRET_KEY", "minioadmin"),
            ("FILE_MINIO_BUCKET_NAME", "files"),
        ]);

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), FileStorageType::Minio);
        assert_eq!(storage.as_object().map(|o| o.bucket()), Some("files"));
    }

    #[tokio::test]
    async fn other_vendors_are_unimplemented() {
        for value in ["ali_oss", "qi_niu", "TENCENT"] {
            let config = config_from(&[("FILE_STORAGE_TYPE", value)]);
            let storage = create_storage(&config).await.unwrap();
            assert!(matches!(storage, FileStorage::Unimplemented(_)));
        }
    }
}
