//! Configuration module
//!
//! Storage settings are read once at startup, either from the process
//! environment (with `.env` support) or from any key lookup function, and are
//! immutable afterwards.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::storage_types::FileStorageType;

const PRESIGNED_URL_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_REGION: &str = "us-east-1";

/// Settings block for one storage backend.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendProperties {
    /// Public URI prefix for this backend. Overrides the global prefix.
    pub uri_prefix: Option<String>,
    /// Root directory for the local backend, server URL for object stores.
    pub endpoint: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Bucket, or project directory name for the local backend.
    pub bucket_name: String,
    pub region: String,
}

impl BackendProperties {
    /// Read the `{prefix}_*` block. Returns `None` when no endpoint is set.
    fn from_lookup<F>(prefix: &str, lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| non_blank(lookup(&format!("{}_{}", prefix, suffix)));

        let endpoint = get("ENDPOINT")?;
        Some(BackendProperties {
            uri_prefix: get("URI_PREFIX"),
            endpoint,
            access_key: get("ACCESS_KEY"),
            secret_key: get("SECRET_KEY"),
            bucket_name: get("BUCKET_NAME").unwrap_or_default(),
            region: get("REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

impl fmt::Debug for BackendProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendProperties")
            .field("uri_prefix", &self.uri_prefix)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .finish()
    }
}

/// File server configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub storage_type: FileStorageType,
    /// Global public URI prefix.
    pub uri_prefix: Option<String>,
    /// Intranet URI prefix, for hosts that cannot reach the public address.
    pub inner_uri_prefix: Option<String>,
    /// Scratch directory for chunked uploads.
    pub storage_path: Option<String>,
    pub presigned_url_expiry_secs: u64,
    pub local: Option<BackendProperties>,
    pub ali: Option<BackendProperties>,
    pub minio: Option<BackendProperties>,
    pub qiniu: Option<BackendProperties>,
    pub tencent: Option<BackendProperties>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_type = match non_blank(lookup("FILE_STORAGE_TYPE")) {
            Some(value) => value.parse()?,
            None => FileStorageType::default(),
        };

        let presigned_url_expiry_secs = match non_blank(lookup("FILE_PRESIGNED_URL_EXPIRY_SECS")) {
            Some(value) => value.parse().map_err(|_| {
                anyhow::anyhow!("FILE_PRESIGNED_URL_EXPIRY_SECS must be a valid number")
            })?,
            None => PRESIGNED_URL_EXPIRY_SECS,
        };

        let block =
            |kind: FileStorageType| BackendProperties::from_lookup(kind.env_prefix(), &lookup);

        Ok(Config {
            storage_type,
            uri_prefix: non_blank(lookup("FILE_URI_PREFIX")),
            inner_uri_prefix: non_blank(lookup("FILE_INNER_URI_PREFIX")),
            storage_path: non_blank(lookup("FILE_STORAGE_PATH")),
            presigned_url_expiry_secs,
            local: block(FileStorageType::Local),
            ali: block(FileStorageType::AliOss),
            minio: block(FileStorageType::Minio),
            qiniu: block(FileStorageType::QiNiu),
            tencent: block(FileStorageType::Tencent),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let prefix = self.storage_type.env_prefix();
        let props = self.active_properties().ok_or_else(|| {
            anyhow::anyhow!(
                "{}_ENDPOINT must be set when using the {} storage type",
                prefix,
                self.storage_type
            )
        })?;

        if props.bucket_name.is_empty() {
            return Err(anyhow::anyhow!(
                "{}_BUCKET_NAME must be set when using the {} storage type",
                prefix,
                self.storage_type
            ));
        }

        if self.storage_type.is_object_store()
            && (props.access_key.is_none() || props.secret_key.is_none())
        {
            return Err(anyhow::anyhow!(
                "{}_ACCESS_KEY and {}_SECRET_KEY must be set when using the {} storage type",
                prefix,
                prefix,
                self.storage_type
            ));
        }

        if self.presigned_url_expiry_secs == 0 {
            return Err(anyhow::anyhow!(
                "FILE_PRESIGNED_URL_EXPIRY_SECS must be greater than zero"
            ));
        }

        Ok(())
    }

    pub fn backend_properties(&self, kind: FileStorageType) -> Option<&BackendProperties> {
        match kind {
            FileStorageType::Local => self.local.as_ref(),
            FileStorageType::AliOss => self.ali.as_ref(),
            FileStorageType::Minio => self.minio.as_ref(),
            FileStorageType::QiNiu => self.qiniu.as_ref(),
            FileStorageType::Tencent => self.tencent.as_ref(),
        }
    }

    /// Settings of the selected storage type.
    pub fn active_properties(&self) -> Option<&BackendProperties> {
        self.backend_properties(self.storage_type)
    }

    pub fn presigned_url_expiry(&self) -> Duration {
        Duration::from_secs(self.presigned_url_expiry_secs)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
