//! Shared naming and path layout for storage backends.
//!
//! - Generated file names: `{uuid}.{ext}`
//! - Local directory: `{endpoint}/{bucket}/[{dir}/]{yyyy-MM}`
//! - Local storage key (relative to the endpoint): `{bucket}/[{dir}/]{yyyy-MM}/{file}`
//! - Object key: `[{dir}/{bucket}/]{yyyy-MM}/{file}`
//!
//! Every path produced here uses `/` as separator, whatever the host platform.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

/// Fresh collision-free file name keeping the original extension.
pub fn generate_file_name(ext: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), ext)
}

/// Join path segments with single forward slashes.
///
/// Backslashes are normalised to `/` and empty segments are skipped. A leading
/// `/` on the first segment is kept so absolute roots stay absolute.
pub fn join_path<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        let part = part.replace('\\', "/");
        let trimmed = if i == 0 {
            part.trim_end_matches('/')
        } else {
            part.trim_matches('/')
        };
        if trimmed.is_empty() {
            if i == 0 && part.starts_with('/') {
                out.push('/');
            }
            continue;
        }
        if !out.is_empty() && !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(trimmed);
    }
    out
}

/// `prefix` and `key` with exactly one `/` between them.
pub fn join_url(prefix: &str, key: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        key.replace('\\', "/").trim_start_matches('/')
    )
}

/// Directory holding a locally stored file.
pub fn local_relative_dir(endpoint: &str, bucket: &str, dir: Option<&str>, month: &str) -> String {
    join_path([endpoint, bucket, dir.unwrap_or_default(), month])
}

/// Key of a locally stored file, relative to the endpoint.
pub fn local_storage_key(bucket: &str, dir: Option<&str>, month: &str, file_name: &str) -> String {
    join_path([bucket, dir.unwrap_or_default(), month, file_name])
}

/// Object key inside the bucket.
///
/// With a logical directory the bucket name is repeated under it, so objects
/// of different projects sharing a bucket stay apart.
pub fn object_key(bucket: &str, dir: Option<&str>, month: &str, file_name: &str) -> String {
    match dir.map(|d| d.trim_start_matches(['/', '\\'])) {
        Some(dir) if !dir.is_empty() => join_path([dir, bucket, month, file_name]),
        _ => join_path([month, file_name]),
    }
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let normalized = key.replace('\\', "/");
    if normalized.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if normalized.starts_with('/') || normalized.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Storage key '{}' contains invalid path segments",
            key
        )));
    }
    Ok(())
}

/// Reject logical directories that would leave the bucket.
pub fn validate_dir(dir: &str) -> StorageResult<()> {
    let normalized = dir.replace('\\', "/");
    if normalized.split('/').any(|segment| segment == "..") {
        return Err(StorageError::Validation(format!(
            "Directory '{}' must not contain '..'",
            dir
        )));
    }
    Ok(())
}
