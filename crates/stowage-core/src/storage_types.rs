use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage strategy types
///
/// Selected once from configuration when the process starts. Only `Local` and
/// `Minio` have backends; the other variants are recognised so that a
/// misconfiguration is reported instead of silently falling back.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStorageType {
    #[default]
    Local,
    AliOss,
    Minio,
    QiNiu,
    Tencent,
}

impl FileStorageType {
    /// Environment variable prefix for this backend's settings block.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            FileStorageType::Local => "FILE_LOCAL",
            FileStorageType::AliOss => "FILE_ALI",
            FileStorageType::Minio => "FILE_MINIO",
            FileStorageType::QiNiu => "FILE_QINIU",
            FileStorageType::Tencent => "FILE_TENCENT",
        }
    }

    /// Whether this variant is stored in a bucket-based remote object store.
    pub fn is_object_store(&self) -> bool {
        !matches!(self, FileStorageType::Local)
    }
}

impl FromStr for FileStorageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "local" => Ok(FileStorageType::Local),
            "ali_oss" | "alioss" | "ali" => Ok(FileStorageType::AliOss),
            "minio" => Ok(FileStorageType::Minio),
            "qi_niu" | "qiniu" => Ok(FileStorageType::QiNiu),
            "tencent" => Ok(FileStorageType::Tencent),
            _ => Err(anyhow::anyhow!("Invalid file storage type: {}", s)),
        }
    }
}

impl Display for FileStorageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStorageType::Local => write!(f, "LOCAL"),
            FileStorageType::AliOss => write!(f, "ALI_OSS"),
            FileStorageType::Minio => write!(f, "MINIO"),
            FileStorageType::QiNiu => write!(f, "QI_NIU"),
            FileStorageType::Tencent => write!(f, "TENCENT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "LOCAL".parse::<FileStorageType>().unwrap(),
            FileStorageType::Local
        );
        assert_eq!(
            "MinIO".parse::<FileStorageType>().unwrap(),
            FileStorageType::Minio
        );
        assert_eq!(
            "ALI_OSS".parse::<FileStorageType>().unwrap(),
            FileStorageType::AliOss
        );
        assert_eq!(
            "qi-niu".parse::<FileStorageType>().unwrap(),
            FileStorageType::QiNiu
        );
        assert!("fastdfs".parse::<FileStorageType>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in [
            FileStorageType::Local,
            FileStorageType::AliOss,
            FileStorageType::Minio,
            FileStorageType::QiNiu,
            FileStorageType::Tencent,
        ] {
            assert_eq!(kind.to_string().parse::<FileStorageType>().unwrap(), kind);
        }
    }

    #[test]
    fn serializes_as_upper_snake_case() {
        let json = serde_json::to_string(&FileStorageType::AliOss).unwrap();
        assert_eq!(json, "\"ALI_OSS\"");
    }
}
