use serde::{Deserialize, Serialize};

/// Coarse category of a stored file, derived from its declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Dir,
    Image,
    Video,
    Audio,
    Doc,
    Other,
}

/// Document MIME types matched exactly (after normalisation).
const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "application/rtf",
    "application/json",
    "application/xml",
];

/// Document MIME type families matched by prefix.
const DOCUMENT_PREFIXES: &[&str] = &[
    "text/",
    "application/vnd.openxmlformats-officedocument.",
    "application/vnd.oasis.opendocument.",
];

impl DataType {
    /// Classify a declared content type.
    ///
    /// Matching is case-insensitive and ignores parameters such as
    /// `; charset=utf-8`. The bytes themselves are never inspected.
    pub fn from_content_type(content_type: &str) -> Self {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if normalized == "inode/directory" {
            return DataType::Dir;
        }
        if normalized.starts_with("image/") {
            return DataType::Image;
        }
        if normalized.starts_with("video/") {
            return DataType::Video;
        }
        if normalized.starts_with("audio/") {
            return DataType::Audio;
        }
        if DOCUMENT_TYPES.contains(&normalized.as_str())
            || DOCUMENT_PREFIXES.iter().any(|p| normalized.starts_with(p))
        {
            return DataType::Doc;
        }
        DataType::Other
    }
}
