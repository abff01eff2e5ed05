use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::data_type::DataType;

/// `yyyy-MM`, also the name of the per-month storage directory.
pub const MONTH_FORMAT: &str = "%Y-%m";
/// `yyyy-ww` using the ISO week-numbering year.
pub const WEEK_FORMAT: &str = "%G-%V";
/// `yyyy-MM-dd`
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Metadata for one stored file.
///
/// Built from an upload, filled with storage coordinates by the active
/// backend and then handed to the caller, who owns persistence. Nothing in
/// this workspace writes the record anywhere or mutates it after upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Assigned by the external record store.
    pub id: Option<i64>,
    pub data_type: DataType,
    /// Name as given by the uploader.
    pub submitted_file_name: String,
    /// Extension of `submitted_file_name`, without the dot.
    pub ext: String,
    pub icon: String,
    /// Size in bytes.
    pub size: u64,
    /// Declared MIME type.
    #[serde(rename = "contextType")]
    pub content_type: String,
    /// Backend generated unique name: `{uuid}.{ext}`.
    pub file_name: String,
    /// Backend specific storage path.
    pub relative_path: String,
    /// Public access URL.
    pub url: String,
    /// Caller supplied logical subdirectory.
    pub dir: Option<String>,
    pub is_delete: bool,
    pub create_month: String,
    pub create_week: String,
    pub create_day: String,
}

impl File {
    /// The logical subdirectory, if one was given and is not blank.
    pub fn dir(&self) -> Option<&str> {
        self.dir
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Month directory the file belongs to.
    ///
    /// Falls back to `now` for records that were not produced by the metadata
    /// builder and have no month recorded.
    pub fn month_bucket(&self, now: NaiveDateTime) -> String {
        if self.create_month.is_empty() {
            now.format(MONTH_FORMAT).to_string()
        } else {
            self.create_month.clone()
        }
    }
}

/// Extension after the last `.` of `name`, or `None` when there is no `.`.
pub fn file_extension(name: &str) -> Option<&str> {
    name.rfind('.').map(|idx| &name[idx + 1..])
}
