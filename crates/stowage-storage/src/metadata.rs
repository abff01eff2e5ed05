//! Builds the [`File`] record for an incoming upload.

use crate::keys::validate_dir;
use crate::traits::{StorageError, StorageResult};
use chrono::NaiveDateTime;
use stowage_core::models::{
    file_extension, icon_for_extension, DataType, File, DAY_FORMAT, MONTH_FORMAT, WEEK_FORMAT,
};

/// Populate a record from upload parameters.
///
/// Fails with [`StorageError::Validation`] when `original_name` has no
/// extension separator or `dir` tries to climb out of the bucket. Storage
/// coordinates (`file_name`, `relative_path`, `url`) are left empty for the
/// backend to fill. Performs no I/O.
pub fn build_file(
    size: u64,
    content_type: &str,
    original_name: &str,
    dir: Option<&str>,
    now: NaiveDateTime,
) -> StorageResult<File> {
    let ext = file_extension(original_name).ok_or_else(|| {
        StorageError::Validation(format!(
            "Uploaded file name '{}' has no extension",
            original_name
        ))
    })?;

    let dir = dir
        .map(|d| d.trim().trim_matches(['/', '\\']))
        .filter(|d| !d.is_empty());
    if let Some(dir) = dir {
        validate_dir(dir)?;
    }

    Ok(File {
        id: None,
        data_type: DataType::from_content_type(content_type),
        submitted_file_name: original_name.to_string(),
        ext: ext.to_string(),
        icon: icon_for_extension(ext).to_string(),
        size,
        content_type: content_type.to_string(),
        file_name: String::new(),
        relative_path: String::new(),
        url: String::new(),
        dir: dir.map(String::from),
        is_delete: false,
        create_month: now.format(MONTH_FORMAT).to_string(),
        create_week: now.format(WEEK_FORMAT).to_string(),
        create_day: now.format(DAY_FORMAT).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn text_upload() {
        let file = build_file(5, "text/plain", "a.txt", None, at(2024, 3, 8)).unwrap();

        assert_eq!(file.ext, "txt");
        assert_eq!(file.data_type, DataType::Doc);
        assert_eq!(file.icon, "fa-file-text-o");
        assert_eq!(file.size, 5);
        assert_eq!(file.content_type, "text/plain");
        assert_eq!(file.submitted_file_name, "a.txt");
        assert_eq!(file.id, None);
        assert!(!file.is_delete);
        assert!(file.file_name.is_empty());
        assert!(file.relative_path.is_empty());
        assert_eq!(file.dir, None);
    }

    #[test]
    fn date_buckets() {
        let file = build_file(1, "image/png", "p.png", None, at(2024, 3, 8)).unwrap();
        assert_eq!(file.create_month, "2024-03");
        assert_eq!(file.create_week, "2024-10");
        assert_eq!(file.create_day, "2024-03-08");

        // January 1st 2021 belongs to ISO week 53 of 2020.
        let file = build_file(1, "image/png", "p.png", None, at(2021, 1, 1)).unwrap();
        assert_eq!(file.create_month, "2021-01");
        assert_eq!(file.create_week, "2020-53");
    }

    #[test]
    fn missing_extension_is_rejected() {
        let err = build_file(5, "text/plain", "noext", None, at(2024, 3, 8)).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn extension_from_last_dot_and_icon_lookup_ignores_case() {
        let file =
            build_file(1, "application/gzip", "backup.tar.GZ", None, at(2024, 3, 8)).unwrap();
        assert_eq!(file.ext, "GZ");
        assert_eq!(file.icon, "fa-file-archive-o");
        assert_eq!(file.data_type, DataType::Other);
    }

    #[test]
    fn dir_is_trimmed_and_checked() {
        let file = build_file(1, "image/png", "p.png", Some(" avatars "), at(2024, 3, 8)).unwrap();
        assert_eq!(file.dir.as_deref(), Some("avatars"));

        let file = build_file(1, "image/png", "p.png", Some(""), at(2024, 3, 8)).unwrap();
        assert_eq!(file.dir, None);

        let err = build_file(1, "image/png", "p.png", Some("../etc"), at(2024, 3, 8)).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn dir_loses_surrounding_slashes() {
        let file = build_file(1, "image/png", "p.png", Some("/avatars/"), at(2024, 3, 8)).unwrap();
        assert_eq!(file.dir.as_deref(), Some("avatars"));

        let file = build_file(1, "image/png", "p.png", Some("/"), at(2024, 3, 8)).unwrap();
        assert_eq!(file.dir, None);
    }
}
