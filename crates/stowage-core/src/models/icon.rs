//! Display icons for the file browser, keyed by extension.

/// Icon used for extensions the table does not know.
pub const DEFAULT_ICON: &str = "fa-file-o";

/// Look up the icon key for a file extension (without the leading dot).
pub fn icon_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        // Images
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" | "ico" | "tif" | "tiff"
        | "avif" | "heic" => "fa-file-image-o",
        // Videos
        "mp4" | "avi" | "mov" | "mkv" | "wmv" | "flv" | "webm" | "m4v" | "rmvb" | "3gp" => {
            "fa-file-video-o"
        }
        // Audio
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "m4a" | "wma" | "amr" => "fa-file-audio-o",
        // Documents
        "pdf" => "fa-file-pdf-o",
        "doc" | "docx" | "odt" | "rtf" | "wps" => "fa-file-word-o",
        "xls" | "xlsx" | "ods" | "csv" => "fa-file-excel-o",
        "ppt" | "pptx" | "odp" => "fa-file-powerpoint-o",
        "txt" | "md" | "log" => "fa-file-text-o",
        // Archives
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "jar" | "war" => "fa-file-archive-o",
        // Source code
        "rs" | "java" | "js" | "ts" | "py" | "go" | "c" | "cpp" | "h" | "html" | "htm" | "css"
        | "json" | "xml" | "yml" | "yaml" | "toml" | "sql" | "sh" => "fa-file-code-o",
        _ => DEFAULT_ICON,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(icon_for_extension("png"), "fa-file-image-o");
        assert_eq!(icon_for_extension("pdf"), "fa-file-pdf-o");
        assert_eq!(icon_for_extension("docx"), "fa-file-word-o");
        assert_eq!(icon_for_extension("txt"), "fa-file-text-o");
        assert_eq!(icon_for_extension("gz"), "fa-file-archive-o");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(icon_for_extension("JPG"), "fa-file-image-o");
        assert_eq!(icon_for_extension("Mp4"), "fa-file-video-o");
    }

    #[test]
    fn unknown_falls_back_to_default() {
        assert_eq!(icon_for_extension("xyz"), DEFAULT_ICON);
        assert_eq!(icon_for_extension(""), DEFAULT_ICON);
    }
}
