use std::path::Path;

/// Guess a MIME type from a file name's extension.
///
/// Unknown or missing extensions map to `application/octet-stream`.
pub fn guess_content_type(name: impl AsRef<Path>) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays
/// machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stowage=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
