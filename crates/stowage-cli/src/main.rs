//! Stowage CLI: store, locate and remove files through the configured backend.
//!
//! Configuration comes from the environment (and `.env`); see `FILE_STORAGE_TYPE`
//! and the `FILE_{LOCAL,MINIO,...}_*` blocks.

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use std::path::PathBuf;
use stowage_cli::{guess_content_type, init_tracing};
use stowage_core::Config;
use stowage_storage::{create_storage, FileStorage};
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Parser)]
#[command(name = "stowage", about = "Pluggable file storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print its metadata record
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Logical directory inside the bucket
        #[arg(long)]
        dir: Option<String>,
        /// Declared content type (guessed from the extension by default)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Print the access URL of a stored file
    Url {
        /// Storage key
        name: String,
        /// Use the intranet URI prefix
        #[arg(long)]
        inner: bool,
    },
    /// Download a stored file
    Get {
        /// Storage key
        name: String,
        /// Destination file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check whether a stored file exists
    Exists {
        /// Storage key
        name: String,
    },
    /// Delete one or more stored files
    Delete {
        /// Storage keys
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Bucket administration (object store backends only)
    Bucket {
        #[command(subcommand)]
        sub: BucketCommands,
    },
}

#[derive(Subcommand)]
enum BucketCommands {
    /// Create a bucket
    Make {
        /// Bucket name
        name: String,
    },
    /// Remove an empty bucket
    Remove {
        /// Bucket name
        name: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn download(
    storage: &FileStorage,
    name: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut stream = storage
        .get_stream(name)
        .await?
        .with_context(|| format!("File {} not found or unreadable", name))?;

    let mut writer: Box<dyn AsyncWrite + Unpin + Send> = match &output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let mut written = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await.context("Write output")?;
        written += chunk.len();
    }
    writer.flush().await.context("Flush output")?;

    tracing::info!(key = %name, size_bytes = written, "Download complete");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load storage configuration")?;
    config.validate()?;
    let storage = create_storage(&config)
        .await
        .context("Failed to initialise storage backend")?;

    match cli.command {
        Commands::Upload {
            file,
            dir,
            content_type,
        } => {
            let original_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Invalid file name: {}", file.display()))?
                .to_string();
            let content_type = content_type
                .unwrap_or_else(|| guess_content_type(&original_name));
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Read {}", file.display()))?;

            let record = storage
                .upload_to(data, &original_name, &content_type, dir.as_deref())
                .await?;
            print_json(&serde_json::json!({
                "storageKey": storage.storage_key(&record)?,
                "file": record,
            }))?;
        }
        Commands::Url { name, inner } => {
            let url = if inner {
                storage.resolve_inner_url(&name).await?
            } else {
                storage.resolve_url(&name).await?
            };
            print_json(&serde_json::json!({ "url": url }))?;
        }
        Commands::Get { name, output } => {
            download(&storage, &name, output).await?;
        }
        Commands::Exists { name } => {
            let exists = storage.exists(&name).await;
            print_json(&serde_json::json!({ "name": name, "exists": exists }))?;
        }
        Commands::Delete { names } => {
            let success = match names.as_slice() {
                [name] => storage.delete(name).await?,
                _ => storage.delete_many(&names).await?,
            };
            let count = names.len();
            print_json(&serde_json::json!({ "success": success, "count": count }))?;
        }
        Commands::Bucket { sub } => {
            let object = storage.as_object().with_context(|| {
                format!(
                    "Bucket commands need an object store backend, not {}",
                    storage.backend_type()
                )
            })?;
            let (bucket, success) = match sub {
                BucketCommands::Make { name } => {
                    let ok = object.make_bucket(&name).await;
                    (name, ok)
                }
                BucketCommands::Remove { name } => {
                    let ok = object.remove_bucket(&name).await;
                    (name, ok)
                }
            };
            print_json(&serde_json::json!({ "bucket": bucket, "success": success }))?;
        }
    }

    Ok(())
}
