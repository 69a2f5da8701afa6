use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use fitsync_core::config::{load_config, CoreConfig};
use fitsync_core::observability::logging::init_logging;
use fitsync_core::observability::TracingSink;
use fitsync_core::resilience::{classify, describe, BackendError, ClassifiedError, ErrorCode};
use fitsync_core::snapshot::{format_relative_now, from_text, SnapshotSerializer, Value};
use fitsync_core::storage::{executor_from_config, upload_blob, HttpBlobStore};

#[derive(Parser)]
#[command(name = "fitsync-cli")]
#[command(about = "Developer tools for FitSync state snapshots and backend calls", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize a JSON state file and print the snapshot
    Snapshot {
        file: PathBuf,

        #[arg(short, long, default_value_t = 10)]
        depth: usize,
    },
    /// Classify an error and print the message a user would see
    Describe {
        #[arg(short, long)]
        code: Option<String>,

        #[arg(short, long)]
        message: Option<String>,
    },
    /// Print how long ago a timestamp was
    Ago { timestamp: String },
    /// Upload a file to the blob endpoint with retries
    Upload {
        file: PathBuf,

        #[arg(short, long)]
        key: String,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Snapshot { file, depth } => {
            let content = std::fs::read_to_string(&file)?;
            let json: serde_json::Value = serde_json::from_str(&content)?;
            let snapshot = SnapshotSerializer::new(depth).serialize(&Value::from(json));
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Describe { code, message } => {
            let error = match (code, message) {
                (None, None) => None,
                (Some(code), message) => Some(BackendError::new(
                    ErrorCode::parse(&code),
                    message.unwrap_or_default(),
                )),
                (None, Some(message)) => Some(BackendError::uncoded(message)),
            };
            if let Some(error) = &error {
                println!("kind:    {}", classify(error));
            }
            println!("message: {}", describe(error.as_ref()));
        }
        Commands::Ago { timestamp } => match from_text(&timestamp) {
            Some(instant) => println!("{}", format_relative_now(instant)),
            None => {
                eprintln!("Error: '{}' is not a recognized timestamp", timestamp);
                std::process::exit(2);
            }
        },
        Commands::Upload { file, key, config } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => CoreConfig::default(),
            };
            init_logging(&config.observability)?;

            let store = HttpBlobStore::from_config(&config.storage)?;
            let executor = executor_from_config(&config, Arc::new(TracingSink));

            let bytes = std::fs::read(&file)?;
            match upload_blob(&executor, &store, &key, &bytes).await {
                Ok(url) => println!("{}", url),
                Err(e) => {
                    eprintln!("{}", failure_report(&e));
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Final report once the executor has given up. Transient failures get no
/// "reconnecting" text since nothing retries after this point.
fn failure_report(error: &ClassifiedError) -> String {
    let summary = if error.is_transient() {
        format!(
            "Error: the storage backend could not be reached after {} attempt(s).",
            error.attempts()
        )
    } else {
        format!("Error: {}", error.user_message())
    };
    format!("{}\nKind:  {}\nCause: {}", summary, error.kind(), error.cause())
}
