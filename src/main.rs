use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pna_transfer::{Config, InvocationResponse, Pipeline};

/// Runs the WinePoS PnA transfer for a single storage notification.
#[derive(Parser, Debug)]
#[command(name = "pna-transfer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the notification JSON. Read from stdin when omitted.
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// JSON configuration file. Environment variables are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Validate configuration without processing.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::from_env().context("failed to read configuration from environment")?,
    };

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Source bucket: {}", config.source_bucket);
        info!("Upload bucket: {}", config.upload_bucket);
        match &config.parameter_bucket {
            Some(bucket) => info!("Store list: s3://{}{}/storeList", bucket, config.parameter_base),
            None => info!("Store list: Parameter Store {}/storeList", config.parameter_base),
        }
        info!("Mapping file: {}", config.mapping_key);
        info!("Configuration is valid");
        return Ok(());
    }

    let raw_event = read_event(args.event.as_ref()).await?;
    let pipeline = Pipeline::s3(config).await?;
    pipeline.handle_json(&raw_event).await?;

    println!("{}", serde_json::to_string(&InvocationResponse::success())?);
    Ok(())
}

async fn read_event(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read event {}", path.display())),
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("failed to read event from stdin")?;
            Ok(raw)
        }
    }
}
