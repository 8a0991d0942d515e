use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3stream::config;
use s3stream::S3Client;

mod cli;

#[derive(Parser)]
#[command(name = "s3stream")]
#[command(version, about = "Streaming client for S3-compatible object storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (YAML). Without it, configuration comes from the environment.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Profile to use from config
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Disable SSL certificate verification
    #[arg(long, global = true)]
    insecure: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file or stdin
    Put {
        /// Object key
        key: String,

        /// Local file; `-` or nothing reads stdin
        source: Option<String>,

        /// Bytes per part for multipart uploads (minimum 5 MiB)
        #[arg(long)]
        part_size: Option<usize>,

        /// Content-Type of the object
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Download an object or a byte range of it
    Get {
        /// Object key
        key: String,

        /// First byte to read
        #[arg(long)]
        offset: Option<u64>,

        /// Number of bytes to read (default: to the end)
        #[arg(long)]
        length: Option<u64>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show object info
    Stat {
        /// Object key
        key: String,
    },

    /// Remove an object
    Rm {
        /// Object key
        key: String,
    },

    /// Print a presigned GET URL
    Presign {
        /// Object key
        key: String,

        /// Validity in seconds (max 604800)
        #[arg(long, default_value = "3600")]
        expires: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Multipart uploads run their parts as concurrent futures on one thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())?;
    let mut profile = config
        .get_profile(cli.profile.as_deref())
        .cloned()
        .context("No profile configured")?;
    if cli.insecure {
        profile.insecure_tls = true;
    }

    let client = S3Client::new(profile).context("Failed to create S3 client")?;

    match cli.command {
        Commands::Put {
            key,
            source,
            part_size,
            content_type,
        } => {
            cli::commands::cmd_put(&client, &key, source.as_deref(), part_size, content_type)
                .await?;
        }
        Commands::Get {
            key,
            offset,
            length,
            output,
        } => {
            cli::commands::cmd_get(&client, &key, offset, length, output.as_deref()).await?;
        }
        Commands::Stat { key } => {
            cli::commands::cmd_stat(&client, &key).await?;
        }
        Commands::Rm { key } => {
            cli::commands::cmd_rm(&client, &key).await?;
        }
        Commands::Presign { key, expires } => {
            cli::commands::cmd_presign(&client, &key, expires).await?;
        }
    }

    Ok(())
}
