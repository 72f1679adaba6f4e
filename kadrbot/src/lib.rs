use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

use kadr_core::{BotConfig, LoggingSection, MediaSection, StorageSection};

pub mod commands;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] kadr_core::ConfigError),
    #[error("database error: {0}")]
    Stats(#[from] kadr_core::StatsError),
    #[error("media error: {0}")]
    Media(#[from] kadr_core::MediaError),
    #[error("telegram client error: {0}")]
    Fetch(#[from] kadr_core::FetchError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Telegram video analysis bot", long_about = None)]
pub struct Cli {
    /// Output format for offline commands
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot with long polling
    Run,
    /// Print usage counters from the database
    Stats,
    /// Inspect a local media file
    Probe(ProbeArgs),
    /// Compress a local media file with the fixed x264/aac profile
    Compress(CompressArgs),
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// File to inspect
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Source file
    pub input: PathBuf,
    /// Destination file
    pub output: PathBuf,
}

pub async fn run(cli: Cli) -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(&LoggingSection::from_env());

    match cli.command {
        Commands::Run => {
            let config = BotConfig::from_env()?;
            commands::run::execute(config).await
        }
        Commands::Stats => commands::ops::stats(&StorageSection::from_env(), cli.format),
        Commands::Probe(args) => {
            commands::ops::probe(&MediaSection::from_env()?, cli.format, &args.path).await
        }
        Commands::Compress(args) => {
            commands::ops::compress(&MediaSection::from_env()?, &args.input, &args.output).await
        }
    }
}

fn init_tracing(logging: &LoggingSection) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
