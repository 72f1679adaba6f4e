use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, Result};
use crate::size::DEFAULT_SIZE_CEILING;

pub const DEFAULT_API_ROOT: &str = "https://api.telegram.org";

/// Everything the bot reads from the environment, loaded once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramSection,
    pub limits: LimitsSection,
    pub storage: StorageSection,
    pub media: MediaSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone)]
pub struct TelegramSection {
    pub token: String,
    pub admin_id: i64,
    pub api_root: String,
}

#[derive(Debug, Clone)]
pub struct LimitsSection {
    pub max_video_size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct StorageSection {
    pub database_path: PathBuf,
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MediaSection {
    pub ffprobe_bin: String,
    pub ffmpeg_bin: String,
    pub probe_timeout_seconds: u64,
    pub compress_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct LoggingSection {
    pub level: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            telegram: TelegramSection::from_env()?,
            limits: LimitsSection::from_env()?,
            storage: StorageSection::from_env(),
            media: MediaSection::from_env()?,
            logging: LoggingSection::from_env(),
        })
    }
}

impl TelegramSection {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            token: required("BOT_TOKEN")?,
            admin_id: parsed("ADMIN_ID", 0)?,
            api_root: optional("TELEGRAM_API_URL", DEFAULT_API_ROOT),
        })
    }
}

impl LimitsSection {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            max_video_size_bytes: parsed("MAX_VIDEO_SIZE_BYTES", DEFAULT_SIZE_CEILING)?,
        })
    }
}

impl StorageSection {
    pub fn from_env() -> Self {
        Self {
            database_path: PathBuf::from(optional("DATABASE_PATH", "kadr.db")),
            download_dir: env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
        }
    }
}

impl MediaSection {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ffprobe_bin: optional("FFPROBE_BIN", "ffprobe"),
            ffmpeg_bin: optional("FFMPEG_BIN", "ffmpeg"),
            probe_timeout_seconds: parsed("FFPROBE_TIMEOUT_SECONDS", 30)?,
            compress_timeout_seconds: parsed("FFMPEG_TIMEOUT_SECONDS", 300)?,
        })
    }
}

impl LoggingSection {
    pub fn from_env() -> Self {
        Self {
            level: optional("LOG_LEVEL", "info"),
        }
    }
}

fn required(var: &'static str) -> Result<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { var }),
    }
}

fn optional(var: &'static str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(var: &'static str, default: T) -> Result<T> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
