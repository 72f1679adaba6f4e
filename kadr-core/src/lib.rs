pub mod config;
pub mod error;
pub mod fetch;
pub mod media;
pub mod pipeline;
pub mod size;
pub mod sqlite;
pub mod stats;
pub mod summary;

pub use config::{
    BotConfig, LimitsSection, LoggingSection, MediaSection, StorageSection, TelegramSection,
    DEFAULT_API_ROOT,
};
pub use error::ConfigError;
pub use fetch::{FetchError, FetchResult, TelegramFetcher, RESOLVE_TIMEOUT};
pub use media::{MediaError, MediaProber, MediaResult, VideoMetadata, UNKNOWN};
pub use pipeline::{
    FetchedVideo, PipelineError, ProcessedVideo, VideoPipeline, VideoRequest, GENERIC_FAILURE,
};
pub use size::{format_size, SizeError, SizeLimit, DEFAULT_SIZE_CEILING};
pub use stats::{StatsError, StatsResult, UsageStats, UsageStore, UsageStoreBuilder};
pub use summary::render_summary;
