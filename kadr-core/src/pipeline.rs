use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::fetch::{FetchError, TelegramFetcher};
use crate::media::{MediaProber, VideoMetadata};
use crate::size::{SizeError, SizeLimit};
use crate::stats::{StatsError, UsageStore};
use crate::summary::render_summary;

/// Fallback text when a failure has no stage-specific message. Internals
/// are logged, never shown.
pub const GENERIC_FAILURE: &str = "❌ Произошла ошибка при обработке видео.";

/// One inbound video event, as delivered by the platform.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub user_id: i64,
    pub username: Option<String>,
    pub file_id: String,
    pub declared_size: u64,
    pub file_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation failed: {0}")]
    Validation(#[from] SizeError),
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("usage recording failed: {0}")]
    Record(#[from] StatsError),
}

impl PipelineError {
    /// The single outbound text for a failed request.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation(err) => err.user_message(),
            PipelineError::Fetch(err) => err.user_message(),
            PipelineError::Record(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Removes the per-request temp file when dropped, whichever way the
/// request ends. Removal failures are logged, never surfaced.
#[derive(Debug)]
struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove temp file");
            }
        }
    }
}

/// A downloaded video awaiting analysis. Owns the temp file: dropping this
/// value, with or without finishing the request, removes it.
#[derive(Debug)]
pub struct FetchedVideo {
    path: PathBuf,
    _cleanup: TempFileGuard,
}

impl FetchedVideo {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of a fully processed request.
#[derive(Debug, Clone)]
pub struct ProcessedVideo {
    pub metadata: VideoMetadata,
    pub summary: String,
}

/// Sequences one video request: validate the declared size, download,
/// probe, render the summary, record usage. Collaborators are injected so
/// the pipeline tests without platform credentials.
#[derive(Debug, Clone)]
pub struct VideoPipeline {
    limit: SizeLimit,
    fetcher: TelegramFetcher,
    prober: MediaProber,
    store: UsageStore,
    download_dir: PathBuf,
}

impl VideoPipeline {
    pub fn new(
        limit: SizeLimit,
        fetcher: TelegramFetcher,
        prober: MediaProber,
        store: UsageStore,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            limit,
            fetcher,
            prober,
            store,
            download_dir,
        }
    }

    /// Temp-file location for one request, unique per (user, file).
    pub fn temp_path(&self, request: &VideoRequest) -> PathBuf {
        self.download_dir
            .join(format!("kadr_{}_{}.mp4", request.user_id, request.file_id))
    }

    /// Validation and download. The cleanup guard is registered before any
    /// fallible work, so an error after partial streaming still removes
    /// the file.
    pub async fn download(&self, request: &VideoRequest) -> Result<FetchedVideo, PipelineError> {
        let dest = self.temp_path(request);
        let cleanup = TempFileGuard::new(dest.clone());
        self.limit.check(request.declared_size)?;
        info!(
            user_id = request.user_id,
            file_id = %request.file_id,
            name = request.file_name.as_deref().unwrap_or("unnamed"),
            "downloading video"
        );
        self.fetcher
            .fetch(&request.file_id, request.declared_size, &dest)
            .await?;
        Ok(FetchedVideo {
            path: dest,
            _cleanup: cleanup,
        })
    }

    /// Analysis, summary and usage recording. Consumes the downloaded
    /// video; its temp file is gone when this returns, on every path.
    pub async fn finish(
        &self,
        request: &VideoRequest,
        video: FetchedVideo,
    ) -> Result<ProcessedVideo, PipelineError> {
        let metadata = self.prober.describe(video.path()).await;
        let summary = render_summary(&metadata);
        self.store
            .add_user(request.user_id, request.username.as_deref())?;
        self.store.log_video(request.user_id)?;
        info!(user_id = request.user_id, "video processed");
        Ok(ProcessedVideo { metadata, summary })
    }

    /// The whole cycle for callers that do not report progress in between.
    pub async fn process(&self, request: &VideoRequest) -> Result<ProcessedVideo, PipelineError> {
        let video = self.download(request).await?;
        self.finish(request, video).await
    }
}
