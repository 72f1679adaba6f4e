use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::size::{SizeError, SizeLimit};

/// Client-side timeout for the file-metadata resolve call. The streaming
/// download itself is not bounded; a 2 GB file on a slow link may
/// legitimately take longer than any fixed budget.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("declared size rejected: {0}")]
    TooLarge(#[from] SizeError),
    #[error("file info request rejected: {0}")]
    Resolve(String),
    #[error("file info request timed out after {0:?}")]
    Timeout(Duration),
    #[error("download request rejected: {0}")]
    Download(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl FetchError {
    /// The text relayed to the chat for this failure. Internals (statuses,
    /// paths, transport details) stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::TooLarge(err) => err.user_message(),
            FetchError::Resolve(_) => {
                "❌ Не удалось получить информацию о файле.".to_string()
            }
            FetchError::Timeout(_) => {
                "⏱ Время ожидания загрузки истекло. Попробуйте ещё раз.".to_string()
            }
            FetchError::Download(_) => "❌ Не удалось скачать файл.".to_string(),
            FetchError::Transport(detail) => {
                format!("❌ Ошибка при загрузке файла: {detail}.")
            }
            FetchError::Io { .. } => "❌ Не удалось сохранить файл.".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    ok: bool,
    #[serde(default)]
    result: Option<FileInfo>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

/// Downloads Telegram files past the Bot API's 20 MB convenience limit:
/// resolve `file_id` to a `file_path` via `getFile`, then stream the body
/// from the direct file endpoint into the destination.
#[derive(Debug, Clone)]
pub struct TelegramFetcher {
    client: Client,
    api_root: String,
    token: String,
    limit: SizeLimit,
}

impl TelegramFetcher {
    pub fn new(
        api_root: impl Into<String>,
        token: impl Into<String>,
        limit: SizeLimit,
    ) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent("kadr-bot/0.1")
            .build()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            token: token.into(),
            limit,
        })
    }

    /// Fetches `file_id` into `dest`. The declared size is re-checked
    /// before any request goes out; the caller owns the file afterwards.
    pub async fn fetch(
        &self,
        file_id: &str,
        declared_size: u64,
        dest: &Path,
    ) -> FetchResult<PathBuf> {
        self.limit.check(declared_size)?;
        let file_path = self.resolve_file(file_id).await?;
        info!(file_id, size = declared_size, "streaming telegram file");
        self.stream_to_file(&file_path, dest).await?;
        Ok(dest.to_path_buf())
    }

    async fn resolve_file(&self, file_id: &str) -> FetchResult<String> {
        let url = format!("{}/bot{}/getFile", self.api_root, self.token);
        let response = self
            .client
            .get(&url)
            .query(&[("file_id", file_id)])
            .timeout(RESOLVE_TIMEOUT)
            .send()
            .await
            .map_err(map_transport)?;
        let status = response.status();
        if !status.is_success() {
            warn!(file_id, %status, "getFile returned non-success status");
            return Err(FetchError::Resolve(format!("status {status}")));
        }
        let envelope: FileEnvelope = response
            .json()
            .await
            .map_err(|err| FetchError::Resolve(format!("malformed envelope: {err}")))?;
        if !envelope.ok {
            return Err(FetchError::Resolve(
                envelope
                    .description
                    .unwrap_or_else(|| "api reported ok=false".to_string()),
            ));
        }
        envelope
            .result
            .and_then(|info| info.file_path)
            .ok_or_else(|| FetchError::Resolve("envelope missing file_path".to_string()))
    }

    async fn stream_to_file(&self, file_path: &str, dest: &Path) -> FetchResult<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let url = format!("{}/file/bot{}/{}", self.api_root, self.token, file_path);
        let response = self.client.get(&url).send().await.map_err(map_transport)?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "file download returned non-success status");
            return Err(FetchError::Download(format!("status {status}")));
        }
        let mut stream = response.bytes_stream();
        let mut file = fs::File::create(dest)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })?;
        while let Some(chunk) = stream.next().await {
            let data = chunk.map_err(map_transport)?;
            file.write_all(&data)
                .await
                .map_err(|source| FetchError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// reqwest errors are logged without their URL: the request URL embeds the
/// bot token.
fn map_transport(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(RESOLVE_TIMEOUT)
    } else {
        FetchError::Transport(err.without_url().to_string())
    }
}
