use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use thiserror::Error;

use crate::sqlite::configure_connection;

const USAGE_SCHEMA: &str = include_str!("../../sql/usage.sql");

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to open usage database {path}: {source}")]
    Open {
        source: rusqlite::Error,
        path: PathBuf,
    },
    #[error("failed to execute statement on usage database: {0}")]
    Execute(#[from] rusqlite::Error),
    #[error("usage database path not configured")]
    MissingStore,
}

pub type StatsResult<T> = Result<T, StatsError>;

/// Aggregate counters served by the admin command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub total_users: i64,
    pub total_videos: i64,
}

#[derive(Debug, Clone)]
pub struct UsageStoreBuilder {
    path: Option<PathBuf>,
    read_only: bool,
    create_if_missing: bool,
}

impl Default for UsageStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            read_only: false,
            create_if_missing: true,
        }
    }
}

impl UsageStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn build(self) -> StatsResult<UsageStore> {
        let path = self.path.ok_or(StatsError::MissingStore)?;
        let mut flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        if !self.read_only && self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        Ok(UsageStore { path, flags })
    }
}

/// Append-only usage log over SQLite. Connections are opened per call with
/// a busy timeout, which serializes concurrent appends from parallel
/// request tasks at the storage layer.
#[derive(Debug, Clone)]
pub struct UsageStore {
    path: PathBuf,
    flags: OpenFlags,
}

impl UsageStore {
    pub fn builder() -> UsageStoreBuilder {
        UsageStoreBuilder::new()
    }

    pub fn new(path: impl AsRef<Path>) -> StatsResult<Self> {
        UsageStoreBuilder::new().path(path).build()
    }

    fn open(&self) -> StatsResult<Connection> {
        let conn =
            Connection::open_with_flags(&self.path, self.flags).map_err(|source| {
                StatsError::Open {
                    source,
                    path: self.path.clone(),
                }
            })?;
        configure_connection(&conn).map_err(|source| StatsError::Open {
            source,
            path: self.path.clone(),
        })?;
        Ok(conn)
    }

    pub fn initialize(&self) -> StatsResult<()> {
        let conn = self.open()?;
        conn.execute_batch(USAGE_SCHEMA)?;
        Ok(())
    }

    /// Registers a user if not yet known; repeat calls are no-ops.
    pub fn add_user(&self, user_id: i64, username: Option<&str>) -> StatsResult<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (user_id, username) VALUES (?1, ?2)",
            params![user_id, username],
        )?;
        Ok(())
    }

    /// Appends one processed-video record for `user_id`.
    pub fn log_video(&self, user_id: i64) -> StatsResult<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO video_logs (user_id) VALUES (?1)",
            params![user_id],
        )?;
        Ok(())
    }

    pub fn stats(&self) -> StatsResult<UsageStats> {
        let conn = self.open()?;
        let total_users =
            conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let total_videos =
            conn.query_row("SELECT COUNT(*) FROM video_logs", [], |row| row.get(0))?;
        Ok(UsageStats {
            total_users,
            total_videos,
        })
    }
}
