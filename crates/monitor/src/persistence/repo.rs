#![forbid(unsafe_code)]

use crate::error::Error;
use crate::persistence::{AppEvent, OpenEvent, SqliteEventSink};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::task::JoinHandle;
use tracing::debug;

/// Schema of the `app_events` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events without an end time.
    async fn open_events(&self) -> Result<Vec<OpenEvent>, Error>;
}

#[derive(Debug, Default)]
pub struct NoopStore;

#[async_trait]
impl EventStore for NoopStore {
    async fn open_events(&self) -> Result<Vec<OpenEvent>, Error> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: Option<PathBuf>,
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database and bring its schema up to date. An
    /// empty path opens an in-memory database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let (path, options) = if path.as_os_str().is_empty() {
            (None, SqliteConnectOptions::from_str("sqlite::memory:")?)
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal);
            (Some(path.to_path_buf()), options)
        };

        // Every in-memory connection is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;
        debug!(path = ?path, "event store ready");

        Ok(Self { path, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start a writer task on this database.
    pub fn spawn_sink(&self) -> (SqliteEventSink, JoinHandle<()>) {
        SqliteEventSink::spawn(self.pool.clone())
    }

    /// Full history in insertion order.
    pub async fn events(&self) -> Result<Vec<AppEvent>, Error> {
        let rows = sqlx::query(
            "SELECT process_name, pid, parent_process_name, exe_path, start_time, end_time \
             FROM app_events ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AppEvent, Error> {
                Ok(AppEvent {
                    process_name: row.try_get("process_name")?,
                    pid: row.try_get::<i64, _>("pid")? as u32,
                    parent_process_name: row.try_get("parent_process_name")?,
                    exe_path: PathBuf::from(row.try_get::<String, _>("exe_path")?),
                    start_time: row.try_get("start_time")?,
                    end_time: row.try_get("end_time")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn open_events(&self) -> Result<Vec<OpenEvent>, Error> {
        let rows = sqlx::query(
            "SELECT pid, process_name FROM app_events WHERE end_time IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        // A single undecodable row abandons the whole read.
        rows.iter()
            .map(|row| -> Result<OpenEvent, Error> {
                Ok(OpenEvent {
                    pid: row.try_get::<i64, _>("pid")? as u32,
                    process_name: row.try_get("process_name")?,
                })
            })
            .collect()
    }
}
