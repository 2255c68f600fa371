#![forbid(unsafe_code)]

use crate::error::Error;
use sqlx::SqlitePool;
use std::path::PathBuf;

/// One row of the `app_events` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEvent {
    pub process_name: String,
    pub pid: u32,
    pub parent_process_name: String,
    pub exe_path: PathBuf,
    /// Seconds since the Unix epoch.
    pub start_time: i64,
    pub end_time: Option<i64>,
}

/// An event the monitor believes is still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEvent {
    pub pid: u32,
    pub process_name: String,
}

/// A parameterized write against the `app_events` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventWrite {
    /// Record that an application started.
    Open(AppEvent),
    /// Close every open event of `pid`.
    Close { pid: u32, end_time: i64 },
    /// Delete the whole usage history. Queued like any other write, so it
    /// lands after everything enqueued before it.
    ClearHistory,
}

impl EventWrite {
    pub const INSERT: &'static str = "INSERT INTO app_events \
         (process_name, pid, parent_process_name, exe_path, start_time) VALUES (?, ?, ?, ?, ?)";
    pub const CLOSE: &'static str =
        "UPDATE app_events SET end_time = ? WHERE pid = ? AND end_time IS NULL";
    pub const CLEAR: &'static str = "DELETE FROM app_events";

    pub fn statement(&self) -> &'static str {
        match self {
            Self::Open(_) => Self::INSERT,
            Self::Close { .. } => Self::CLOSE,
            Self::ClearHistory => Self::CLEAR,
        }
    }

    /// The pid a write is about. `None` for table-wide writes.
    pub fn pid(&self) -> Option<u32> {
        match self {
            Self::Open(event) => Some(event.pid),
            Self::Close { pid, .. } => Some(*pid),
            Self::ClearHistory => None,
        }
    }

    /// Bind the arguments and run the statement, returning the affected rows.
    pub async fn execute(&self, pool: &SqlitePool) -> Result<u64, Error> {
        let query = sqlx::query(self.statement());
        let query = match self {
            Self::Open(event) => query
                .bind(event.process_name.clone())
                .bind(i64::from(event.pid))
                .bind(event.parent_process_name.clone())
                .bind(event.exe_path.to_string_lossy().into_owned())
                .bind(event.start_time),
            Self::Close { pid, end_time } => query.bind(*end_time).bind(i64::from(*pid)),
            Self::ClearHistory => query,
        };
        Ok(query.execute(pool).await?.rows_affected())
    }
}
