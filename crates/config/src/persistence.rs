use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Persistence {
    /// SQLite database holding the `app_events` table.
    ///
    /// An empty path means events are kept in an in-memory database that
    /// vanishes with the process.
    pub database: PathBuf,
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            database: PathBuf::from("/var/lib/appwatch/usage.db"),
        }
    }
}
