#![forbid(unsafe_code)]

mod procfs_source;

pub use procfs_source::{ProcfsProcess, ProcfsSource};

use crate::error::Error;
use std::path::PathBuf;

/// A handle to a process that was alive when the snapshot was taken.
///
/// Every attribute is looked up on demand and may fail independently, e.g.
/// because the process exited in the meantime or is not readable by us.
pub trait LiveProcess: Send + Sync {
    fn pid(&self) -> u32;
    fn name(&self) -> Result<String, Error>;
    fn exe(&self) -> Result<PathBuf, Error>;
    /// Name of the parent process. Callers treat failure as "no parent".
    fn parent_name(&self) -> Result<String, Error>;
    /// Whether the process is attached to a graphical session.
    fn has_display(&self) -> bool;
}

pub type Snapshot = Vec<Box<dyn LiveProcess>>;

pub trait SnapshotSource: Send + Sync {
    /// Enumerate the processes currently alive on the host.
    fn snapshot(&mut self) -> Result<Snapshot, Error>;
    /// Whether a process with this pid exists right now.
    fn is_alive(&self, pid: u32) -> bool;
}
