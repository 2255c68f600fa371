#![forbid(unsafe_code)]

use crate::error::Error;
use crate::snapshot::{LiveProcess, Snapshot, SnapshotSource};
use procfs::process::Process;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::trace;

const DISPLAY_VARS: [&str; 2] = ["DISPLAY", "WAYLAND_DISPLAY"];
/// `comm` holds at most this many bytes, longer names are cut.
const COMM_LEN: usize = 15;

#[derive(Debug, Default)]
pub struct ProcfsSource;

impl SnapshotSource for ProcfsSource {
    fn snapshot(&mut self) -> Result<Snapshot, Error> {
        let mut processes: Snapshot = Vec::new();
        for process in procfs::process::all_processes()? {
            match process {
                Ok(process) => processes.push(Box::new(ProcfsProcess { process })),
                // Exited between listing /proc and opening the entry.
                Err(err) => trace!(?err, "skipping unreadable process entry"),
            }
        }
        trace!(count = processes.len(), "process snapshot collected");
        Ok(processes)
    }

    fn is_alive(&self, pid: u32) -> bool {
        i32::try_from(pid)
            .ok()
            .is_some_and(|pid| Process::new(pid).is_ok())
    }
}

#[derive(Debug)]
pub struct ProcfsProcess {
    process: Process,
}

impl ProcfsProcess {
    /// Open the procfs entry of a single pid.
    pub fn new(pid: u32) -> Result<Self, Error> {
        let raw = i32::try_from(pid).map_err(|_| Error::Unavailable { pid, what: "process" })?;
        Ok(Self {
            process: Process::new(raw)?,
        })
    }

    /// The full name of `process`. The kernel truncates `comm`, so a name that
    /// hits the limit is recovered from the executable or `argv[0]` when one
    /// of their file names extends it.
    fn full_name(process: &Process) -> Result<String, Error> {
        let comm = process.stat()?.comm;
        if comm.len() < COMM_LEN {
            return Ok(comm);
        }
        let exe = process.exe().ok().and_then(|path| Self::sanitize_path(&path));
        let argv0 = process
            .cmdline()
            .ok()
            .and_then(|args| args.into_iter().next())
            .map(PathBuf::from);
        Ok(Self::untruncate(comm, exe.into_iter().chain(argv0)))
    }

    fn untruncate(comm: String, candidates: impl IntoIterator<Item = PathBuf>) -> String {
        candidates
            .into_iter()
            .find_map(|path| {
                let name = path.file_name()?.to_str()?;
                (name.len() > comm.len() && name.starts_with(&comm)).then(|| name.to_owned())
            })
            .unwrap_or(comm)
    }

    /// Strip the markers the kernel and prelink append to executable links.
    /// Relative results (e.g. kernel threads) are rejected.
    fn sanitize_path(path: &Path) -> Option<PathBuf> {
        if !path.has_root() {
            return None;
        }
        let path_str = path.to_str()?;
        let trimmed = path_str.trim_end_matches(" (deleted)");
        let trimmed = trimmed.split(".#prelink#.").next()?;
        Some(PathBuf::from(trimmed))
    }
}

impl LiveProcess for ProcfsProcess {
    fn pid(&self) -> u32 {
        self.process.pid as u32
    }

    fn name(&self) -> Result<String, Error> {
        Self::full_name(&self.process)
    }

    fn exe(&self) -> Result<PathBuf, Error> {
        let path = self.process.exe()?;
        Self::sanitize_path(&path).ok_or(Error::Unavailable {
            pid: self.pid(),
            what: "executable path",
        })
    }

    fn parent_name(&self) -> Result<String, Error> {
        let ppid = self.process.stat()?.ppid;
        if ppid <= 0 {
            return Err(Error::Unavailable {
                pid: self.pid(),
                what: "parent process",
            });
        }
        Self::full_name(&Process::new(ppid)?)
    }

    fn has_display(&self) -> bool {
        match self.process.environ() {
            Ok(environ) => DISPLAY_VARS
                .iter()
                .any(|var| environ.contains_key(OsStr::new(var))),
            Err(err) => {
                trace!(pid = self.pid(), ?err, "environment not readable");
                false
            }
        }
    }
}
