#![forbid(unsafe_code)]

use crate::snapshot::LiveProcess;
use crate::stores::LoggedApps;
use config::Config;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcludeReason {
    Filtered,
    AlreadyLogged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    NameUnavailable,
    ExeUnavailable,
    NotTrackable,
}

/// Outcome of looking at a process that is not in the running set yet.
///
/// `Log` and `Exclude` are terminal: the pid is never looked at again while
/// it lives. `Retry` leaves it to be classified again on the next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Log { name: String, exe: PathBuf },
    Exclude { name: String, reason: ExcludeReason },
    Retry { reason: RetryReason },
}

impl Classification {
    /// Lowercased process name for terminal outcomes.
    pub fn name_key(&self) -> Option<String> {
        match self {
            Self::Log { name, .. } | Self::Exclude { name, .. } => Some(name.to_lowercase()),
            Self::Retry { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Retry { .. })
    }
}

pub trait AppFilter: Send + Sync {
    /// Processes that must never produce a usage event.
    fn should_exclude(&self, exe: &Path, process: &dyn LiveProcess) -> bool;
    /// Whether the process currently looks like a user-facing application.
    fn should_track(&self, exe: &Path, process: &dyn LiveProcess) -> bool;
}

/// Decide what to do with a process. The first matching rule wins.
pub fn classify(
    process: &dyn LiveProcess,
    filter: &dyn AppFilter,
    logged: &LoggedApps,
) -> Classification {
    // Freshly created processes briefly lack a resolvable name.
    let name = match process.name() {
        Ok(name) if !name.is_empty() => name,
        _ => {
            return Classification::Retry {
                reason: RetryReason::NameUnavailable,
            };
        }
    };
    let Ok(exe) = process.exe() else {
        return Classification::Retry {
            reason: RetryReason::ExeUnavailable,
        };
    };

    if filter.should_exclude(&exe, process) {
        return Classification::Exclude {
            name,
            reason: ExcludeReason::Filtered,
        };
    }
    // Only the first instance of an application is recorded per session.
    if logged.contains(&name) {
        return Classification::Exclude {
            name,
            reason: ExcludeReason::AlreadyLogged,
        };
    }
    if !filter.should_track(&exe, process) {
        return Classification::Retry {
            reason: RetryReason::NotTrackable,
        };
    }

    Classification::Log { name, exe }
}

#[derive(Debug, Clone)]
pub struct DefaultAppFilter {
    exeprefix: Vec<PathBuf>,
    require_display: bool,
    always_track: HashSet<String>,
}

impl DefaultAppFilter {
    pub fn new(config: &Config) -> Self {
        Self {
            exeprefix: config.filter.exeprefix.clone(),
            require_display: config.filter.require_display,
            always_track: config
                .filter
                .always_track
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
        }
    }

    fn accept_path<T: AsRef<Path>>(path: &Path, prefixes: &[T]) -> bool {
        let mut best: Option<(bool, usize)> = None;
        let path_str = match path.to_str() {
            Some(s) => s,
            None => return false,
        };
        for prefix in prefixes {
            let Some(prefix) = prefix.as_ref().to_str() else {
                continue;
            };
            let (neg, p) = prefix
                .strip_prefix('!')
                .map(|p| (true, p))
                .unwrap_or((false, prefix));
            if path_str.starts_with(p) {
                let len = p.len();
                if best.map(|(_, l)| l).unwrap_or(0) < len {
                    best = Some((!neg, len));
                }
            }
        }
        best.map(|(accept, _)| accept).unwrap_or(true)
    }
}

impl AppFilter for DefaultAppFilter {
    fn should_exclude(&self, exe: &Path, _process: &dyn LiveProcess) -> bool {
        !Self::accept_path(exe, &self.exeprefix)
    }

    fn should_track(&self, _exe: &Path, process: &dyn LiveProcess) -> bool {
        if !self.require_display {
            return true;
        }
        let always = process
            .name()
            .map(|name| self.always_track.contains(&name.to_lowercase()))
            .unwrap_or(false);
        always || process.has_display()
    }
}
