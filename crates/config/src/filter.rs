use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Filter {
    /// A list of path prefixes deciding which executables may produce usage
    /// events. The longest prefix matching the executable path wins. If it
    /// starts with an exclamation mark the executable is excluded, otherwise
    /// it is accepted. Executables matching no prefix are accepted.
    ///
    /// For example `["!/usr/lib/", "/usr/lib/firefox/"]` excludes helpers
    /// living under `/usr/lib` except for the ones shipped with firefox.
    ///
    /// # Note
    ///
    /// `/lib` matches `/lib`, `/lib64` and `/libexec`. Use `/lib/` when only
    /// the directory itself is meant.
    pub exeprefix: Vec<PathBuf>,

    /// Only treat a process as a user application once it is attached to a
    /// graphical session, i.e. its environment carries `DISPLAY` or
    /// `WAYLAND_DISPLAY`. Processes failing the check are re-evaluated every
    /// tick until they pass or exit.
    pub require_display: bool,

    /// Process names (compared case-insensitively) that are tracked even
    /// without a graphical session.
    pub always_track: Vec<String>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            exeprefix: vec![
                PathBuf::from("!/lib/"),
                PathBuf::from("!/sbin/"),
                PathBuf::from("!/usr/lib/"),
                PathBuf::from("!/usr/libexec/"),
                PathBuf::from("!/usr/sbin/"),
            ],
            require_display: true,
            always_track: Vec::new(),
        }
    }
}
