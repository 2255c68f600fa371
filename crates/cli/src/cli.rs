use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use config::Config;
use std::path::{Path, PathBuf};
use tracing::trace;

const DEFAULT_CONFIG: &str = "/etc/appwatch/config.toml";
const DEFAULT_CONFIG_DIR_GLOB: &str = "/etc/appwatch/config.d/*.toml";

/// appwatch: application usage monitor
///
/// appwatch watches processes come and go and records when user-facing
/// applications are started and closed. Every application is recorded once
/// per session, no matter how many instances are running.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// If not provided, the default locations are checked. They are
    /// `/etc/appwatch/config.toml` and `/etc/appwatch/config.d/*.toml`,
    /// where the latter being a glob pattern. If they don't exist, the default
    /// configuration is used.
    #[arg(short, long, value_parser = validate_file)]
    pub conffile: Option<PathBuf>,

    /// Database to record usage events in. Overrides the configuration.
    #[arg(short, long, conflicts_with = "in_memory")]
    pub database: Option<PathBuf>,

    /// Keep events in memory only, nothing is written to disk.
    #[arg(long)]
    pub in_memory: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

impl Cli {
    /// Load the configuration from the given or the default locations and
    /// apply command line overrides. Called again on every reload.
    pub fn load_config(&self) -> Result<Config, config::Error> {
        let mut config = match &self.conffile {
            Some(path) => Config::load(path)?,
            None => Config::load_multiple(default_candidates())?,
        };
        if self.in_memory {
            config.persistence.database = PathBuf::new();
        } else if let Some(database) = &self.database {
            config.persistence.database = database.clone();
        }
        Ok(config)
    }
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = glob::glob(DEFAULT_CONFIG_DIR_GLOB)
        .map(|paths| paths.filter_map(Result::ok).collect::<Vec<_>>())
        .unwrap_or_default();
    candidates.sort();
    candidates.insert(0, DEFAULT_CONFIG.into());
    trace!(?candidates, "config file candidates");
    candidates
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn missing_conffile_is_rejected() {
        let result = Cli::try_parse_from(["appwatch", "--conffile", "/nonexistent/appwatch.toml"]);
        assert!(result.is_err());
    }

    #[test]
    fn database_and_in_memory_conflict() {
        let result = Cli::try_parse_from(["appwatch", "--database", "a.db", "--in-memory"]);
        assert!(result.is_err());
    }

    #[test]
    fn overrides_apply_on_top_of_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[monitor]\ninterval = 7\n[persistence]\ndatabase = \"/var/lib/x.db\"\n",
        )
        .unwrap();
        let conffile = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["appwatch", "-c", conffile, "-d", "/tmp/other.db"]).unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.monitor.interval, Duration::from_secs(7));
        assert_eq!(config.persistence.database, PathBuf::from("/tmp/other.db"));

        let cli = Cli::try_parse_from(["appwatch", "-c", conffile, "--in-memory"]).unwrap();
        let config = cli.load_config().unwrap();
        assert!(config.persistence.database.as_os_str().is_empty());

        let cli = Cli::try_parse_from(["appwatch", "-c", conffile]).unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.persistence.database, PathBuf::from("/var/lib/x.db"));
    }
}
