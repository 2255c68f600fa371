use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorSection {
    /// Time between two process snapshots. Every tick the monitor closes
    /// events for processes that exited and classifies processes it has not
    /// seen before. **Measured in seconds**.
    ///
    /// ## Note
    ///
    /// Short-lived processes that start and exit between two ticks are never
    /// observed. Lowering the interval catches more of them at the cost of
    /// more frequent `/proc` walks.
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub interval: Duration,

    /// Close stale open events and re-seed the in-memory state from the
    /// database before the first tick.
    pub reconcile_on_start: bool,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            reconcile_on_start: true,
        }
    }
}
