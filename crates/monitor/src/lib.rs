#![forbid(unsafe_code)]

pub mod classify;
pub mod clock;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod reset;
pub mod snapshot;
pub mod stores;

pub use classify::{
    AppFilter, Classification, DefaultAppFilter, ExcludeReason, RetryReason, classify,
};
pub use clock::{Clock, SystemClock};
pub use engine::{ControlEvent, Monitor, ReconcileReport, ReloadBundle, Services, TickReport};
pub use error::Error;
pub use persistence::{
    AppEvent, EventSink, EventStore, EventWrite, NoopStore, OpenEvent, SqliteEventSink,
    SqliteStore,
};
pub use reset::{ResetHandle, ResetReceiver, reset_channel};
pub use snapshot::{LiveProcess, ProcfsProcess, ProcfsSource, Snapshot, SnapshotSource};
pub use stores::{LoggedApps, RunningSet};
