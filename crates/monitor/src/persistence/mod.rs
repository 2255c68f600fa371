#![forbid(unsafe_code)]

mod event;
mod repo;
mod sink;

pub use event::{AppEvent, EventWrite, OpenEvent};
pub use repo::{EventStore, MIGRATOR, NoopStore, SqliteStore};
pub use sink::{EventSink, SqliteEventSink};
