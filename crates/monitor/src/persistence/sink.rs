#![forbid(unsafe_code)]

use crate::persistence::EventWrite;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

pub trait EventSink: Send + Sync {
    /// Queue a write. Returns immediately; the outcome is never reported back.
    fn enqueue(&self, write: EventWrite);
}

/// Feeds writes to a single background task, so they hit the database in
/// the order they were queued.
#[derive(Debug, Clone)]
pub struct SqliteEventSink {
    tx: mpsc::UnboundedSender<EventWrite>,
}

impl SqliteEventSink {
    /// Spawn the writer task. It stops once every clone of the sink is dropped
    /// and the queue is drained.
    pub fn spawn(pool: SqlitePool) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Self::writer_loop(pool, rx));
        (Self { tx }, handle)
    }

    async fn writer_loop(pool: SqlitePool, mut rx: mpsc::UnboundedReceiver<EventWrite>) {
        while let Some(write) = rx.recv().await {
            match (write.execute(&pool).await, &write) {
                (Ok(removed), EventWrite::ClearHistory) => info!(removed, "history cleared"),
                (Ok(rows), _) => trace!(pid = ?write.pid(), rows, "app event persisted"),
                (Err(err), _) => warn!(pid = ?write.pid(), %err, "failed to persist app event"),
            }
        }
        debug!("event writer stopped");
    }
}

impl EventSink for SqliteEventSink {
    fn enqueue(&self, write: EventWrite) {
        if let Err(err) = self.tx.send(write) {
            warn!(pid = ?err.0.pid(), "event writer is gone, dropping write");
        }
    }
}
