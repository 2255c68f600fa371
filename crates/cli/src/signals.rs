//! Translate Unix signals into daemon events.

use tokio::signal::unix::{SignalKind, signal};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// `SIGUSR1`: log the current configuration and state counters.
    DumpStatus,
    /// `SIGHUP`: re-read the configuration files.
    ReloadConfig,
    /// `SIGUSR2`: delete the recorded history and reset the monitor.
    ClearHistory,
    /// `SIGINT` or `SIGTERM`.
    Shutdown,
}

/// Forward signals to `tx` until the receiving side goes away.
pub async fn wait_for_signal(tx: flume::Sender<SignalEvent>) -> anyhow::Result<()> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;

    loop {
        let event = tokio::select! {
            _ = usr1.recv() => SignalEvent::DumpStatus,
            _ = usr2.recv() => SignalEvent::ClearHistory,
            _ = hup.recv() => SignalEvent::ReloadConfig,
            _ = int.recv() => SignalEvent::Shutdown,
            _ = term.recv() => SignalEvent::Shutdown,
        };
        debug!(?event, "signal received");
        if tx.send_async(event).await.is_err() {
            return Ok(());
        }
    }
}
