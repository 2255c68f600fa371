#![forbid(unsafe_code)]

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{trace, warn};

/// Create the one-slot signal asking the monitor to forget its in-memory state.
pub fn reset_channel() -> (ResetHandle, ResetReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (ResetHandle { tx }, ResetReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct ResetHandle {
    tx: mpsc::Sender<()>,
}

impl ResetHandle {
    /// Request a reset without waiting. Returns `false` when a reset is
    /// already pending (the requests coalesce) or the monitor is gone.
    pub fn raise(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                trace!("reset already pending");
                false
            }
            Err(TrySendError::Closed(())) => {
                warn!("monitor is not running, reset dropped");
                false
            }
        }
    }
}

#[derive(Debug)]
pub struct ResetReceiver {
    rx: mpsc::Receiver<()>,
}

impl ResetReceiver {
    /// Wait for the next reset. `None` once every handle is dropped.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bursts_coalesce_into_one_reset() {
        let (handle, mut rx) = reset_channel();
        let other = handle.clone();

        assert!(handle.raise());
        assert!(!other.raise());
        assert!(!handle.raise());

        assert_eq!(rx.recv().await, Some(()));
        // The slot is free again once the reset was consumed.
        assert!(other.raise());
        drop(handle);
        drop(other);

        assert_eq!(rx.recv().await, Some(()));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn raise_after_receiver_dropped_is_a_noop() {
        let (handle, rx) = reset_channel();
        drop(rx);
        assert!(!handle.raise());
    }

    #[tokio::test]
    async fn recv_ends_when_handles_are_gone() {
        let (handle, mut rx) = reset_channel();
        handle.raise();
        drop(handle);
        assert_eq!(rx.recv().await, Some(()));
        assert_eq!(rx.recv().await, None);
    }
}
