//! Cancellation for long-lived background tasks.
//!
//! A [`ShutdownTrigger`] flips a watch channel once; every cloned
//! [`ShutdownToken`] observes it, including tokens that start waiting after
//! the trigger fired.

use tokio::sync::watch;

/// Create a connected trigger/token pair
#[must_use]
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownToken { rx })
}

/// Owner side: fires the shutdown signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signal every token. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has been sent
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Hand out another token
    #[must_use]
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Task side: waits for the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Whether shutdown has been signalled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is signalled.
    ///
    /// Also resolves when the trigger is dropped, so orphaned tasks stop.
    pub async fn cancelled(&mut self) {
        // wait_for checks the current value first
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}
