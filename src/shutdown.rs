//! Shutdown signalling
//!
//! A shutdown request is delivered by dropping the only sender of a
//! crossbeam channel. Every clone of the token then sees a disconnected
//! channel, which makes waits on it both cancellable and sticky.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;
use tracing::info;

/// A wait that can be cut short by a shutdown request
pub trait Waiter {
    /// Wait for `delay`. Returns `false` if shutdown was requested before or
    /// during the wait.
    fn wait(&mut self, delay: Duration) -> bool;

    fn shutdown_requested(&self) -> bool;
}

/// Fires the shutdown request when triggered or dropped
pub struct ShutdownTrigger {
    sender: Option<Sender<()>>,
}

impl ShutdownTrigger {
    pub fn trigger(&mut self) {
        self.sender.take();
    }
}

/// Observes the shutdown request
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    receiver: Receiver<()>,
}

impl ShutdownToken {
    pub fn is_triggered(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }
}

impl Waiter for ShutdownToken {
    fn wait(&mut self, delay: Duration) -> bool {
        match self.receiver.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => true,
            // Nothing is ever sent, so any other outcome is the trigger
            _ => false,
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.is_triggered()
    }
}

/// Create a connected trigger/token pair
pub fn channel() -> (ShutdownTrigger, ShutdownToken) {
    let (sender, receiver) = bounded(0);
    (
        ShutdownTrigger {
            sender: Some(sender),
        },
        ShutdownToken { receiver },
    )
}

/// Trigger shutdown on SIGINT, SIGTERM or SIGHUP
pub fn install_signal_handler() -> Result<ShutdownToken> {
    let (mut trigger, token) = channel();
    ctrlc::set_handler(move || {
        info!("Termination signal received, shutting down");
        trigger.trigger();
    })
    .context("failed to install signal handler")?;
    Ok(token)
}
