//! One-off playlist requests from the request layer
//!
//! A bounded queue between request handlers and the scheduler. Handlers
//! wait at most the configured send timeout for room in the queue, and no
//! build result is reported back once a request is accepted.
//!
//! With room in the queue a handler returns without waiting for the
//! scheduler. A capacity of 1 is the closest match to a hand-off where the
//! sender waits until the scheduler is ready to take the request.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::error::TriggerError;

/// Sending half handed to request handlers
#[derive(Debug, Clone)]
pub struct PlaylistTrigger {
    tx: mpsc::Sender<String>,
    send_timeout: Duration,
}

/// Create the trigger queue
///
/// The receiver goes to [`PlaylistScheduler::run`](crate::PlaylistScheduler::run).
/// A capacity of zero is treated as one.
pub fn trigger_channel(
    capacity: usize,
    send_timeout: Duration,
) -> (PlaylistTrigger, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PlaylistTrigger { tx, send_timeout }, rx)
}

impl PlaylistTrigger {
    /// Ask for a one-off playlist for `user_id`
    ///
    /// # Errors
    /// - `TriggerError::Timeout` - If the queue stayed full for the send timeout
    /// - `TriggerError::Closed` - If the scheduler has exited
    pub async fn request(&self, user_id: impl Into<String>) -> Result<(), TriggerError> {
        let user_id = user_id.into();
        tracing::debug!(user_id = %user_id, "Queueing one-off playlist request");

        self.tx
            .send_timeout(user_id, self.send_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => TriggerError::Timeout(self.send_timeout),
                SendTimeoutError::Closed(_) => TriggerError::Closed,
            })
    }

    /// Configured enqueue timeout
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Whether the scheduler has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
