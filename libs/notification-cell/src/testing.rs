//! In-process notifiers for exercising callers.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{NotificationChannel, NotificationError};
use crate::services::Notifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Records every message; fails every call when built with `failing()`.
pub struct RecordingNotifier {
    channel: NotificationChannel,
    fail: bool,
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::with_channel(NotificationChannel::Email)
    }

    pub fn with_channel(channel: NotificationChannel) -> Self {
        Self {
            channel,
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }

    /// Waits up to a second for at least `count` messages, for callers that
    /// deliver from a background task. Returns whatever arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<SentNotification> {
        for _ in 0..100 {
            let sent = self.sent().await;
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent().await
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Transport("gateway down".to_string()));
        }
        self.sent.lock().await.push(SentNotification {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
