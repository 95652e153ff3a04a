use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error};

use crate::models::{NotificationError, OutboundMessage};

/// HTTP relay for outbound messages. Both notifier variants share it.
pub struct GatewayClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl GatewayClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound for a single delivery, connection included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotificationError> {
        debug!("Posting {} notification to gateway {}", message.channel, self.url);

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Transport(format!("gateway did not answer within {:?}", self.timeout))
                } else {
                    NotificationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Notification gateway rejected message: {} - {}", status, text);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(())
    }
}
