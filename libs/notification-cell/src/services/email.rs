use async_trait::async_trait;
use tracing::info;

use crate::models::{channel_name, NotificationChannel, NotificationError, OutboundMessage};
use crate::services::gateway::GatewayClient;
use crate::services::Notifier;

pub struct EmailNotifier {
    gateway: Option<GatewayClient>,
}

impl EmailNotifier {
    pub fn new(gateway: Option<GatewayClient>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Email
    }

    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        if recipient.trim().is_empty() {
            return Err(NotificationError::MissingRecipient);
        }

        match &self.gateway {
            Some(gateway) => {
                let message = OutboundMessage {
                    channel: channel_name(self.channel()).to_string(),
                    recipient: recipient.to_string(),
                    subject: subject.to_string(),
                    body: body.to_string(),
                };
                gateway.deliver(&message).await?;
                info!("Email sent to {}: {}", recipient, subject);
            }
            None => {
                info!(recipient, subject, body, "Email (log only)");
            }
        }

        Ok(())
    }
}
