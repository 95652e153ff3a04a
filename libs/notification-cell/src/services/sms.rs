use async_trait::async_trait;
use tracing::info;

use crate::models::{channel_name, NotificationChannel, NotificationError, OutboundMessage};
use crate::services::gateway::GatewayClient;
use crate::services::Notifier;

const MAX_SMS_CHARS: usize = 160;

/// Text messages carry no subject line; it is folded into the body.
pub struct SmsNotifier {
    gateway: Option<GatewayClient>,
}

impl SmsNotifier {
    pub fn new(gateway: Option<GatewayClient>) -> Self {
        Self { gateway }
    }

    fn compose(subject: &str, body: &str) -> String {
        let text = format!("{}: {}", subject, body);
        if text.chars().count() <= MAX_SMS_CHARS {
            return text;
        }
        let mut cut: String = text.chars().take(MAX_SMS_CHARS - 3).collect();
        cut.push_str("...");
        cut
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Sms
    }

    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        if recipient.trim().is_empty() {
            return Err(NotificationError::MissingRecipient);
        }

        let text = Self::compose(subject, body);

        match &self.gateway {
            Some(gateway) => {
                let message = OutboundMessage {
                    channel: channel_name(self.channel()).to_string(),
                    recipient: recipient.to_string(),
                    subject: subject.to_string(),
                    body: text,
                };
                gateway.deliver(&message).await?;
                info!("SMS sent to {}", recipient);
            }
            None => {
                info!(recipient, text = %text, "SMS (log only)");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_messages_are_truncated() {
        let text = SmsNotifier::compose("Appointment confirmed", &"x".repeat(300));
        assert_eq!(text.chars().count(), MAX_SMS_CHARS);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn short_messages_keep_subject() {
        assert_eq!(SmsNotifier::compose("Hi", "see you"), "Hi: see you");
    }
}
