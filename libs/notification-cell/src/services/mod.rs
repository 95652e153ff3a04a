pub mod email;
pub mod gateway;
pub mod sms;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use shared_config::AppConfig;

use crate::models::{NotificationChannel, NotificationError};
use email::EmailNotifier;
use gateway::GatewayClient;
use sms::SmsNotifier;

/// Best-effort delivery of a single message. Callers decide what a failure means.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> NotificationChannel;

    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotificationError>;
}

/// Picks the process-wide notifier once, at startup.
pub fn notifier_from_config(config: &AppConfig) -> Arc<dyn Notifier> {
    let gateway = config
        .notification_gateway_url
        .as_deref()
        .map(|url| GatewayClient::new(url).with_timeout(Duration::from_secs(config.notification_timeout_secs)));

    info!(
        "Notifications via {:?} ({})",
        config.notification_channel,
        if gateway.is_some() { "gateway" } else { "log only" }
    );

    match config.notification_channel {
        NotificationChannel::Email => Arc::new(EmailNotifier::new(gateway)),
        NotificationChannel::Sms => Arc::new(SmsNotifier::new(gateway)),
    }
}
