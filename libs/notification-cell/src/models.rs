use serde::{Deserialize, Serialize};

pub use shared_config::NotificationChannel;

/// Payload posted to the delivery gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum NotificationError {
    #[error("Recipient address is empty")]
    MissingRecipient,

    #[error("Gateway rejected message: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Gateway unreachable: {0}")]
    Transport(String),
}

pub fn channel_name(channel: NotificationChannel) -> &'static str {
    match channel {
        NotificationChannel::Email => "email",
        NotificationChannel::Sms => "sms",
    }
}
