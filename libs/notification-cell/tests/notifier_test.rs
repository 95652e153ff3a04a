use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::services::email::EmailNotifier;
use notification_cell::services::gateway::GatewayClient;
use notification_cell::services::sms::SmsNotifier;
use notification_cell::{notifier_from_config, NotificationChannel, NotificationError, Notifier};
use shared_utils::test_utils::TestConfig;

#[tokio::test]
async fn email_is_posted_to_gateway() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_json(json!({
            "channel": "email",
            "recipient": "ana@clinic.example",
            "subject": "Appointment confirmed",
            "body": "See you Monday"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = EmailNotifier::new(Some(GatewayClient::new(format!("{}/messages", mock_server.uri()))));
    notifier
        .notify("ana@clinic.example", "Appointment confirmed", "See you Monday")
        .await
        .unwrap();
}

#[tokio::test]
async fn gateway_rejection_surfaces_as_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("smtp relay down"))
        .mount(&mock_server)
        .await;

    let notifier = SmsNotifier::new(Some(GatewayClient::new(mock_server.uri())));
    let result = notifier.notify("+34600111222", "Cancelled", "Your appointment was cancelled").await;

    assert_matches!(result, Err(NotificationError::Rejected { status: 500, .. }));
}

#[tokio::test]
async fn silent_gateway_is_cut_off_by_the_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let gateway = GatewayClient::new(mock_server.uri()).with_timeout(Duration::from_millis(200));
    let notifier = EmailNotifier::new(Some(gateway));

    let started = Instant::now();
    let result = notifier.notify("ana@clinic.example", "Appointment confirmed", "See you Monday").await;

    assert_matches!(result, Err(NotificationError::Transport(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn log_only_notifier_needs_a_recipient() {
    let notifier = EmailNotifier::new(None);

    assert!(notifier.notify("ana@clinic.example", "s", "b").await.is_ok());
    assert_matches!(notifier.notify("  ", "s", "b").await, Err(NotificationError::MissingRecipient));
}

#[tokio::test]
async fn channel_is_chosen_from_config() {
    let mut config = TestConfig::default().to_app_config();
    assert_eq!(notifier_from_config(&config).channel(), NotificationChannel::Email);

    config.notification_channel = NotificationChannel::Sms;
    assert_eq!(notifier_from_config(&config).channel(), NotificationChannel::Sms);
}
