//! End-to-end relay tests over a mock HTTP endpoint

use hookrelay::{
    ActivityLog, ClientRecord, Event, LogLevel, MemoryRepository, OrderRecord, RelayConfig,
    RelayError, RuleSettings, SendFormat, TicketRecord, TicketReplyRecord, WebhookRelay,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn repository() -> MemoryRepository {
    MemoryRepository::new()
        .with_ticket(TicketRecord {
            id: 501,
            number: Some("SUP-100045".into()),
            subject: Some("Billing question".into()),
            status: Some("Closed".into()),
            department_id: Some(2),
            client_id: Some(7),
            initial_message: Some("I was charged twice".into()),
            ..Default::default()
        })
        .with_department(2, "Billing")
        .with_ticket_reply(TicketReplyRecord {
            ticket_id: 501,
            admin: Some("John".into()),
            message: Some("Ticket resolved and closed".into()),
            ..Default::default()
        })
        .with_client(ClientRecord {
            id: 7,
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: Some("jane@x.com".into()),
            ..Default::default()
        })
}

async fn received_payload(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    serde_json::from_slice(&requests[0].body).unwrap()
}

#[tokio::test]
async fn ticket_closed_event_is_enriched_and_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let config = RelayConfig::new(format!("{}/hook", server.uri()));
    let relay = WebhookRelay::new(config, Arc::new(repository()));

    let event = Event::new(
        "Ticket Closed #SUP-100045",
        "Ticket has been closed by staff member John",
        "https://example.com/supporttickets.php?id=501",
    );

    let receipt = relay.notify(&event).await.unwrap();
    assert_eq!(receipt.status_code, 200);
    assert_eq!(receipt.body.as_deref(), Some("ok"));

    let payload = received_payload(&server).await;

    assert_eq!(payload["meta"]["category"], "ticket");
    assert_eq!(payload["meta"]["operation_code"], "ticket_closed");
    assert_eq!(payload["meta"]["operation_label"], "Ticket Closed");
    assert_eq!(payload["meta"]["source"], "hookrelay");

    assert_eq!(payload["ticket"]["id"], 501);
    assert_eq!(payload["ticket"]["tid"], "SUP-100045");
    assert_eq!(payload["ticket"]["operation_code"], "ticket_closed");
    assert_eq!(payload["ticket"]["department"], "Billing");

    // Client section back-filled from the ticket row.
    assert_eq!(payload["client"]["id"], 7);
    assert_eq!(payload["client"]["name"], "Jane Doe");
    assert_eq!(payload["client"]["email"], "jane@x.com");

    // Notification prefers the latest reply as its body.
    assert_eq!(payload["notification"]["subject"], "Billing question");
    assert_eq!(payload["notification"]["body"], "Ticket resolved and closed");
}

#[tokio::test]
async fn generic_event_carries_only_meta_and_notification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let config = RelayConfig::new(server.uri());
    let relay = WebhookRelay::new(config, Arc::new(MemoryRepository::new()));

    let event = Event::new("Hello", "Something happened", "https://example.com/index.php");
    relay.notify(&event).await.unwrap();

    let payload = received_payload(&server).await;
    let keys: Vec<&String> = payload.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["meta", "notification"]);
    assert_eq!(payload["meta"]["category"], "generic");
    assert_eq!(payload["meta"]["operation_code"], "generic_event");
}

#[tokio::test]
async fn delivery_failure_carries_status_and_truncated_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("e".repeat(2000)))
        .mount(&server)
        .await;

    let config = RelayConfig::new(server.uri());
    let relay = WebhookRelay::new(config, Arc::new(MemoryRepository::new()));

    let event = Event::new("T", "M", "");
    let err = relay.notify(&event).await.unwrap_err();

    match err {
        RelayError::DeliveryFailed { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body.chars().count(), 500);
            assert!(body.ends_with("..."));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn bearer_auth_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = RelayConfig::builder()
        .webhook_url(server.uri())
        .bearer_token("secret-token")
        .build();
    let relay = WebhookRelay::new(config, Arc::new(MemoryRepository::new()));

    relay.notify(&Event::new("T", "M", "")).await.unwrap();
}

#[tokio::test]
async fn custom_header_auth_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Hook-Key", "k123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = RelayConfig::builder()
        .webhook_url(server.uri())
        .header_token("X-Hook-Key", "k123")
        .build();
    let relay = WebhookRelay::new(config, Arc::new(MemoryRepository::new()));

    relay.notify(&Event::new("T", "M", "")).await.unwrap();
}

#[tokio::test]
async fn form_format_flattens_top_level_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = RelayConfig::builder()
        .webhook_url(server.uri())
        .send_format(SendFormat::Form)
        .build();
    let relay = WebhookRelay::new(config, Arc::new(MemoryRepository::new()));

    relay.notify(&Event::new("T", "M", "")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("meta="));
    assert!(body.contains("notification="));
}

#[tokio::test]
async fn rule_overrides_take_precedence() {
    let default_server = MockServer::start().await;
    let override_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&override_server)
        .await;

    let config = RelayConfig::builder()
        .webhook_url(default_server.uri())
        .message_template("provider: {message}")
        .build();
    let relay = WebhookRelay::new(config, Arc::new(MemoryRepository::new()));

    let rule = RuleSettings {
        webhook_url: Some(override_server.uri()),
        message_template: Some("{title} - {message}".to_string()),
    };

    let event = Event::new("Ticket Closed", "Your issue is resolved", "");
    relay.notify_with(&event, Some(&rule)).await.unwrap();

    assert!(default_server.received_requests().await.unwrap().is_empty());
    let payload = received_payload(&override_server).await;
    assert_eq!(
        payload["notification"]["message"],
        "Ticket Closed - Your issue is resolved"
    );
}

#[tokio::test]
async fn attribute_resolution_beats_url_pattern() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let repo = MemoryRepository::new()
        .with_ticket(TicketRecord {
            id: 42,
            subject: Some("From attribute".into()),
            ..Default::default()
        })
        .with_ticket(TicketRecord {
            id: 99,
            subject: Some("From URL".into()),
            ..Default::default()
        });

    let config = RelayConfig::new(server.uri());
    let relay = WebhookRelay::new(config, Arc::new(repo));

    let event = Event::new(
        "Ticket Updated",
        "status has been changed",
        "https://example.com/supporttickets.php?id=99",
    )
    .with_attribute("Ticket #", "42");

    relay.notify(&event).await.unwrap();

    let payload = received_payload(&server).await;
    assert_eq!(payload["ticket"]["id"], 42);
    assert_eq!(payload["ticket"]["subject"], "From attribute");
}

#[tokio::test]
async fn order_and_client_sections_coexist() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let repo = MemoryRepository::new()
        .with_order(OrderRecord {
            id: 12,
            number: Some("ORD-12".into()),
            status: Some("Pending".into()),
            client_id: Some(7),
            amount: Some("25.00".into()),
            ..Default::default()
        })
        .with_client(ClientRecord {
            id: 7,
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            ..Default::default()
        });

    let config = RelayConfig::new(server.uri());
    let relay = WebhookRelay::new(config, Arc::new(repo));

    let event = Event::new(
        "New Order",
        "A new order has been placed",
        "https://example.com/admin/orders.php?id=12",
    );
    relay.notify(&event).await.unwrap();

    let payload = received_payload(&server).await;
    assert_eq!(payload["meta"]["operation_code"], "order_new");
    assert_eq!(payload["order"]["ordernum"], "ORD-12");
    assert_eq!(payload["client"]["name"], "Jane Doe");
}

#[derive(Default)]
struct CapturingLog {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl ActivityLog for CapturingLog {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

#[tokio::test]
async fn debug_log_writes_one_line_per_attempt() {
    let ok_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&ok_server)
        .await;
    let down_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&down_server)
        .await;

    let log = Arc::new(CapturingLog::default());
    let config = RelayConfig::builder()
        .webhook_url(format!("{}/hook", ok_server.uri()))
        .debug_log(true)
        .build();
    let relay = WebhookRelay::new(config, Arc::new(MemoryRepository::new()))
        .with_activity_log(log.clone());

    relay.notify(&Event::new("T", "M", "")).await.unwrap();

    let rule = RuleSettings {
        webhook_url: Some(format!("{}/hook", down_server.uri())),
        message_template: None,
    };
    relay
        .notify_with(&Event::new("T", "M", ""), Some(&rule))
        .await
        .unwrap_err();

    let lines = log.lines.lock().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].0, LogLevel::Info);
    assert_eq!(lines[0].1, format!("HTTP 200 to {}/hook", ok_server.uri()));
    assert_eq!(lines[1].0, LogLevel::Warn);
    assert_eq!(lines[1].1, format!("HTTP 503 to {}/hook", down_server.uri()));
}

#[tokio::test]
async fn activity_log_stays_silent_without_debug_log() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let log = Arc::new(CapturingLog::default());
    let relay = WebhookRelay::new(
        RelayConfig::new(server.uri()),
        Arc::new(MemoryRepository::new()),
    )
    .with_activity_log(log.clone());

    relay.notify(&Event::new("T", "M", "")).await.unwrap();
    assert!(log.lines.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_posts_static_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = RelayConfig::new(server.uri());
    let relay = WebhookRelay::new(config, Arc::new(MemoryRepository::new()));

    let receipt = relay.test_connection().await.unwrap();
    assert_eq!(receipt.status_code, 200);

    let payload = received_payload(&server).await;
    assert_eq!(payload["meta"]["category"], "generic");
    assert_eq!(payload["meta"]["operation_code"], "test");
    assert_eq!(payload["meta"]["operation_label"], "Test Connection");
}
