//! `RelayTransport` against a local stand-in relay.
//!
//! The stand-in answers with the status encoded in the endpoint's last path
//! segment (`…/status-410` → 410) and records what it received.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};

use beacon_common::types::Subscription;
use beacon_notifier::{
    DeliveryOptions, DeliveryProfile, FailureClassification, PushCredentials, PushTransport,
    RelayTransport, Urgency,
};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
}

async fn relay_send(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, &'static str) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let endpoint = body["subscription"]["endpoint"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    recorded.requests.lock().unwrap().push((auth, body));

    if endpoint.ends_with("/slow") {
        tokio::time::sleep(Duration::from_secs(5)).await;
        return (StatusCode::CREATED, "");
    }

    let status = endpoint
        .rsplit_once("/status-")
        .and_then(|(_, code)| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::CREATED);

    let detail = if status.is_success() { "" } else { "push service rejected" };
    (status, detail)
}

async fn start_relay() -> (SocketAddr, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/send", post(relay_send))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, recorded)
}

fn transport(addr: SocketAddr, token: Option<&str>) -> RelayTransport {
    RelayTransport::new(
        &format!("http://{}", addr),
        Arc::new(PushCredentials {
            vapid_subject: "mailto:ops@example.com".to_string(),
            vapid_public_key: "BPublicKey".to_string(),
            relay_token: token.map(str::to_string),
        }),
    )
    .unwrap()
}

fn sub(endpoint: &str) -> Subscription {
    Subscription::new(endpoint, "p256dh-key", "auth-secret")
}

#[tokio::test]
async fn test_accepted_delivery() {
    let (addr, recorded) = start_relay().await;
    let transport = transport(addr, Some("relay-secret"));
    let options = DeliveryProfile::Restrictive.delivery_options();

    transport
        .send(
            &sub("https://web.push.apple.com/QGr0ok"),
            r#"{"title":"t","body":"b"}"#,
            &options,
        )
        .await
        .unwrap();

    let requests = recorded.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer relay-secret"));
    assert_eq!(body["subscription"]["keys"]["auth"], "auth-secret");
    assert_eq!(body["payload"], r#"{"title":"t","body":"b"}"#);
    assert_eq!(body["options"]["urgency"], "high");
    assert_eq!(body["options"]["headers"]["apns-push-type"], "alert");
    assert_eq!(body["options"]["vapid"]["subject"], "mailto:ops@example.com");
}

#[tokio::test]
async fn test_gone_status_is_classified_gone() {
    let (addr, _) = start_relay().await;
    let transport = transport(addr, None);
    let endpoint = "https://fcm.googleapis.com/fcm/send/status-410";

    let err = transport
        .send(
            &sub(endpoint),
            "{}",
            &DeliveryProfile::Standard.delivery_options(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.classification, FailureClassification::Gone);
    assert_eq!(err.status_code, Some(410));
    assert_eq!(err.endpoint, endpoint);
    assert!(err.message.contains("push service rejected"));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let (addr, recorded) = start_relay().await;
    let transport = transport(addr, None);

    let err = transport
        .send(
            &sub("https://fcm.googleapis.com/fcm/send/status-503"),
            "{}",
            &DeliveryProfile::Standard.delivery_options(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.classification, FailureClassification::Retryable);
    assert_eq!(err.status_code, Some(503));
    // No bearer token configured
    assert_eq!(recorded.requests.lock().unwrap()[0].0, None);
}

#[tokio::test]
async fn test_slow_relay_times_out_as_retryable() {
    let (addr, _) = start_relay().await;
    let transport = transport(addr, None);
    let options = DeliveryOptions {
        timeout: Duration::from_millis(100),
        ttl_seconds: 60,
        urgency: Urgency::Normal,
        headers: BTreeMap::new(),
    };

    let err = transport
        .send(&sub("https://fcm.googleapis.com/fcm/send/slow"), "{}", &options)
        .await
        .unwrap_err();

    assert_eq!(err.classification, FailureClassification::Retryable);
    assert_eq!(err.status_code, None);
}

#[tokio::test]
async fn test_unreachable_relay_is_retryable() {
    // Bind and drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = transport(addr, None)
        .send(
            &sub("https://fcm.googleapis.com/fcm/send/x"),
            "{}",
            &DeliveryProfile::Standard.delivery_options(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.classification, FailureClassification::Retryable);
    assert_eq!(err.status_code, None);
}
