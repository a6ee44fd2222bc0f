use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use pn_core::DeliveryQueue;
use pn_relay::events::{TEST_MESSAGE, push_message};
use pn_relay::http::TEST_DM_CONFIRMATION;
use pn_relay::{RelayState, build_router};
use serde_json::Value;
use tower::ServiceExt;

const PUSH_BODY: &str = r#"{"ref":"refs/heads/main","repository":{"full_name":"acme/widgets"}}"#;

fn app(secret: Option<&str>) -> (Router, DeliveryQueue) {
    let queue = DeliveryQueue::new();
    let router = build_router(RelayState::new(queue.clone(), secret.map(str::to_string)));
    (router, queue)
}

fn webhook_request(event: Option<&str>, signature: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json");
    if let Some(event) = event {
        builder = builder.header("X-GitHub-Event", event);
    }
    if let Some(signature) = signature {
        builder = builder.header("X-Hub-Signature-256", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_bytes(resp: Response) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

fn drain(queue: &DeliveryQueue) -> Vec<String> {
    std::iter::from_fn(|| queue.try_dequeue())
        .map(|job| job.into_text())
        .collect()
}

#[tokio::test]
async fn push_without_secret_is_queued() {
    let (app, queue) = app(None);
    let resp = app
        .oneshot(webhook_request(Some("push"), None, PUSH_BODY))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok" }));

    let jobs = drain(&queue);
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].contains("acme/widgets"));
    assert_eq!(jobs[0], push_message("acme/widgets"));
}

#[tokio::test]
async fn other_events_are_acknowledged_but_ignored() {
    let (app, queue) = app(None);
    let resp = app
        .oneshot(webhook_request(Some("pull_request"), None, PUSH_BODY))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(queue.is_empty());
}

#[tokio::test]
async fn missing_event_header_is_ignored() {
    let (app, queue) = app(None);
    let resp = app
        .oneshot(webhook_request(None, None, PUSH_BODY))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn signature_from_other_secret_is_rejected() {
    let (app, queue) = app(Some("s3cr3t"));
    let forged = security::sign("not-the-secret", PUSH_BODY.as_bytes()).unwrap();
    let resp = app
        .oneshot(webhook_request(Some("push"), Some(&forged), PUSH_BODY))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(body_bytes(resp).await.is_empty());
    assert!(queue.is_empty());
}

#[tokio::test]
async fn missing_signature_is_rejected_when_secret_configured() {
    let (app, queue) = app(Some("s3cr3t"));
    let resp = app
        .oneshot(webhook_request(Some("push"), None, PUSH_BODY))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn valid_signature_is_accepted() {
    let (app, queue) = app(Some("s3cr3t"));
    let signature = security::sign("s3cr3t", PUSH_BODY.as_bytes()).unwrap();
    let resp = app
        .oneshot(webhook_request(Some("push"), Some(&signature), PUSH_BODY))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn signature_is_checked_before_payload() {
    let (app, queue) = app(Some("s3cr3t"));
    let resp = app
        .oneshot(webhook_request(Some("push"), Some("sha256=00"), "not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn malformed_payload_is_a_server_error() {
    let (app, queue) = app(None);
    let resp = app
        .clone()
        .oneshot(webhook_request(Some("push"), None, "{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = app
        .oneshot(webhook_request(
            Some("push"),
            None,
            r#"{"repository":{"name":"widgets"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_dm_queues_fixed_message() {
    let (app, queue) = app(Some("s3cr3t"));
    let req = Request::builder()
        .uri("/test_dm")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(resp).await).unwrap();
    assert_eq!(body, TEST_DM_CONFIRMATION);
    assert_eq!(drain(&queue), vec![TEST_MESSAGE.to_string()]);
}

#[tokio::test]
async fn pushes_are_queued_in_request_order() {
    let (app, queue) = app(None);
    for repo in ["acme/one", "acme/two", "acme/three"] {
        let body = format!(r#"{{"repository":{{"full_name":"{repo}"}}}}"#);
        let resp = app
            .clone()
            .oneshot(webhook_request(Some("push"), None, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let jobs = drain(&queue);
    assert_eq!(
        jobs,
        vec![
            push_message("acme/one"),
            push_message("acme/two"),
            push_message("acme/three"),
        ]
    );
}

#[tokio::test]
async fn healthz_reports_no_content() {
    let (app, _queue) = app(None);
    let req = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn large_signed_push_is_accepted() {
    let (app, queue) = app(Some("s3cr3t"));
    let filler = "x".repeat(3 * 1024 * 1024);
    let body = format!(r#"{{"repository":{{"full_name":"acme/widgets"}},"filler":"{filler}"}}"#);
    let signature = security::sign("s3cr3t", body.as_bytes()).unwrap();
    let resp = app
        .oneshot(webhook_request(Some("push"), Some(&signature), &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(drain(&queue), vec![push_message("acme/widgets")]);
}
