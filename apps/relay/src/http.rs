use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metrics::counter;
use pn_core::{DeliveryJob, DeliveryQueue};
use security::{EVENT_HEADER, SIGNATURE_HEADER, verify_signature};
use serde_json::{Value, json};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::events::{TEST_MESSAGE, WebhookEvent};

const WEBHOOKS: &str = "pushnote_webhooks_total";

/// GitHub caps webhook payloads at 25 MB.
pub const MAX_WEBHOOK_BYTES: usize = 25 * 1024 * 1024;

pub const TEST_DM_CONFIRMATION: &str = "Test DM queued for delivery.";

/// Dependencies shared by every request handler.
#[derive(Clone)]
pub struct RelayState {
    pub queue: DeliveryQueue,
    pub secret: Option<Arc<str>>,
}

impl RelayState {
    pub fn new(queue: DeliveryQueue, secret: Option<String>) -> Self {
        Self {
            queue,
            secret: secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook signature rejected")]
    Unauthorized,
    #[error("malformed webhook payload")]
    MalformedPayload(#[source] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            WebhookError::MalformedPayload(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "malformed webhook payload",
            )
                .into_response(),
        }
    }
}

pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/test_dm", get(test_dm))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Verifies, parses and (for pushes) enqueues. Never waits on delivery.
pub async fn webhook(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let signature = header_str(&headers, SIGNATURE_HEADER);
    if !verify_signature(state.secret.as_deref(), signature, &body) {
        counter!(WEBHOOKS, "outcome" => "unauthorized").increment(1);
        tracing::warn!(has_signature = signature.is_some(), "invalid webhook signature");
        return Err(WebhookError::Unauthorized);
    }

    let event =
        WebhookEvent::parse(header_str(&headers, EVENT_HEADER), &body).inspect_err(|err| {
            counter!(WEBHOOKS, "outcome" => "malformed").increment(1);
            tracing::error!(error = %err, bytes = body.len(), "failed to decode webhook payload");
        })?;

    let event_type = event.event_type.as_deref().unwrap_or("<none>");
    match event.notification() {
        Some(text) => {
            state.queue.enqueue(DeliveryJob::new(text));
            counter!(WEBHOOKS, "outcome" => "queued").increment(1);
            tracing::info!(
                event = event_type,
                repo = %event.repository_full_name,
                "push notification queued"
            );
        }
        None => {
            counter!(WEBHOOKS, "outcome" => "ignored").increment(1);
            tracing::debug!(
                event = event_type,
                repo = %event.repository_full_name,
                "ignoring webhook event"
            );
        }
    }

    Ok(Json(json!({ "status": "ok" })))
}

/// Manual liveness check for the delivery path.
pub async fn test_dm(State(state): State<RelayState>) -> &'static str {
    state.queue.enqueue(DeliveryJob::new(TEST_MESSAGE));
    tracing::info!("test notification queued");
    TEST_DM_CONFIRMATION
}

async fn healthz() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
