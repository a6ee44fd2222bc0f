//! GitHub webhook payloads and the notification text derived from them.

use serde::Deserialize;

use crate::http::WebhookError;

pub const PUSH_EVENT: &str = "push";

/// Sent by `GET /test_dm` to check the delivery path end to end.
pub const TEST_MESSAGE: &str = "Test DM from pushnote: the relay is up and delivering.";

#[derive(Debug, Deserialize)]
pub struct PushPayload {
    pub repository: Repository,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// The parts of an inbound delivery the relay looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub event_type: Option<String>,
    pub repository_full_name: String,
}

impl WebhookEvent {
    pub fn parse(event_type: Option<&str>, body: &[u8]) -> Result<Self, WebhookError> {
        let payload: PushPayload =
            serde_json::from_slice(body).map_err(WebhookError::MalformedPayload)?;
        Ok(Self {
            event_type: event_type.map(str::to_string),
            repository_full_name: payload.repository.full_name,
        })
    }

    pub fn is_push(&self) -> bool {
        self.event_type.as_deref() == Some(PUSH_EVENT)
    }

    /// Text to deliver for this event, if it is one the relay forwards.
    pub fn notification(&self) -> Option<String> {
        self.is_push()
            .then(|| push_message(&self.repository_full_name))
    }
}

pub fn push_message(full_name: &str) -> String {
    format!("New push landed, go take a look!\nIt's right here: {full_name}.")
}
