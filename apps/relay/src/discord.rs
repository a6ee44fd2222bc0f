//! Discord-backed [`NotificationSession`] using the bot REST API.

use async_trait::async_trait;
use pn_core::{
    NotificationSession, ReadySignal, ReadyState, RecipientHandle, RecipientId, SessionError,
    SessionResult,
};
use reqwest::{Client, Response, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

pub struct DiscordSession {
    http: Client,
    api_base: String,
    auth_header: String,
    signal: ReadySignal,
}

impl DiscordSession {
    pub fn new(http: Client, api_base: impl Into<String>, token: &str) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            auth_header: format!("Bot {token}"),
            signal: ReadySignal::new(),
        }
    }

    /// Performs the login handshake and publishes the resulting state.
    ///
    /// A failed handshake is terminal; there is no reconnect.
    pub async fn connect(&self) -> SessionResult<()> {
        self.signal.set(ReadyState::Connecting);
        match self.handshake().await {
            Ok(user) => {
                tracing::info!(bot = %user.username, bot_id = %user.id, "logged in to discord");
                self.signal.set(ReadyState::Ready);
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "discord handshake failed");
                self.signal.set(ReadyState::Failed);
                Err(SessionError::Failed {
                    reason: err.to_string(),
                })
            }
        }
    }

    async fn handshake(&self) -> SessionResult<CurrentUser> {
        if self.is_mock() {
            return Ok(CurrentUser {
                id: "0".into(),
                username: "mock".into(),
            });
        }
        let response = self
            .http
            .get(self.endpoint("users/@me"))
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(SessionError::transport)?;
        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(SessionError::transport)
    }

    fn ensure_ready(&self) -> SessionResult<()> {
        match self.signal.state() {
            ReadyState::Ready => Ok(()),
            _ => Err(SessionError::NotReady),
        }
    }

    fn is_mock(&self) -> bool {
        self.api_base.starts_with("mock://")
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl NotificationSession for DiscordSession {
    fn state(&self) -> ReadyState {
        self.signal.state()
    }

    async fn await_ready(&self) -> SessionResult<()> {
        self.signal.wait_ready().await
    }

    async fn resolve_recipient(&self, id: &RecipientId) -> SessionResult<RecipientHandle> {
        self.ensure_ready()?;
        if self.is_mock() {
            return Ok(RecipientHandle::new(id.as_str()));
        }

        let response = self
            .http
            .post(self.endpoint("users/@me/channels"))
            .header(AUTHORIZATION, &self.auth_header)
            .json(&json!({ "recipient_id": id.as_str() }))
            .send()
            .await
            .map_err(SessionError::transport)?;
        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND
        ) {
            return Err(SessionError::RecipientNotFound {
                recipient: id.to_string(),
            });
        }
        let channel: DmChannel = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(SessionError::transport)?;
        tracing::debug!(recipient = %id, channel = %channel.id, "resolved dm channel");
        Ok(RecipientHandle::new(channel.id))
    }

    async fn deliver(&self, recipient: &RecipientHandle, text: &str) -> SessionResult<()> {
        self.ensure_ready()?;
        if self.is_mock() {
            tracing::info!(channel = %recipient, text, "mock discord delivery");
            return Ok(());
        }

        let response = self
            .http
            .post(self.endpoint(&format!("channels/{recipient}/messages")))
            .header(AUTHORIZATION, &self.auth_header)
            .json(&json!({ "content": text }))
            .send()
            .await
            .map_err(SessionError::transport)?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> SessionResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SessionError::delivery(Some(status.as_u16()), body))
}
