use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// Failures surfaced by a [`NotificationSession`](crate::NotificationSession).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("recipient {recipient} not found")]
    RecipientNotFound { recipient: String },
    #[error("delivery rejected by backend (status {status:?}): {detail}")]
    Delivery { status: Option<u16>, detail: String },
    #[error("backend transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("session is not ready")]
    NotReady,
    #[error("session failed: {reason}")]
    Failed { reason: String },
}

impl SessionError {
    pub fn delivery(status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::Delivery {
            status,
            detail: detail.into(),
        }
    }

    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(err))
    }

    /// Short label used for log fields and metric tags.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RecipientNotFound { .. } => "recipient_not_found",
            Self::Delivery { .. } => "delivery",
            Self::Transport(_) => "transport",
            Self::NotReady => "not_ready",
            Self::Failed { .. } => "session_failed",
        }
    }
}
