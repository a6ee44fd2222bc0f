use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{SessionError, SessionResult};

/// Lifecycle of the connection to the chat backend.
///
/// `Ready` and `Failed` are terminal: a failed session is never reconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    NotInitialized,
    Connecting,
    Ready,
    Failed,
}

impl ReadyState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readiness handshake shared between a session's connection lifecycle
/// (which publishes transitions) and the worker (which waits on them).
#[derive(Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<ReadyState>>,
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReadyState::NotInitialized);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ReadyState {
        *self.tx.borrow()
    }

    /// Publishes a transition. Returns `false` when the signal already sits in
    /// a terminal state or the state is unchanged.
    pub fn set(&self, next: ReadyState) -> bool {
        let mut previous = None;
        let changed = self.tx.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                previous = Some(*current);
                return false;
            }
            *current = next;
            true
        });
        if let Some(previous) = previous.filter(|p| p.is_terminal() && *p != next) {
            tracing::warn!(%previous, requested = %next, "ignoring transition out of terminal session state");
        }
        changed
    }

    /// Suspends until the session reaches a terminal state.
    ///
    /// Safe to call any number of times, before or after the transition.
    pub async fn wait_ready(&self) -> SessionResult<()> {
        let mut rx = self.tx.subscribe();
        let state = *rx
            .wait_for(|state| state.is_terminal())
            .await
            .map_err(|_| SessionError::Failed {
                reason: "readiness signal dropped".into(),
            })?;
        match state {
            ReadyState::Ready => Ok(()),
            _ => Err(SessionError::Failed {
                reason: "backend handshake did not complete".into(),
            }),
        }
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadySignal")
            .field("state", &self.state())
            .finish()
    }
}

/// Recipient identifier as configured at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipientId(String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend-specific reference to a resolved recipient (e.g. a DM channel).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipientHandle(String);

impl RecipientHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Long-lived connection to the chat backend.
#[async_trait]
pub trait NotificationSession: Send + Sync {
    fn state(&self) -> ReadyState;

    /// Suspends until the backend handshake completes.
    async fn await_ready(&self) -> SessionResult<()>;

    async fn resolve_recipient(&self, id: &RecipientId) -> SessionResult<RecipientHandle>;

    async fn deliver(&self, recipient: &RecipientHandle, text: &str) -> SessionResult<()>;
}
