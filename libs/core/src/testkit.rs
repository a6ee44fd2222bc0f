//! In-memory session used to exercise the worker and the HTTP relay in tests.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    NotificationSession, ReadySignal, ReadyState, RecipientHandle, RecipientId, SessionError,
    SessionResult,
};

const WAIT_LIMIT: Duration = Duration::from_secs(5);

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Default)]
struct Script {
    delivered: Vec<String>,
    attempts: usize,
    resolutions: usize,
    fail: Option<Predicate>,
    panic: Option<Predicate>,
}

/// Session whose readiness and delivery outcomes are driven by the test.
pub struct ScriptedSession {
    signal: ReadySignal,
    known_recipient: Option<RecipientId>,
    script: Mutex<Script>,
    changed: Notify,
}

impl ScriptedSession {
    /// A session still waiting for its handshake.
    pub fn new() -> Self {
        Self {
            signal: ReadySignal::new(),
            known_recipient: None,
            script: Mutex::new(Script::default()),
            changed: Notify::new(),
        }
    }

    /// A session that is already ready.
    pub fn ready() -> Self {
        let session = Self::new();
        session.mark_ready();
        session
    }

    /// Only `id` resolves; every other recipient is reported as not found.
    pub fn with_known_recipient(mut self, id: impl Into<String>) -> Self {
        self.known_recipient = Some(RecipientId::new(id));
        self
    }

    pub fn mark_ready(&self) {
        self.signal.set(ReadyState::Connecting);
        self.signal.set(ReadyState::Ready);
    }

    pub fn mark_failed(&self) {
        self.signal.set(ReadyState::Connecting);
        self.signal.set(ReadyState::Failed);
    }

    pub fn fail_when(&self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) {
        self.lock().fail = Some(Arc::new(predicate));
    }

    pub fn panic_when(&self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) {
        self.lock().panic = Some(Arc::new(predicate));
    }

    pub fn delivered(&self) -> Vec<String> {
        self.lock().delivered.clone()
    }

    /// Number of `deliver` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    pub fn resolutions(&self) -> usize {
        self.lock().resolutions
    }

    pub async fn wait_for_deliveries(&self, count: usize) -> Vec<String> {
        self.wait_until(|script| script.delivered.len() >= count)
            .await;
        self.delivered()
    }

    pub async fn wait_for_attempts(&self, count: usize) {
        self.wait_until(|script| script.attempts >= count).await;
    }

    pub async fn wait_for_resolutions(&self, count: usize) {
        self.wait_until(|script| script.resolutions >= count).await;
    }

    async fn wait_until(&self, done: impl Fn(&Script) -> bool) {
        let wait = async {
            loop {
                let changed = self.changed.notified();
                if done(&self.lock()) {
                    return;
                }
                changed.await;
            }
        };
        if tokio::time::timeout(WAIT_LIMIT, wait).await.is_err() {
            panic!("scripted session condition not reached within {WAIT_LIMIT:?}");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSession for ScriptedSession {
    fn state(&self) -> ReadyState {
        self.signal.state()
    }

    async fn await_ready(&self) -> SessionResult<()> {
        self.signal.wait_ready().await
    }

    async fn resolve_recipient(&self, id: &RecipientId) -> SessionResult<RecipientHandle> {
        if self.signal.state() != ReadyState::Ready {
            return Err(SessionError::NotReady);
        }
        self.lock().resolutions += 1;
        self.changed.notify_waiters();
        match &self.known_recipient {
            Some(known) if known != id => Err(SessionError::RecipientNotFound {
                recipient: id.to_string(),
            }),
            _ => Ok(RecipientHandle::new(format!("dm:{id}"))),
        }
    }

    async fn deliver(&self, recipient: &RecipientHandle, text: &str) -> SessionResult<()> {
        if self.signal.state() != ReadyState::Ready {
            return Err(SessionError::NotReady);
        }
        let (fail, panic) = {
            let mut script = self.lock();
            script.attempts += 1;
            (script.fail.clone(), script.panic.clone())
        };
        self.changed.notify_waiters();

        if panic.is_some_and(|p| p(text)) {
            panic!("scripted panic delivering to {recipient}");
        }
        if fail.is_some_and(|f| f(text)) {
            return Err(SessionError::delivery(Some(500), "scripted failure"));
        }

        self.lock().delivered.push(text.to_string());
        self.changed.notify_waiters();
        Ok(())
    }
}
