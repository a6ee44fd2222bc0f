use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use metrics::counter;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::{DeliveryJob, DeliveryQueue, NotificationSession, RecipientId, SessionResult};

const DELIVERY_SPAN: &str = "delivery.send";
const DELIVERIES: &str = "pushnote_deliveries_total";

/// Single consumer that drains the [`DeliveryQueue`] into the session.
///
/// A failed delivery is logged and dropped; the next job is always attempted.
pub struct DeliveryWorker {
    queue: DeliveryQueue,
    session: Arc<dyn NotificationSession>,
    recipient: RecipientId,
}

impl DeliveryWorker {
    pub fn new(
        queue: DeliveryQueue,
        session: Arc<dyn NotificationSession>,
        recipient: RecipientId,
    ) -> Self {
        Self {
            queue,
            session,
            recipient,
        }
    }

    pub fn spawn(self) -> JoinHandle<SessionResult<()>> {
        tokio::spawn(self.run())
    }

    /// Waits for the session, then delivers jobs forever.
    ///
    /// Returns only if the session fails its handshake, in which case no job
    /// is ever dequeued.
    pub async fn run(self) -> SessionResult<()> {
        tracing::info!(recipient = %self.recipient, "delivery worker waiting for session");
        if let Err(err) = self.session.await_ready().await {
            tracing::error!(
                error = %err,
                pending = self.queue.len(),
                "notification session unavailable; deliveries halted"
            );
            return Err(err);
        }
        tracing::info!(recipient = %self.recipient, "delivery worker running");

        while let Some(job) = self.queue.dequeue().await {
            self.handle(job).await;
        }
        Ok(())
    }

    /// Resolves the recipient and delivers a single job.
    pub async fn process(&self, job: &DeliveryJob) -> SessionResult<()> {
        let handle = self.session.resolve_recipient(&self.recipient).await?;
        self.session.deliver(&handle, job.text()).await
    }

    async fn handle(&self, job: DeliveryJob) {
        let span = tracing::info_span!(
            DELIVERY_SPAN,
            recipient = %self.recipient,
            chars = job.text().chars().count()
        );
        async {
            match AssertUnwindSafe(self.process(&job)).catch_unwind().await {
                Ok(Ok(())) => {
                    counter!(DELIVERIES, "outcome" => "sent").increment(1);
                    tracing::info!("notification delivered");
                }
                Ok(Err(err)) => {
                    counter!(DELIVERIES, "outcome" => "failed").increment(1);
                    tracing::error!(error = %err, code = err.code(), "delivery failed; job dropped");
                }
                Err(panic) => {
                    counter!(DELIVERIES, "outcome" => "failed").increment(1);
                    tracing::error!(
                        panic = %panic_message(panic.as_ref()),
                        "delivery panicked; job dropped"
                    );
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
