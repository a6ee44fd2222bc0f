use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use metrics::{counter, gauge};
use tokio::sync::{Mutex, mpsc};

use crate::DeliveryJob;

const JOBS_ENQUEUED: &str = "pushnote_jobs_enqueued_total";
const QUEUE_DEPTH: &str = "pushnote_queue_depth";

/// Unbounded FIFO shared between the HTTP handlers (producers) and the
/// delivery worker (consumer).
///
/// Cloning is cheap; every clone refers to the same underlying channel. The
/// queue owns both channel halves, so it can never observe a closed channel.
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::UnboundedSender<DeliveryJob>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<DeliveryJob>>>,
    pending: Arc<AtomicUsize>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Appends a job. Never blocks.
    pub fn enqueue(&self, job: DeliveryJob) {
        let depth = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(err) = self.tx.send(job) {
            // Unreachable while `self` holds the receiver.
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!(text = %err.0.text(), "delivery queue closed; job dropped");
            return;
        }
        counter!(JOBS_ENQUEUED).increment(1);
        gauge!(QUEUE_DEPTH).set(depth as f64);
        tracing::debug!(depth, "delivery job enqueued");
    }

    /// Waits for the next job in insertion order.
    ///
    /// Concurrent callers are serialised on the receiver, so each job is
    /// handed to exactly one of them.
    pub async fn dequeue(&self) -> Option<DeliveryJob> {
        let mut rx = self.rx.lock().await;
        let job = rx.recv().await?;
        self.mark_taken();
        Some(job)
    }

    /// Takes the next job if one is immediately available.
    pub fn try_dequeue(&self) -> Option<DeliveryJob> {
        let mut rx = self.rx.try_lock().ok()?;
        let job = rx.try_recv().ok()?;
        self.mark_taken();
        Some(job)
    }

    /// Jobs enqueued but not yet dequeued.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mark_taken(&self) {
        let depth = self.pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        gauge!(QUEUE_DEPTH).set(depth as f64);
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("pending", &self.len())
            .finish()
    }
}
