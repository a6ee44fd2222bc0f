//! Pushnote core: the producer/consumer relay between webhook ingress and the
//! chat backend.
//!
//! HTTP handlers push [`DeliveryJob`]s onto a shared [`DeliveryQueue`]; a
//! single [`DeliveryWorker`] waits for the [`NotificationSession`] to become
//! ready and then delivers jobs in FIFO order, isolating each failure.
pub mod error;
pub mod job;
pub mod queue;
pub mod session;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
pub mod worker;

pub use error::*;
pub use job::*;
pub use queue::*;
pub use session::*;
pub use worker::*;
