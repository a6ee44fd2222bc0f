//! Pushnote relay: receives GitHub webhooks and forwards push notifications
//! to a single Discord user through the delivery queue.

pub mod config;
pub mod discord;
pub mod events;
pub mod http;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use pn_core::{DeliveryQueue, DeliveryWorker, NotificationSession};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use config::RelayConfig;
pub use discord::DiscordSession;
pub use http::{RelayState, build_router};

/// Starts the worker once `session` reports ready.
///
/// The worker runs inside the returned task, so aborting the handle stops
/// delivery. It waits on readiness again itself, so it never depends on the
/// order in which the handshake and this task run.
pub fn spawn_delivery(
    worker: DeliveryWorker,
    session: Arc<dyn NotificationSession>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = session.await_ready().await {
            tracing::error!(error = %err, "notification session failed; delivery worker not started");
            return;
        }
        match worker.run().await {
            Ok(()) => tracing::warn!("delivery worker stopped"),
            Err(err) => tracing::error!(error = %err, "delivery worker halted"),
        }
    })
}

/// Binds `config.addr` and runs the relay until `shutdown` resolves.
pub async fn run(
    config: RelayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("bind {}", config.addr))?;
    serve(listener, config, shutdown).await
}

/// Runs the relay on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    config: RelayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    if config.webhook_secret.is_none() {
        tracing::warn!("GITHUB_SECRET not set; accepting unsigned webhooks");
    }

    let queue = DeliveryQueue::new();
    let session = Arc::new(DiscordSession::new(
        reqwest::Client::new(),
        config.discord_api_base.clone(),
        &config.discord_token,
    ));

    let connecting = session.clone();
    let connect = tokio::spawn(async move {
        // Failures are logged and published through the session state.
        let _ = connecting.connect().await;
    });
    let worker = DeliveryWorker::new(queue.clone(), session.clone(), config.recipient.clone());
    let delivery = spawn_delivery(worker, session);

    let router = build_router(RelayState::new(queue, config.webhook_secret.clone()));
    let addr = listener.local_addr()?;
    tracing::info!(%addr, recipient = %config.recipient, "pushnote relay listening");

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await;

    connect.abort();
    delivery.abort();
    result.context("http server failed")
}
