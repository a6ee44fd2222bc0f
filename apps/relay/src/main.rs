use anyhow::Result;
use pn_relay::RelayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pn_telemetry::install("pushnote-relay")?;
    tracing::info!(
        otlp = pn_telemetry::telemetry_enabled(),
        version = env!("CARGO_PKG_VERSION"),
        "starting pushnote relay"
    );

    let config = RelayConfig::from_env()?;
    let result = pn_relay::run(config, async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown requested");
    })
    .await;

    pn_telemetry::shutdown();
    result
}
