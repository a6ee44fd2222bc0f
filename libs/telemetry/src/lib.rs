//! Telemetry bootstrap for pushnote binaries: a `tracing` subscriber with
//! text or JSON output, plus optional OTLP span export.

use anyhow::Result;

mod config;
mod tracing_init;

pub use config::{TelemetryConfig, TelemetryProtocol};
pub use tracing_init::{init_telemetry, shutdown, telemetry_enabled};

/// Installs the subscriber configured from `RUST_LOG`, `LOG_FORMAT` and the
/// standard `OTEL_*` variables.
pub fn install(service_name: &str) -> Result<()> {
    init_telemetry(TelemetryConfig::from_env(
        service_name,
        env!("CARGO_PKG_VERSION"),
    ))
}
