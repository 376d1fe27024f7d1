//! Prometheus exporter for the metrics recorded by the core crate

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Install the global recorder and serve `/metrics` on `address`
pub fn init_metrics(address: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;
    hutch_core::metrics::describe_metrics();
    info!("Prometheus metrics endpoint on http://{}/metrics", address);
    Ok(())
}
