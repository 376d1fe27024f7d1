//! Main entry point for the Hutch server.

use tracing::info;

use hutch_server::{configuration::Configuration, logging, startup::Application, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;

    let _logging_guard = logging::init_logging(&configuration.logging_config())?;

    if configuration.metrics_enabled() {
        telemetry::init_metrics(configuration.metrics_listen_address()?)?;
    }

    let application = Application::build(&configuration)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Hutch server started, health sweep every {:?}",
        application.monitor.config().sweep_interval
    );

    application.run().await;
    Ok(())
}
