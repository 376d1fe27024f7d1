//! Hutch server
//!
//! Loads configuration, initializes logging and the Prometheus exporter,
//! wires the proxy, engine and health monitor, and runs the periodic sweep.

pub mod configuration;
pub mod logging;
pub mod startup;
pub mod telemetry;
