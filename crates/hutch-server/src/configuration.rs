//! Configuration management for the Hutch server
//!
//! Settings come from `conf/application.yml`, then `HUTCH_`-prefixed
//! environment variables, then command line overrides.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use hutch_client::PoolConfig;
use hutch_common::ClusterDescriptor;
use hutch_core::HealthMonitorConfig;

use crate::logging::LoggingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const DEFAULT_METRICS_ADDRESS: &str = "0.0.0.0:9464";

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command(name = "hutch-server", version, about)]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,
    /// Log level override (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

/// One entry of the `clusters:` list
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ClusterEntry {
    pub fn to_descriptor(&self) -> anyhow::Result<ClusterDescriptor> {
        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        let descriptor =
            ClusterDescriptor::new(&self.id, name, &self.url, &self.username, &self.password)
                .with_context(|| format!("invalid cluster '{}'", self.id))?;
        Ok(descriptor.with_active(self.active))
    }
}

/// One entry of the `assignments:` list
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentEntry {
    pub identity_id: String,
    pub cluster_id: String,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load from the command line of the current process
    pub fn new() -> anyhow::Result<Self> {
        Self::load(&Cli::parse())
    }

    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name(&cli.config))
            .add_source(
                Environment::with_prefix("HUTCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(level) = &cli.log_level {
            builder = builder.set_override("logging.level", level.as_str())?;
        }

        let config = builder
            .build()
            .with_context(|| format!("failed to load configuration from {}", cli.config))?;

        Ok(Configuration { config })
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string("logging.dir").ok(),
            self.config.get_bool("logging.console").unwrap_or(true),
            self.config.get_bool("logging.file").unwrap_or(false),
            self.config
                .get_string("logging.level")
                .unwrap_or("info".to_string()),
        )
    }

    // ========================================================================
    // Metrics Configuration
    // ========================================================================

    pub fn metrics_enabled(&self) -> bool {
        self.config
            .get_bool("server.metrics.enabled")
            .unwrap_or(true)
    }

    pub fn metrics_listen_address(&self) -> anyhow::Result<SocketAddr> {
        let address = self
            .config
            .get_string("server.metrics.address")
            .unwrap_or(DEFAULT_METRICS_ADDRESS.to_string());
        address
            .parse()
            .with_context(|| format!("invalid metrics listen address '{}'", address))
    }

    // ========================================================================
    // Client Pool Configuration
    // ========================================================================

    pub fn pool_config(&self) -> PoolConfig {
        let defaults = PoolConfig::default();
        PoolConfig::default()
            .with_timeouts(
                self.millis("pool.connect_timeout_ms", defaults.connect_timeout),
                self.millis("pool.request_timeout_ms", defaults.request_timeout),
            )
            .with_max_response_bytes(
                self.config
                    .get::<usize>("pool.max_response_bytes")
                    .unwrap_or(defaults.max_response_bytes),
            )
    }

    // ========================================================================
    // Health Monitor Configuration
    // ========================================================================

    /// Health monitor settings; a zero sweep interval or check timeout is rejected
    pub fn health_config(&self) -> anyhow::Result<HealthMonitorConfig> {
        let defaults = HealthMonitorConfig::default();
        let sweep_interval = self.secs("health.sweep_interval_secs", defaults.sweep_interval);
        if sweep_interval.is_zero() {
            bail!("health.sweep_interval_secs must be greater than zero");
        }
        let check_timeout = self.millis("health.check_timeout_ms", defaults.check_timeout);
        if check_timeout.is_zero() {
            bail!("health.check_timeout_ms must be greater than zero");
        }

        Ok(HealthMonitorConfig::default()
            .with_ttls(
                self.secs("health.global_ttl_secs", defaults.global_ttl),
                self.secs("health.cluster_ttl_secs", defaults.cluster_ttl),
            )
            .with_check_timeout(check_timeout)
            .with_sweep_interval(sweep_interval)
            .with_max_concurrent_checks(
                self.config
                    .get::<usize>("health.max_concurrent_checks")
                    .unwrap_or(defaults.max_concurrent_checks),
            ))
    }

    // ========================================================================
    // Clusters and Assignments
    // ========================================================================

    /// Cluster descriptors from the `clusters:` list; ids must be unique
    pub fn clusters(&self) -> anyhow::Result<Vec<ClusterDescriptor>> {
        let entries: Vec<ClusterEntry> = match self.config.get("clusters") {
            Ok(entries) => entries,
            Err(config::ConfigError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e).context("invalid clusters section"),
        };

        let mut seen = HashSet::new();
        let mut descriptors = Vec::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id.clone()) {
                bail!("duplicate cluster id '{}'", entry.id);
            }
            descriptors.push(entry.to_descriptor()?);
        }
        Ok(descriptors)
    }

    pub fn assignments(&self) -> anyhow::Result<Vec<AssignmentEntry>> {
        match self.config.get("assignments") {
            Ok(entries) => Ok(entries),
            Err(config::ConfigError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e).context("invalid assignments section"),
        }
    }

    fn millis(&self, key: &str, default: Duration) -> Duration {
        self.config
            .get::<u64>(key)
            .map(Duration::from_millis)
            .unwrap_or(default)
    }

    fn secs(&self, key: &str, default: Duration) -> Duration {
        self.config
            .get::<u64>(key)
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tracing::Level;

    use super::*;

    fn load(yaml: &str) -> Configuration {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        let cli = Cli {
            config: file.path().to_string_lossy().to_string(),
            log_level: None,
        };
        Configuration::load(&cli).unwrap()
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let configuration = load("server: {}\n");

        let pool = configuration.pool_config();
        assert_eq!(pool.request_timeout, Duration::from_secs(30));

        let health = configuration.health_config().unwrap();
        assert_eq!(health.global_ttl, Duration::from_secs(30));
        assert_eq!(health.max_concurrent_checks, 8);

        assert!(configuration.metrics_enabled());
        assert_eq!(
            configuration.metrics_listen_address().unwrap(),
            DEFAULT_METRICS_ADDRESS.parse::<SocketAddr>().unwrap()
        );
        assert!(configuration.clusters().unwrap().is_empty());
        assert!(configuration.assignments().unwrap().is_empty());
    }

    #[test]
    fn test_typed_sections() {
        let configuration = load(
            r#"
server:
  metrics:
    enabled: false
    address: 127.0.0.1:9100
logging:
  level: debug
  console: false
pool:
  connect_timeout_ms: 1500
  request_timeout_ms: 4000
  max_response_bytes: 2048
health:
  global_ttl_secs: 10
  cluster_ttl_secs: 20
  check_timeout_ms: 750
  sweep_interval_secs: 15
  max_concurrent_checks: 2
"#,
        );

        let pool = configuration.pool_config();
        assert_eq!(pool.connect_timeout, Duration::from_millis(1500));
        assert_eq!(pool.request_timeout, Duration::from_millis(4000));
        assert_eq!(pool.max_response_bytes, 2048);

        let health = configuration.health_config().unwrap();
        assert_eq!(health.global_ttl, Duration::from_secs(10));
        assert_eq!(health.cluster_ttl, Duration::from_secs(20));
        assert_eq!(health.check_timeout, Duration::from_millis(750));
        assert_eq!(health.sweep_interval, Duration::from_secs(15));
        assert_eq!(health.max_concurrent_checks, 2);

        assert!(!configuration.metrics_enabled());
        assert_eq!(
            configuration.metrics_listen_address().unwrap().port(),
            9100
        );

        let logging = configuration.logging_config();
        assert!(!logging.console_output);
        assert_eq!(logging.level, Level::DEBUG);
    }

    #[test]
    fn test_zero_health_intervals_rejected() {
        let zero_sweep = load("health:\n  sweep_interval_secs: 0\n");
        let err = zero_sweep.health_config().unwrap_err();
        assert!(err.to_string().contains("sweep_interval_secs"));

        let zero_timeout = load("health:\n  check_timeout_ms: 0\n");
        assert!(zero_timeout.health_config().is_err());
    }

    #[test]
    fn test_clusters_and_assignments() {
        let configuration = load(
            r#"
clusters:
  - id: prod
    name: Production
    url: https://mq.example.com/rabbit
    username: monitor
    password: secret
  - id: legacy
    url: http://10.0.0.5:15672
    username: guest
    password: guest
    active: false
assignments:
  - identity_id: user-1
    cluster_id: prod
"#,
        );

        let clusters = configuration.clusters().unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].name(), "Production");
        assert_eq!(clusters[0].base_url(), "https://mq.example.com/rabbit/");
        assert!(clusters[0].is_accessible());
        assert_eq!(clusters[1].name(), "legacy");
        assert!(!clusters[1].is_accessible());

        let assignments = configuration.assignments().unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].cluster_id, "prod");
    }

    #[test]
    fn test_invalid_clusters_rejected() {
        let duplicate = load(
            r#"
clusters:
  - id: a
    url: http://localhost:15672
    username: guest
    password: guest
  - id: a
    url: http://localhost:15673
    username: guest
    password: guest
"#,
        );
        assert!(duplicate.clusters().is_err());

        let bad_url = load(
            r#"
clusters:
  - id: a
    url: ftp://localhost
    username: guest
    password: guest
"#,
        );
        let err = bad_url.clusters().unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_log_level_override() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(b"logging:\n  level: info\n").unwrap();
        let cli = Cli {
            config: file.path().to_string_lossy().to_string(),
            log_level: Some("warn".to_string()),
        };

        let configuration = Configuration::load(&cli).unwrap();
        assert_eq!(configuration.logging_config().level, Level::WARN);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let cli = Cli {
            config: "/nonexistent/hutch/application.yml".to_string(),
            log_level: None,
        };
        assert!(Configuration::load(&cli).is_err());
    }
}
