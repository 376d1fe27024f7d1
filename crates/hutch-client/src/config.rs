// Configuration for pooled cluster clients

use std::time::Duration;

/// Default ceiling for one buffered response body (16 MiB)
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Settings applied to every client the pool builds
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Connection timeout (default: 5s)
    pub connect_timeout: Duration,
    /// Whole-request timeout (default: 30s)
    pub request_timeout: Duration,
    /// Largest response body a client will buffer (default: 16 MiB)
    pub max_response_bytes: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl PoolConfig {
    /// Set timeouts
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Set the response size ceiling
    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_response_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_config_builder() {
        let config = PoolConfig::default()
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(3))
            .with_max_response_bytes(1024);

        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.max_response_bytes, 1024);
    }
}
