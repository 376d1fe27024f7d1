//! HTTP client bound to one cluster
//!
//! Each client carries the cluster's Basic-auth header as a default header,
//! speaks JSON, and refuses to buffer response bodies above a fixed ceiling.
//! Every transport or HTTP failure leaves this module as a `ProxyError`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use hutch_common::{ClusterDescriptor, ProxyError};

use crate::config::PoolConfig;

/// Longest upstream error text kept in an error message
const MAX_ERROR_MESSAGE_CHARS: usize = 512;

/// HTTP client for one cluster's management API
pub struct PooledClient {
    cluster_id: String,
    base_url: String,
    version: u64,
    fingerprint: u64,
    max_response_bytes: usize,
    client: Client,
}

impl std::fmt::Debug for PooledClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledClient")
            .field("cluster_id", &self.cluster_id)
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

impl PooledClient {
    /// Build a client from a descriptor. Does not contact the cluster.
    pub fn build(descriptor: &ClusterDescriptor, config: &PoolConfig) -> Result<Self, ProxyError> {
        let cluster_id = descriptor.id();

        let token = STANDARD.encode(format!(
            "{}:{}",
            descriptor.username(),
            descriptor.password()
        ));
        let mut authorization = HeaderValue::from_str(&format!("Basic {}", token))
            .map_err(|_| ProxyError::unexpected(cluster_id, "credentials cannot form a header"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProxyError::Unexpected {
                cluster_id: cluster_id.to_string(),
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(e.without_url())),
            })?;

        Ok(Self {
            cluster_id: cluster_id.to_string(),
            base_url: descriptor.base_url().to_string(),
            version: descriptor.version(),
            fingerprint: descriptor.fingerprint(),
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Directory revision of the descriptor this client was built from
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Fingerprint of the URL and credentials this client was built from
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Whether this client was built from exactly these connection settings
    pub fn matches(&self, descriptor: &ClusterDescriptor) -> bool {
        self.fingerprint == descriptor.fingerprint()
    }

    /// Absolute URL of an API path.
    ///
    /// The path is appended verbatim so pre-encoded segments such as `%2F`
    /// reach the broker unchanged.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ProxyError> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, ProxyError> {
        self.execute(Method::POST, path, body).await
    }

    pub async fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, ProxyError> {
        self.execute(Method::PUT, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ProxyError> {
        self.execute(Method::DELETE, path, None).await
    }

    /// Send one request and decode the JSON response.
    ///
    /// An empty success body decodes to `Value::Null`.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProxyError> {
        debug!(cluster_id = %self.cluster_id, %method, path, "Sending management API request");

        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&self.cluster_id, e))?;

        let status = response.status();
        let bytes = self.read_body(response).await?;

        if !status.is_success() {
            let err = status_error(&self.cluster_id, status, &bytes);
            warn!(
                cluster_id = %self.cluster_id,
                %method,
                path,
                status = status.as_u16(),
                "Management API request failed"
            );
            return Err(err);
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| ProxyError::ResponseParseFailure {
            cluster_id: self.cluster_id.clone(),
            source: Box::new(e),
        })
    }

    /// Buffer the response body, failing once it exceeds the ceiling
    async fn read_body(&self, mut response: Response) -> Result<Vec<u8>, ProxyError> {
        if let Some(length) = response.content_length()
            && length > self.max_response_bytes as u64
        {
            return Err(self.too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transport_error(&self.cluster_id, e))?
        {
            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn too_large(&self) -> ProxyError {
        warn!(
            cluster_id = %self.cluster_id,
            limit = self.max_response_bytes,
            "Response body exceeds size limit"
        );
        ProxyError::unexpected(
            &self.cluster_id,
            format!("response exceeds {} bytes", self.max_response_bytes),
        )
    }
}

/// Map a reqwest failure onto the error taxonomy. The URL is stripped.
pub fn transport_error(cluster_id: &str, err: reqwest::Error) -> ProxyError {
    let err = err.without_url();
    let cluster_id = cluster_id.to_string();

    if err.is_timeout() {
        ProxyError::Timeout {
            cluster_id,
            source: Some(Box::new(err)),
        }
    } else if err.is_connect() {
        ProxyError::ConnectFailure {
            cluster_id,
            source: Box::new(err),
        }
    } else if err.is_decode() {
        ProxyError::ResponseParseFailure {
            cluster_id,
            source: Box::new(err),
        }
    } else {
        ProxyError::Unexpected {
            cluster_id,
            message: "request failed".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Map a non-success HTTP status onto the error taxonomy
pub fn status_error(cluster_id: &str, status: StatusCode, body: &[u8]) -> ProxyError {
    let cluster_id = cluster_id.to_string();
    let message = upstream_message(status, body);

    match status {
        StatusCode::UNAUTHORIZED => ProxyError::UpstreamAuthFailed { cluster_id },
        StatusCode::FORBIDDEN => ProxyError::UpstreamForbidden {
            cluster_id,
            message,
        },
        StatusCode::NOT_FOUND => ProxyError::UpstreamNotFound {
            cluster_id,
            message,
        },
        s if s.is_server_error() => ProxyError::UpstreamServerError {
            cluster_id,
            status: s.as_u16(),
            message,
        },
        s => ProxyError::Unexpected {
            cluster_id,
            message: format!("upstream returned {}: {}", s.as_u16(), message),
            source: None,
        },
    }
}

/// Human-readable reason from an upstream error body.
///
/// The management API answers errors with `{"error": ..., "reason": ...}`;
/// anything else is used as text.
fn upstream_message(status: StatusCode, body: &[u8]) -> String {
    let from_json = serde_json::from_slice::<Value>(body).ok().and_then(|v| {
        ["reason", "error"]
            .iter()
            .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
    });

    let message = from_json
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no reason given")
            .to_string()
    } else {
        message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
    }
}
