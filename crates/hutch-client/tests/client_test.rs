//! Client pool tests against a mock management API

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hutch_client::{ClientPool, Method, PoolConfig};
use hutch_common::{ClusterDescriptor, ProxyError};

fn descriptor(server: &MockServer, password: &str, version: u64) -> ClusterDescriptor {
    ClusterDescriptor::new("c1", "Cluster 1", &server.uri(), "admin", password)
        .unwrap()
        .with_version(version)
}

#[tokio::test]
async fn test_sends_basic_auth_and_json_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .and(basic_auth("admin", "secret"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cluster_name": "rabbit@a"})))
        .expect(1)
        .mount(&server)
        .await;

    let pool = ClientPool::default();
    let client = pool.get(&descriptor(&server, "secret", 1)).unwrap();
    let body = client.get("/api/overview").await.unwrap();

    assert_eq!(body["cluster_name"], "rabbit@a");
}

#[tokio::test]
async fn test_default_vhost_token_not_reencoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/exchanges/%2F/orders/bindings/source"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let pool = ClientPool::default();
    let client = pool.get(&descriptor(&server, "pw", 1)).unwrap();
    let body = client
        .get("/api/exchanges/%2F/orders/bindings/source")
        .await
        .unwrap();

    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_put_sends_json_body_and_accepts_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/queues/%2F/orders"))
        .and(body_json(json!({"durable": true, "auto_delete": false})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let pool = ClientPool::default();
    let client = pool.get(&descriptor(&server, "pw", 1)).unwrap();
    let body = client
        .execute(
            Method::PUT,
            "/api/queues/%2F/orders",
            Some(&json!({"durable": true, "auto_delete": false})),
        )
        .await
        .unwrap();

    assert!(body.is_null());
}

#[tokio::test]
async fn test_updated_credentials_used_after_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .and(basic_auth("admin", "rotated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let pool = ClientPool::default();
    let old = pool.get(&descriptor(&server, "original", 1)).unwrap();
    assert!(matches!(
        old.get("/api/overview").await,
        Err(ProxyError::UpstreamAuthFailed { .. })
    ));

    pool.update(&descriptor(&server, "rotated", 2)).unwrap();
    let current = pool.get(&descriptor(&server, "rotated", 2)).unwrap();

    assert!(!Arc::ptr_eq(&old, &current));
    current.get("/api/overview").await.unwrap();
}

#[tokio::test]
async fn test_status_codes_map_to_taxonomy() {
    let server = MockServer::start().await;
    Mock::given(path("/api/queues/%2F/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "Object Not Found", "reason": "Not Found"})),
        )
        .mount(&server)
        .await;
    Mock::given(path("/api/queues/%2F/locked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(path("/api/queues/%2F/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_string("node down"))
        .mount(&server)
        .await;

    let pool = ClientPool::default();
    let client = pool.get(&descriptor(&server, "pw", 1)).unwrap();

    match client.get("/api/queues/%2F/missing").await {
        Err(ProxyError::UpstreamNotFound { message, .. }) => assert_eq!(message, "Not Found"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(
        client.get("/api/queues/%2F/locked").await,
        Err(ProxyError::UpstreamForbidden { .. })
    ));
    match client.get("/api/queues/%2F/broken").await {
        Err(ProxyError::UpstreamServerError { status, message, .. }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "node down");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_json_is_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/api/queues"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let pool = ClientPool::default();
    let client = pool.get(&descriptor(&server, "pw", 1)).unwrap();

    let err = client.get("/api/queues").await.unwrap_err();
    assert!(matches!(err, ProxyError::ResponseParseFailure { .. }));
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(path("/api/overview"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = PoolConfig::default()
        .with_timeouts(Duration::from_secs(1), Duration::from_millis(100));
    let pool = ClientPool::new(config);
    let client = pool.get(&descriptor(&server, "pw", 1)).unwrap();

    let err = client.get("/api/overview").await.unwrap_err();
    assert!(matches!(err, ProxyError::Timeout { .. }));
}

#[tokio::test]
async fn test_refused_connection_is_connect_failure() {
    let descriptor =
        ClusterDescriptor::new("c1", "Cluster 1", "http://127.0.0.1:1", "admin", "pw").unwrap();
    let pool = ClientPool::default();
    let client = pool.get(&descriptor).unwrap();

    let err = client.get("/api/overview").await.unwrap_err();
    assert!(matches!(err, ProxyError::ConnectFailure { .. }));
    assert!(!err.to_string().contains("pw"));
}

#[tokio::test]
async fn test_oversized_response_rejected() {
    let server = MockServer::start().await;
    let big = format!("[\"{}\"]", "x".repeat(4096));
    Mock::given(path("/api/queues"))
        .respond_with(ResponseTemplate::new(200).set_body_string(big))
        .mount(&server)
        .await;

    let pool = ClientPool::new(PoolConfig::default().with_max_response_bytes(1024));
    let client = pool.get(&descriptor(&server, "pw", 1)).unwrap();

    let err = client.get("/api/queues").await.unwrap_err();
    assert!(matches!(err, ProxyError::Unexpected { .. }));
    assert!(err.to_string().contains("1024"));
}
