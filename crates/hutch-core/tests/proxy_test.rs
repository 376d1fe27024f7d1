//! Access-controlled proxy tests

mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use hutch_common::{AccessDecision, ClusterDescriptor, Identity, ProxyError, Role};

use common::{CLUSTER_ID, Harness, admin, user};

async fn every_verb(h: &Harness, identity: Option<&Identity>) -> Vec<Result<serde_json::Value, ProxyError>> {
    let body = json!({"durable": true});
    vec![
        h.proxy.get(CLUSTER_ID, "/api/queues", identity).await,
        h.proxy
            .post(CLUSTER_ID, "/api/queues/%2F/q/get", Some(&body), identity)
            .await,
        h.proxy
            .put(CLUSTER_ID, "/api/queues/%2F/q", Some(&body), identity)
            .await,
        h.proxy.delete(CLUSTER_ID, "/api/queues/%2F/q", identity).await,
    ]
}

#[test]
fn test_access_decision_is_pure() {
    assert_eq!(
        AccessDecision::evaluate(Role::Administrator, false),
        AccessDecision::Allow
    );
    assert_eq!(
        AccessDecision::evaluate(Role::Administrator, true),
        AccessDecision::Allow
    );
    assert_eq!(AccessDecision::evaluate(Role::User, true), AccessDecision::Allow);
    assert_eq!(AccessDecision::evaluate(Role::User, false), AccessDecision::Deny);
}

#[tokio::test]
async fn test_user_without_assignment_denied_for_every_verb() {
    let h = Harness::start().await;

    for result in every_verb(&h, Some(&user())).await {
        assert!(matches!(result, Err(ProxyError::AccessDenied(_))));
    }
    assert_eq!(h.received().await, 0);
}

#[tokio::test]
async fn test_missing_identity_denied_for_every_verb() {
    let h = Harness::start().await;

    for result in every_verb(&h, None).await {
        assert!(matches!(result, Err(ProxyError::AccessDenied(_))));
    }
    assert_eq!(h.received().await, 0);
}

#[tokio::test]
async fn test_administrator_reaches_upstream_without_assignment() {
    let h = Harness::start().await;
    Mock::given(path("/api/queues"))
        .and(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&h.server)
        .await;
    Mock::given(path("/api/queues/%2F/q/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&h.server)
        .await;
    Mock::given(path("/api/queues/%2F/q"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&h.server)
        .await;

    for result in every_verb(&h, Some(&admin())).await {
        assert!(result.is_ok(), "unexpected failure: {:?}", result);
    }
    assert_eq!(h.received().await, 4);
}

#[tokio::test]
async fn test_assignment_grants_and_revocation_take_effect_per_call() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&h.server)
        .await;

    h.assignments.grant("user-1", CLUSTER_ID);
    h.proxy
        .get(CLUSTER_ID, "/api/overview", Some(&user()))
        .await
        .unwrap();

    h.assignments.revoke("user-1", CLUSTER_ID);
    let err = h
        .proxy
        .get(CLUSTER_ID, "/api/overview", Some(&user()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::AccessDenied(_)));
}

#[tokio::test]
async fn test_unknown_and_inactive_clusters_fail_fast() {
    let h = Harness::start().await;

    let err = h
        .proxy
        .get("missing", "/api/overview", Some(&admin()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::ClusterNotFound(_)));

    h.directory.upsert(
        ClusterDescriptor::new("off", "off", &h.server.uri(), "u", "p")
            .unwrap()
            .with_active(false),
    );
    let err = h
        .proxy
        .get("off", "/api/overview", Some(&admin()))
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::ClusterInactive(_)));
    assert!(err.is_rejected_locally());

    assert_eq!(h.received().await, 0);
}

#[tokio::test]
async fn test_descriptor_update_reaches_next_call() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/moved/api/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"node": "rabbit@b"})))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"node": "rabbit@a"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let before = h
        .proxy
        .get(CLUSTER_ID, "/api/overview", Some(&admin()))
        .await
        .unwrap();
    assert_eq!(before["node"], "rabbit@a");

    h.add_cluster(CLUSTER_ID, "moved");
    let after = h
        .proxy
        .get(CLUSTER_ID, "/api/overview", Some(&admin()))
        .await
        .unwrap();
    assert_eq!(after["node"], "rabbit@b");
}
