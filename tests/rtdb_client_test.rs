use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use carmart_core::auth::AuthSession;
use carmart_core::config::AppConfig;
use carmart_core::errors::ServiceError;
use carmart_core::store::{KvStore, RtdbClient};

fn client_for(server: &MockServer) -> RtdbClient {
    let config = AppConfig {
        rtdb_base_url: server.uri(),
        ..AppConfig::default()
    };
    RtdbClient::new(&config).expect("client build failed")
}

fn session() -> AuthSession {
    AuthSession::new("u1", "token-u1")
}

#[tokio::test]
async fn get_sends_auth_and_decodes_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/carts/u1.json"))
        .and(query_param("auth", "token-u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"k": {"quantity": 2}})))
        .expect(1)
        .mount(&server)
        .await;

    let value = client_for(&server)
        .get(&session(), "carts/u1")
        .await
        .unwrap()
        .expect("body missing");
    assert_eq!(value["k"]["quantity"], 2);
}

#[tokio::test]
async fn null_body_reads_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/carts/u1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&server)
        .await;

    let value = client_for(&server).get(&session(), "carts/u1").await.unwrap();
    assert!(value.is_none());
}

#[tokio::test]
async fn non_success_status_maps_to_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get(&session(), "orders/abc")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PermissionDenied(_));
}

#[tokio::test]
async fn push_returns_the_generated_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders.json"))
        .and(body_json(json!({"orderId": "DH1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "-Nabc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let key = client_for(&server)
        .push(&session(), "orders", json!({"orderId": "DH1"}))
        .await
        .unwrap();
    assert_eq!(key, "-Nabc123");
}

#[tokio::test]
async fn put_targets_the_exact_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/userOrders/u1/-Nabc.json"))
        .and(query_param("auth", "token-u1"))
        .and(body_json(json!({"status": "pending"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .put(&session(), "userOrders/u1/-Nabc", json!({"status": "pending"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn patch_sends_partial_update() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/orders/-Nabc.json"))
        .and(body_json(json!({"status": "processing"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .patch(&session(), "orders/-Nabc", json!({"status": "processing"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_targets_the_exact_path() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/carts/u1.json"))
        .and(query_param("auth", "token-u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete(&session(), "carts/u1").await.unwrap();
}

#[tokio::test]
async fn transport_failure_maps_to_backend_unavailable() {
    // Nothing listens on this port.
    let config = AppConfig {
        rtdb_base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: 2,
        ..AppConfig::default()
    };
    let client = RtdbClient::new(&config).unwrap();

    let err = client.get(&session(), "orders").await.unwrap_err();
    assert_matches!(err, ServiceError::BackendUnavailable(_));
}
