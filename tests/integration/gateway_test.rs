use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use http::{header, HeaderValue, StatusCode};
use participant_gateway::{
    telemetry::{Direction, MetricsRegistry},
    ApiGateway, GatewayConfig, GatewayError, RequestOptions,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{
    gateway_for, legacy_gateway_for, received_count, received_header, silent_server,
    CollectingExporter, LogCapture,
};

fn cookies(token: &str) -> HashMap<String, String> {
    HashMap::from([("token".to_string(), token.to_string())])
}

#[test_log::test(tokio::test)]
async fn test_gateway_sends_bearer_token_to_joined_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tournament/42/public"))
        .and(header_is("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tournament_name": "Worlds" })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let response = gateway
        .authenticated_request("api/tournament/42/public", &cookies("abc123"), RequestOptions::default())
        .await
        .expect("request should succeed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.url(), format!("{}/api/tournament/42/public", server.uri()));
    assert_eq!(received_count(&server).await, 1);
}

#[test_log::test(tokio::test)]
async fn test_gateway_merges_caller_headers_with_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let options = RequestOptions::get().header(
        header::HeaderName::from_static("x-participant"),
        HeaderValue::from_static("p-7"),
    );
    gateway
        .authenticated_request("api/user", &cookies("abc123"), options)
        .await
        .unwrap();

    assert_eq!(
        received_header(&server, 0, "authorization").await.as_deref(),
        Some("Bearer abc123")
    );
    assert_eq!(
        received_header(&server, 0, "x-participant").await.as_deref(),
        Some("p-7")
    );
}

#[test_log::test(tokio::test)]
async fn test_gateway_caller_authorization_wins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let options = RequestOptions::get().header(
        header::AUTHORIZATION,
        HeaderValue::from_static("Basic bWFpbCNhOmI="),
    );
    // No token cookie is needed when the caller brings its own credential.
    gateway
        .authenticated_request("api/tokens", &HashMap::new(), options)
        .await
        .unwrap();

    assert_eq!(
        received_header(&server, 0, "authorization").await.as_deref(),
        Some("Basic bWFpbCNhOmI=")
    );
}

#[tokio::test]
async fn test_gateway_non_200_is_logged_once_and_returned_unmodified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/participant/p1/info"))
        .respond_with(ResponseTemplate::new(404).set_body_string("participant not found"))
        .mount(&server)
        .await;

    let gateway = ApiGateway::new(GatewayConfig {
        retry_attempts: 3,
        ..GatewayConfig::with_base_url(server.uri())
    })
    .unwrap();

    let (logs, _guard) = LogCapture::install();
    let response = gateway
        .authenticated_request("api/participant/p1/info", &cookies("abc123"), RequestOptions::get())
        .await
        .expect("a non-200 status is not a transport failure");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "participant not found");
    assert_eq!(received_count(&server).await, 1, "status errors are never retried");
    assert_eq!(logs.count("API request returned non-success status"), 1);
    assert!(logs.contents().contains("/api/participant/p1/info"));
    assert!(logs.contents().contains("404"));

    match response.error_for_status() {
        Err(GatewayError::Status { status, body, .. }) => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, "participant not found");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_gateway_success_is_not_logged_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (logs, _guard) = LogCapture::install();
    gateway_for(&server)
        .authenticated_request("api/user", &cookies("abc123"), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(logs.count("non-success status"), 0);
}

#[test_log::test(tokio::test)]
async fn test_gateway_legacy_policy_sends_bearer_undefined() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let response = legacy_gateway_for(&server)
        .authenticated_request("api/user", &HashMap::new(), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        received_header(&server, 0, "authorization").await.as_deref(),
        Some("Bearer undefined")
    );
}

#[test_log::test(tokio::test)]
async fn test_gateway_require_policy_rejects_missing_token_without_sending() {
    let server = MockServer::start().await;

    let result = gateway_for(&server)
        .authenticated_request("api/user", &HashMap::new(), RequestOptions::get())
        .await;

    assert!(matches!(result, Err(GatewayError::MissingCredential("token"))));
    assert_eq!(received_count(&server).await, 0);
}

#[test_log::test(tokio::test)]
async fn test_gateway_post_returns_backend_json_unmodified() {
    let server = MockServer::start().await;
    let backend_body = r#"{"token":"tok-1","expires":1700000000000,"user_id":"u-1"}"#;
    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .and(header_is("content-type", "application/json"))
        .and(header_is("authorization", "Bearer abc123"))
        .and(body_json(json!({})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_raw(backend_body, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions::post().json(&json!({})).unwrap();
    let response = gateway_for(&server)
        .authenticated_request("api/tokens", &cookies("abc123"), options)
        .await
        .unwrap();

    assert_eq!(response.body().as_ref(), backend_body.as_bytes());
    assert_eq!(response.content_type(), Some("application/json"));
    let decoded: Value = response.json().unwrap();
    assert_eq!(decoded["token"], "tok-1");
}

#[test_log::test(tokio::test)]
async fn test_gateway_json_helpers_distinguish_status_and_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(path("/api/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(path("/api/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);

    let status = gateway
        .authenticated_json::<Value, _>("api/broken", &cookies("t"), RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(status.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

    let decode = gateway
        .public_json::<Value>("api/html", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(decode, GatewayError::Decode { .. }));
}

#[test_log::test(tokio::test)]
async fn test_gateway_unauthenticated_request_has_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/public_tournaments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    gateway_for(&server)
        .request("api/public_tournaments", RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(received_header(&server, 0, "authorization").await, None);
    assert_eq!(
        received_header(&server, 0, "content-type").await.as_deref(),
        Some("application/json")
    );
}

#[test_log::test(tokio::test)]
async fn test_gateway_transport_failure_is_an_error() {
    // Reserve a port, then free it so nothing is listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = ApiGateway::new(GatewayConfig {
        retry_attempts: 1,
        ..GatewayConfig::with_base_url(format!("http://{}", addr))
    })
    .unwrap();

    let result = gateway
        .authenticated_request("api/user", &cookies("abc123"), RequestOptions::get())
        .await;

    match result {
        Err(GatewayError::Transport { url, .. }) => {
            assert_eq!(url, format!("http://{}/api/user", addr));
        }
        other => panic!("expected a transport error, got {other:?}"),
    }
}

fn impatient_gateway(base_url: &str, retry_attempts: usize) -> ApiGateway {
    ApiGateway::new(GatewayConfig {
        timeout: Duration::from_millis(200),
        retry_attempts,
        ..GatewayConfig::with_base_url(base_url)
    })
    .unwrap()
}

#[test_log::test(tokio::test)]
async fn test_gateway_retries_idempotent_call_after_timeout() {
    let (base_url, accepted) = silent_server().await;

    let result = impatient_gateway(&base_url, 2)
        .authenticated_request("api/user", &cookies("abc123"), RequestOptions::get())
        .await;

    match result {
        Err(GatewayError::Transport { source, .. }) => assert!(source.is_timeout()),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[test_log::test(tokio::test)]
async fn test_gateway_never_retries_post() {
    let (base_url, accepted) = silent_server().await;

    let options = RequestOptions::post().json(&json!({})).unwrap();
    let result = impatient_gateway(&base_url, 2)
        .authenticated_request("api/tokens", &cookies("abc123"), options)
        .await;

    assert!(matches!(result, Err(GatewayError::Transport { .. })));
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[test_log::test(tokio::test)]
async fn test_gateway_without_retries_makes_one_attempt() {
    let (base_url, accepted) = silent_server().await;

    let result = impatient_gateway(&base_url, 0)
        .authenticated_request("api/user", &cookies("abc123"), RequestOptions::get())
        .await;

    assert!(result.is_err());
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[test_log::test(tokio::test)]
async fn test_gateway_records_outbound_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
        .mount(&server)
        .await;

    let exporter = CollectingExporter::default();
    let registry = Arc::new(MetricsRegistry::new(false));
    registry.register_exporter(Box::new(exporter.clone())).await;

    gateway_for(&server)
        .with_metrics(registry)
        .authenticated_request("api/user", &cookies("abc123"), RequestOptions::get())
        .await
        .unwrap();

    let records = exporter.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].direction, Direction::Outbound);
    assert_eq!(records[0].method, "GET");
    assert_eq!(records[0].path, "api/user");
    assert_eq!(records[0].status_code, Some(403));
    assert_eq!(records[0].response_size, 4);
    assert!(records[0].is_error());
}
