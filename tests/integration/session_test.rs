use http::StatusCode;
use participant_gateway::{session::BrowserSession, ApiGateway, GatewayConfig, RequestOptions};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{gateway_for, received_count, spawn_app};

fn far_future_ms() -> i64 {
    chrono::Utc::now().timestamp_millis() + 60 * 60 * 1000
}

#[test_log::test(tokio::test)]
async fn test_browser_session_reuses_token_until_invalidated() {
    let frontend = MockServer::start().await;
    let api = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(header("cookie", "token=session-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": "t1", "expires": far_future_ms() })),
        )
        .expect(2)
        .mount(&frontend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "identifier": "ada" })))
        .expect(3)
        .mount(&api)
        .await;

    let session = BrowserSession::new(gateway_for(&api), gateway_for(&frontend), "session-1").unwrap();

    for _ in 0..2 {
        let response = session.request("api/user", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(received_count(&frontend).await, 1);

    session.invalidate().await;
    session.request("api/user", RequestOptions::get()).await.unwrap();
    assert_eq!(received_count(&frontend).await, 2);
}

#[test_log::test(tokio::test)]
async fn test_browser_session_authenticates_through_gateway_auth_route() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .and(header("authorization", "Bearer session-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "short-lived",
            "expires": far_future_ms(),
        })))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .and(header("authorization", "Bearer short-lived"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "identifier": "ada" })))
        .expect(2)
        .mount(&api)
        .await;

    let app = spawn_app(&api.uri()).await;
    let frontend = ApiGateway::new(GatewayConfig::with_base_url(app)).unwrap();
    let session = BrowserSession::new(gateway_for(&api), frontend, "session-1").unwrap();

    for _ in 0..2 {
        let response = session.request("api/user", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let user: serde_json::Value = response.json().unwrap();
        assert_eq!(user["identifier"], "ada");
    }
}

#[test_log::test(tokio::test)]
async fn test_browser_session_surfaces_auth_failure() {
    let frontend = MockServer::start().await;
    let api = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(401).set_body_string("no session"))
        .mount(&frontend)
        .await;

    let session = BrowserSession::new(gateway_for(&api), gateway_for(&frontend), "expired").unwrap();
    let error = session
        .request("api/user", RequestOptions::get())
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(received_count(&api).await, 0);
}

#[test]
fn test_browser_session_rejects_unusable_cookie_value() {
    let server_url = "http://127.0.0.1:9";
    let gateway = || ApiGateway::new(GatewayConfig::with_base_url(server_url)).unwrap();
    let result = BrowserSession::new(gateway(), gateway(), "bad\nvalue");
    assert!(result.is_err());
}
