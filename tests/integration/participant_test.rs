use reqwest::{header, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{browser, received_count, spawn_app};

const FORM: &str = "application/x-www-form-urlencoded";
const TOKEN: &str = "token=tok-1";

async fn get_json(url: String) -> Value {
    let response = browser()
        .get(url)
        .header(header::COOKIE, TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

#[test_log::test(tokio::test)]
async fn test_participant_home_shapes_overview() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/participant/p1"))
        .and(header_is("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Ada",
            "rounds": [{ "uuid": "r1" }],
            "feedback_submissions": [],
            "role": { "type": "Speaker" },
            "secret_notes": "dropped",
        })))
        .expect(1)
        .mount(&api)
        .await;
    let app = spawn_app(&api.uri()).await;

    let body = get_json(format!("{}/tournament/t1/home/p1", app)).await;

    assert_eq!(
        body,
        json!({
            "name": "Ada",
            "rounds": [{ "uuid": "r1" }],
            "feedback_submissions": [],
            "tournamentId": "t1",
            "role": { "type": "Speaker" },
        })
    );
}

#[test_log::test(tokio::test)]
async fn test_home_without_participant_redirects_by_cookie() {
    let api = MockServer::start().await;
    let app = spawn_app(&api.uri()).await;

    let response = browser()
        .get(format!("{}/tournament/t1/home", app))
        .header(header::COOKIE, "token=tok-1; participant_id:t1=p1")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/tournament/t1/home/p1");
}

#[test_log::test(tokio::test)]
async fn test_release_motion_to_non_aligned_posts_debate_state() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/debate/d1/state"))
        .and(body_json(json!({ "release": true, "state": "NonAlignedMotionRelease" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&api)
        .await;
    let app = spawn_app(&api.uri()).await;

    let response = browser()
        .post(format!("{}/tournament/t1/home/p1/release-motion", app))
        .header(header::COOKIE, TOKEN)
        .header(header::CONTENT_TYPE, FORM)
        .body("debateId=d1&release=true")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "isMotionReleasedToNonAligned": true }));
}

#[test_log::test(tokio::test)]
async fn test_clashes_without_edit_skips_participant_list() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/participant/p1/clashes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "declared_clashes": [{ "uuid": "a1" }],
        })))
        .mount(&api)
        .await;
    let app = spawn_app(&api.uri()).await;

    let body = get_json(format!("{}/tournament/t1/home/p1/clashes", app)).await;

    assert_eq!(body, json!({ "declared_clashes": [{ "uuid": "a1" }], "isEditing": false }));
    assert_eq!(received_count(&api).await, 1);
}

#[test_log::test(tokio::test)]
async fn test_clashes_in_edit_mode_lists_targets() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/participant/p1/clashes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "declared_clashes": [] })))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tournament/t1/participants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "adjudicators": [{ "uuid": "a1", "display_name": "Ada" }],
            "teams": [{ "members": [{ "uuid": "s1", "display_name": "Sam" }] }],
        })))
        .expect(1)
        .mount(&api)
        .await;
    let app = spawn_app(&api.uri()).await;

    let body = get_json(format!("{}/tournament/t1/home/p1/clashes?edit", app)).await;

    assert_eq!(body["isEditing"], true);
    assert_eq!(
        body["targets"],
        json!([
            { "uuid": "a1", "participant_name": "Ada", "participant_role": "adjudicator" },
            { "uuid": "s1", "participant_name": "Sam", "participant_role": "speaker" },
        ])
    );
}

#[test_log::test(tokio::test)]
async fn test_feedback_summary_is_renamed() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/participant/p1/feedback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "individual_values": [1, 2],
            "summary_values": { "avg": 1.5 },
        })))
        .mount(&api)
        .await;
    let app = spawn_app(&api.uri()).await;

    let body = get_json(format!("{}/tournament/t1/home/p1/feedback", app)).await;

    assert_eq!(
        body,
        json!({ "individualValues": [1, 2], "summaryValues": { "avg": 1.5 } })
    );
}

#[test_log::test(tokio::test)]
async fn test_settings_load_and_save() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/participant/p1/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "is_anonymous": true })))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/participant/p1/settings"))
        .and(body_json(json!({ "is_anonymous": false })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&api)
        .await;
    let app = spawn_app(&api.uri()).await;

    let loaded = get_json(format!("{}/tournament/t1/home/p1/settings", app)).await;
    assert_eq!(loaded, json!({ "isAnonymous": true }));

    // An unticked box sends no field at all.
    let response = browser()
        .post(format!("{}/tournament/t1/home/p1/settings", app))
        .header(header::COOKIE, TOKEN)
        .header(header::CONTENT_TYPE, FORM)
        .body("")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved: Value = response.json().await.unwrap();
    assert_eq!(saved, json!({ "isAnonymous": false }));
}

#[test_log::test(tokio::test)]
async fn test_tournament_pages_relay_api_bodies() {
    let api = MockServer::start().await;
    for (api_path, body) in [
        ("/api/tournament/t1/tab", json!({ "speaker_tab": [] })),
        ("/api/tournament/t1/participants", json!({ "teams": [] })),
        ("/api/rounds/r1/draw", json!({ "debates": [] })),
    ] {
        Mock::given(method("GET"))
            .and(path(api_path))
            .and(header_is("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&api)
            .await;
    }
    let app = spawn_app(&api.uri()).await;

    assert_eq!(
        get_json(format!("{}/tournament/t1/tab", app)).await,
        json!({ "speaker_tab": [] })
    );
    assert_eq!(
        get_json(format!("{}/tournament/t1/participants", app)).await,
        json!({ "teams": [] })
    );
    assert_eq!(
        get_json(format!("{}/tournament/t1/round/r1/draw", app)).await,
        json!({ "debates": [] })
    );
}

#[test_log::test(tokio::test)]
async fn test_debate_and_submission_pages_pick_ballot() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/debate/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ballot": { "speeches": [] },
            "extra": 1,
        })))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/submission/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ballot": { "speeches": [] },
            "debate_id": "d1",
        })))
        .mount(&api)
        .await;
    let app = spawn_app(&api.uri()).await;

    assert_eq!(
        get_json(format!("{}/tournament/t1/debate/d1", app)).await,
        json!({ "ballot": { "speeches": [] } })
    );
    assert_eq!(
        get_json(format!("{}/tournament/t1/submission/b1", app)).await,
        json!({ "ballot": { "speeches": [] }, "debate": { "uuid": "d1" } })
    );
}

#[test_log::test(tokio::test)]
async fn test_participant_page_rejects_encoded_traversal() {
    let api = MockServer::start().await;
    let app = spawn_app(&api.uri()).await;

    let response = browser()
        .get(format!("{}/tournament/t1/home/..%2F..%2Fuser/settings", app))
        .header(header::COOKIE, TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(received_count(&api).await, 0);
}
