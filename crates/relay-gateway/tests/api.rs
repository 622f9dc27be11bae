// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the HTTP surface: streaming scenarios against a
//! scripted upstream, search, envelopes, and rate limiting.

use axum::body::to_bytes;
use axum::http::{Request, StatusCode};
use axum::Router;
use relay_config::RelayConfig;
use relay_core::types::{ProfileDraft, Role, SessionDraft};
use relay_gateway::sse::decode_frames;
use relay_gateway::{server::build_router, AppState};
use relay_openrouter::OpenRouterClient;
use relay_storage::{Database, Repository};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestApp {
    router: Router,
    state: AppState,
}

async fn test_app(api_key: Option<&str>, upstream_url: &str) -> TestApp {
    let mut config = RelayConfig::default();
    config.openrouter.api_key = api_key.map(str::to_string);
    config.openrouter.base_url = upstream_url.to_string();
    let db = Database::open_in_memory().await.unwrap();
    let repo = Repository::new(db);
    let client = OpenRouterClient::new(config.openrouter.clone()).unwrap();
    let state = AppState::new(repo, client, config);
    let router = build_router(state.clone()).unwrap();
    TestApp { router, state }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(chunk);
        body.push_str("\n\n");
    }
    body
}

#[tokio::test]
async fn health_returns_ok_with_request_id_and_limit_headers() {
    let app = test_app(None, "http://unused.test").await;
    let response = app.router.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(!request_id.is_empty());
    assert_eq!(
        response
            .headers()
            .get("x-ratelimit-limit")
            .and_then(|v| v.to_str().ok()),
        Some("300 per minute")
    );
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn inbound_request_id_is_echoed() {
    let app = test_app(None, "http://unused.test").await;
    let request = Request::builder()
        .uri("/api/health")
        .header("x-request-id", "trace-me-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("trace-me-42")
    );
}

#[tokio::test]
async fn stream_without_api_key_emits_single_error_frame() {
    let app = test_app(None, "http://unused.test").await;
    let response = app
        .router
        .oneshot(get("/api/stream?session_id=test-session&model_id=test-model"))
        .await
        .unwrap();

    // Always 200 with an in-band error so EventSource clients can parse it.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    let text = body_text(response).await;
    let frames = decode_frames(&text);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].0, "error");
    let payload: Value = serde_json::from_str(&frames[0].1).unwrap();
    assert_eq!(payload["error_code"], "MISSING_API_KEY");
    assert_eq!(payload["status"], 400);
    assert_eq!(payload["message"], "OpenRouter API key is not configured");
    assert!(payload["request_id"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn stream_with_unknown_session_reports_not_found_in_band() {
    let app = test_app(Some("sk-or-test"), "http://unused.test").await;
    let response = app
        .router
        .oneshot(get("/api/stream?session_id=missing&model_id=m"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let frames = decode_frames(&body_text(response).await);
    assert_eq!(frames.len(), 1);
    let payload: Value = serde_json::from_str(&frames[0].1).unwrap();
    assert_eq!(payload["error_code"], "SESSION_NOT_FOUND");
    assert_eq!(payload["status"], 404);
    assert_eq!(payload["resource_id"], "missing");
}

#[tokio::test]
async fn stream_with_unknown_profile_reports_not_found_in_band() {
    let app = test_app(Some("sk-or-test"), "http://unused.test").await;
    let session = app
        .state
        .repo
        .create_session(SessionDraft::default())
        .await
        .unwrap();
    let uri = format!("/api/stream?session_id={}&model_id=m&profile_id=999", session.id);
    let response = app.router.oneshot(get(&uri)).await.unwrap();
    let frames = decode_frames(&body_text(response).await);
    assert_eq!(frames.len(), 1);
    let payload: Value = serde_json::from_str(&frames[0].1).unwrap();
    assert_eq!(payload["error_code"], "PROFILE_NOT_FOUND");
}

#[tokio::test]
async fn stream_happy_path_relays_tokens_and_persists_results() {
    let upstream = MockServer::start().await;
    let body = sse_body(&[
        r#"{"choices":[{"delta":{"content":"H"}}]}"#,
        r#"{"choices":[{"delta":{"content":"i"}}]}"#,
        r#"{"choices":[{"delta":{}}],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#,
        "[DONE]",
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&upstream)
        .await;

    let app = test_app(Some("sk-or-test"), &upstream.uri()).await;
    app.state
        .repo
        .sync_models(vec![relay_core::types::ModelSync {
            id: "m".to_string(),
            name: "Model M".to_string(),
            context_length: Some(8192),
            pricing_prompt: Some(1e-6),
            pricing_completion: Some(2e-6),
            is_reasoning: false,
        }])
        .await
        .unwrap();
    let profile = app
        .state
        .repo
        .create_profile(ProfileDraft {
            name: "p1".to_string(),
            system_prompt: Some("You are helpful.".to_string()),
            temperature: 0.5,
            max_tokens: 2048,
            preset: None,
        })
        .await
        .unwrap();
    let session = app
        .state
        .repo
        .create_session(SessionDraft {
            profile_id: Some(profile.id),
            ..Default::default()
        })
        .await
        .unwrap();
    app.state
        .repo
        .append_message(&session.id, Role::User, "hi")
        .await
        .unwrap();

    let uri = format!("/api/stream?session_id={}&model_id=m", session.id);
    let response = app.router.oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let frames = decode_frames(&body_text(response).await);

    let names: Vec<&str> = frames.iter().map(|(e, _)| e.as_str()).collect();
    assert_eq!(names, vec!["start", "token", "token", "done"]);

    let start: Value = serde_json::from_str(&frames[0].1).unwrap();
    assert_eq!(start["session_id"], session.id.as_str());
    assert_eq!(start["model_id"], "m");

    let t1: Value = serde_json::from_str(&frames[1].1).unwrap();
    let t2: Value = serde_json::from_str(&frames[2].1).unwrap();
    assert_eq!(t1["token"], "H");
    assert_eq!(t2["token"], "i");

    let done: Value = serde_json::from_str(&frames[3].1).unwrap();
    assert_eq!(done["assistant"], "Hi");
    assert_eq!(done["usage"]["prompt_tokens"], 3);
    assert_eq!(done["usage"]["completion_tokens"], 2);
    assert_eq!(done["usage"]["total_tokens"], 5);

    // Exactly one new assistant row with the accumulated content.
    let messages = app.state.repo.list_messages(&session.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hi");

    // One usage row costed at tokens x unit price.
    let usage = app
        .state
        .repo
        .list_usage_for_session(&session.id)
        .await
        .unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].total_tokens, 5);
    assert!((usage[0].cost_usd - 7e-6).abs() < 1e-12);
    assert_eq!(usage[0].profile_id, Some(profile.id));

    // The synthetic system prompt went upstream but was never persisted.
    let sent = &upstream.received_requests().await.unwrap()[0];
    let sent_body: Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(sent_body["messages"][0]["role"], "system");
    assert_eq!(sent_body["messages"][0]["content"], "You are helpful.");
    assert_eq!(sent_body["messages"][1]["role"], "user");
    assert_eq!(sent_body["temperature"], 0.5);
    assert!(messages.iter().all(|m| m.role != Role::System));
}

#[tokio::test]
async fn mid_stream_upstream_failure_discards_partial_output() {
    let upstream = MockServer::start().await;
    let body = sse_body(&[
        r#"{"choices":[{"delta":{"content":"pa"}}]}"#,
        r#"{"choices":[{"delta":{"content":"rt"}}]}"#,
        r#"{"error":{"code":500,"message":"provider exploded"}}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&upstream)
        .await;

    let app = test_app(Some("sk-or-test"), &upstream.uri()).await;
    let session = app
        .state
        .repo
        .create_session(SessionDraft::default())
        .await
        .unwrap();
    app.state
        .repo
        .append_message(&session.id, Role::User, "hi")
        .await
        .unwrap();

    let uri = format!("/api/stream?session_id={}&model_id=m", session.id);
    let response = app.router.oneshot(get(&uri)).await.unwrap();
    let frames = decode_frames(&body_text(response).await);

    let names: Vec<&str> = frames.iter().map(|(e, _)| e.as_str()).collect();
    assert_eq!(names, vec!["start", "token", "token", "error"]);
    let error: Value = serde_json::from_str(&frames[3].1).unwrap();
    assert_eq!(error["error_code"], "OPENROUTER_ERROR");
    assert_eq!(error["status"], 500);

    // The partial assistant output and usage were not persisted.
    let messages = app.state.repo.list_messages(&session.id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(app
        .state
        .repo
        .list_usage_for_session(&session.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn stream_uses_explicit_profile_over_session_default() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&["[DONE]"])),
        )
        .mount(&upstream)
        .await;

    let app = test_app(Some("sk-or-test"), &upstream.uri()).await;
    let default_profile = app
        .state
        .repo
        .create_profile(ProfileDraft {
            name: "default".to_string(),
            system_prompt: None,
            temperature: 0.2,
            max_tokens: 256,
            preset: None,
        })
        .await
        .unwrap();
    let explicit_profile = app
        .state
        .repo
        .create_profile(ProfileDraft {
            name: "explicit".to_string(),
            system_prompt: None,
            temperature: 0.9,
            max_tokens: 512,
            preset: Some("coding".to_string()),
        })
        .await
        .unwrap();
    let session = app
        .state
        .repo
        .create_session(SessionDraft {
            profile_id: Some(default_profile.id),
            ..Default::default()
        })
        .await
        .unwrap();

    let uri = format!(
        "/api/stream?session_id={}&model_id=openai/gpt-4o&profile_id={}",
        session.id, explicit_profile.id
    );
    let response = app.router.oneshot(get(&uri)).await.unwrap();
    let frames = decode_frames(&body_text(response).await);
    let start: Value = serde_json::from_str(&frames[0].1).unwrap();
    assert_eq!(start["model_id"], "openai/gpt-4o@preset/coding");

    let sent = &upstream.received_requests().await.unwrap()[0];
    let sent_body: Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(sent_body["temperature"], 0.9);
    assert_eq!(sent_body["max_tokens"], 512);
}

#[tokio::test]
async fn empty_system_prompt_sends_only_the_user_turn() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&["[DONE]"])),
        )
        .mount(&upstream)
        .await;

    let app = test_app(Some("sk-or-test"), &upstream.uri()).await;
    let profile = app
        .state
        .repo
        .create_profile(ProfileDraft {
            name: "blank".to_string(),
            system_prompt: Some("   ".to_string()),
            temperature: 0.7,
            max_tokens: 2048,
            preset: None,
        })
        .await
        .unwrap();
    let session = app
        .state
        .repo
        .create_session(SessionDraft {
            profile_id: Some(profile.id),
            ..Default::default()
        })
        .await
        .unwrap();
    app.state
        .repo
        .append_message(&session.id, Role::User, "hi")
        .await
        .unwrap();

    let uri = format!("/api/stream?session_id={}&model_id=m", session.id);
    let response = app.router.oneshot(get(&uri)).await.unwrap();
    // Drain the stream body so the upstream call completes.
    body_text(response).await;

    let sent = &upstream.received_requests().await.unwrap()[0];
    let sent_body: Value = serde_json::from_slice(&sent.body).unwrap();
    let messages = sent_body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "hi");
}

#[tokio::test]
async fn search_endpoint_returns_ranked_hits() {
    let app = test_app(None, "http://unused.test").await;
    let session = app
        .state
        .repo
        .create_session(SessionDraft::default())
        .await
        .unwrap();
    app.state
        .repo
        .append_message(&session.id, Role::User, "Hello world")
        .await
        .unwrap();
    app.state
        .repo
        .append_message(&session.id, Role::User, "world peace")
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/messages/search?query=world"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let hits = body_json(response).await;
    assert_eq!(hits.as_array().unwrap().len(), 2);

    let response = app
        .router
        .clone()
        .oneshot(get("/api/messages/search?query=%22hello%20world%22"))
        .await
        .unwrap();
    let hits = body_json(response).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert!(hits[0]["snippet"].as_str().unwrap().contains("<mark>"));

    let response = app
        .router
        .oneshot(get("/api/messages/search?query=%22unbalanced"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error_code"], "INVALID_QUERY");
}

#[tokio::test]
async fn missing_profile_envelope_is_canonical() {
    let app = test_app(None, "http://unused.test").await;
    let response = app.router.oneshot(get("/api/profiles/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let error = body_json(response).await;
    assert_eq!(error["error_code"], "PROFILE_NOT_FOUND");
    assert_eq!(error["message"], "Profile not found");
    assert_eq!(error["resource_type"], "profile");
    assert_eq!(error["resource_id"], "999");
    assert_eq!(error["request_id"], request_id.as_str());
    assert!(error.get("status").is_none());
}

#[tokio::test]
async fn exhausted_rate_limit_answers_429_with_retry_after() {
    let mut config = RelayConfig::default();
    config.ratelimit.health_check = "1 per minute".to_string();
    let db = Database::open_in_memory().await.unwrap();
    let repo = Repository::new(db);
    let client = OpenRouterClient::new(config.openrouter.clone()).unwrap();
    let state = AppState::new(repo, client, config);
    let router = build_router(state).unwrap();

    let first = router.clone().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = second
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap();
    assert!(retry_after >= 1 && retry_after <= 60);
    assert_eq!(
        second
            .headers()
            .get("x-ratelimit-limit")
            .and_then(|v| v.to_str().ok()),
        Some("1 per minute")
    );
    let error = body_json(second).await;
    assert_eq!(error["error_code"], "RATE_LIMITED");
}

#[tokio::test]
async fn disabled_rate_limiting_admits_everything() {
    let mut config = RelayConfig::default();
    config.ratelimit.enabled = false;
    config.ratelimit.health_check = "1 per minute".to_string();
    let db = Database::open_in_memory().await.unwrap();
    let repo = Repository::new(db);
    let client = OpenRouterClient::new(config.openrouter.clone()).unwrap();
    let state = AppState::new(repo, client, config);
    let router = build_router(state).unwrap();

    for _ in 0..5 {
        let response = router.clone().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn model_sync_without_key_is_a_json_400() {
    let app = test_app(None, "http://unused.test").await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/models/sync")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["error_code"], "MISSING_API_KEY");
}

#[tokio::test]
async fn model_sync_is_idempotent_for_same_catalog() {
    let upstream = MockServer::start().await;
    let catalog = serde_json::json!({
        "data": [{
            "id": "openai/gpt-4o",
            "name": "GPT-4o",
            "pricing": {"prompt": "0.000001", "completion": "0.000002"}
        }]
    });
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&catalog))
        .mount(&upstream)
        .await;

    let app = test_app(Some("sk-or-test"), &upstream.uri()).await;
    for _ in 0..2 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/models/sync")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"synced": 1}));
    }
    let models = app
        .state
        .repo
        .list_models(Default::default())
        .await
        .unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].pricing_prompt, Some(1e-6));
}
