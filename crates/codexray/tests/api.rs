//! HTTP API tests against the router with an echoing generator.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use codexray::github::GithubClient;
use codexray::server::router;
use codexray::AppState;
use codexray_core::config::{Config, GithubConfig};
use codexray_core::error::ProviderError;
use codexray_core::ledger::AuditContext;
use codexray_core::pipeline::{EchoGenerator, Generator};
use codexray_core::prompt::{build_prompt, PromptMode};
use codexray_core::store::{MemoryStore, RecordStore};
use codexray_core::types::{AnalysisOptions, ModelSelection};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const LIMIT: usize = 10 * 1024 * 1024;

struct Failing;

#[async_trait]
impl Generator for Failing {
    async fn generate(
        &self,
        _prompt: &str,
        selection: &ModelSelection,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::new(
            selection.provider,
            Some(429),
            "quota exceeded",
        ))
    }
}

fn github_client(base: &str) -> GithubClient {
    let cfg = GithubConfig {
        api_base_url: base.to_string(),
        oauth_base_url: base.to_string(),
        client_id_env: "CODEXRAY_TEST_GH_ID".to_string(),
        client_secret_env: "CODEXRAY_TEST_GH_SECRET".to_string(),
        ..GithubConfig::default()
    };
    GithubClient::new(&cfg, reqwest::Client::new())
}

fn state_with(generator: Arc<dyn Generator>) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        &Config::default(),
        generator,
        store.clone(),
        github_client("http://127.0.0.1:9"),
    );
    (state, store)
}

fn app(state: AppState) -> Router {
    router(state, LIMIT)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_is_ok() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let (status, body) = send(&app(state), empty_request("GET", "/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "result": "ok" }));
}

#[tokio::test]
async fn analyze_stores_input_and_echoed_prompt() {
    let (state, store) = state_with(Arc::new(EchoGenerator));
    let app = app(state);
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/analyze",
            json!({ "code": "console.log(1)", "options": {}, "userPrompt": "" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let expected = build_prompt(
        "console.log(1)",
        &AnalysisOptions::default(),
        "",
        PromptMode::Analysis,
    );
    assert_eq!(body["result"]["inputText"], "console.log(1)");
    assert_eq!(body["result"]["resultText"], expected);
    assert_eq!(body["result"]["modelSelection"]["provider"], "openai");

    let stored = store.list().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].input_text, "console.log(1)");
    assert_eq!(stored[0].result_text, expected);
}

#[tokio::test]
async fn large_input_stores_original_code_not_summaries() {
    let (state, store) = state_with(Arc::new(EchoGenerator));
    let line = format!("{}\n", "x".repeat(99));
    let code = line.repeat(400);
    assert!(code.chars().count() > 15_000);

    let (status, body) = send(
        &app(state),
        json_request(
            "POST",
            "/api/analyze",
            json!({ "code": code, "options": {}, "userPrompt": "" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["inputText"], code.as_str());
    let stored = store.list().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].input_text, code);
    assert!(stored[0].result_text.contains("---SUMMARY---"));
}

#[tokio::test]
async fn analyze_passes_options_and_model() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let (status, body) = send(
        &app(state),
        json_request(
            "POST",
            "/api/analyze",
            json!({
                "code": "fn main() {}",
                "options": { "security": true, "performance": false },
                "userPrompt": "check unsafe blocks",
                "model": { "provider": "claude", "model": "claude-3-haiku" }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let result = body["result"]["resultText"].as_str().unwrap();
    assert!(result.contains("check unsafe blocks"));
    assert_eq!(body["result"]["options"]["security"], true);
    assert_eq!(body["result"]["userInstruction"], "check unsafe blocks");
    assert_eq!(body["result"]["modelSelection"]["provider"], "claude");
    assert_eq!(body["result"]["modelSelection"]["model"], "claude-3-haiku");
}

#[tokio::test]
async fn blank_code_is_rejected_without_storing() {
    let (state, store) = state_with(Arc::new(EchoGenerator));
    let (status, body) = send(
        &app(state),
        json_request("POST", "/api/analyze", json!({ "code": "   \n" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("no code"));
    assert!(store.list().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_structured_400() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let req = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app(state), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn provider_failure_is_502_and_not_persisted() {
    let (state, store) = state_with(Arc::new(Failing));
    let (status, body) = send(
        &app(state),
        json_request("POST", "/api/analyze", json!({ "code": "x = 1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("quota exceeded"));
    assert!(store.list().unwrap().is_empty());
}

#[tokio::test]
async fn analyze_file_reads_multipart_fields() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let boundary = "codexray-test-boundary";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"main.py\"\r\n\
         Content-Type: text/x-python\r\n\r\n\
         print('hi')\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"options\"\r\n\r\n\
         {{\"testing\":true}}\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"userPrompt\"\r\n\r\n\
         focus on tests\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"model\"\r\n\r\n\
         {{\"provider\":\"gemini\"}}\r\n\
         --{b}--\r\n",
        b = boundary
    );
    let req = Request::builder()
        .method("POST")
        .uri("/api/analyze/file")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app(state), req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["result"]["inputText"], "print('hi')");
    assert_eq!(body["result"]["options"]["testing"], true);
    assert_eq!(body["result"]["userInstruction"], "focus on tests");
    assert_eq!(body["result"]["modelSelection"]["provider"], "gemini");
}

#[tokio::test]
async fn analyze_file_requires_file_field() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let boundary = "b0";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"userPrompt\"\r\n\r\nhello\r\n--{boundary}--\r\n"
    );
    let req = Request::builder()
        .method("POST")
        .uri("/api/analyze/file")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(&app(state), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "no file uploaded");
}

#[tokio::test]
async fn history_get_and_delete() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let app = app(state);
    let (_, created) = send(
        &app,
        json_request("POST", "/api/analyze", json!({ "code": "a" })),
    )
    .await;
    let id = created["result"]["id"].as_str().unwrap().to_string();

    let (status, list) = send(&app, empty_request("GET", "/api/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["result"].as_array().unwrap().len(), 1);

    let (status, one) = send(&app, empty_request("GET", &format!("/api/history/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["result"]["id"], id.as_str());

    let (status, _) = send(&app, empty_request("DELETE", &format!("/api/history/{id}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, missing) = send(&app, empty_request("GET", &format!("/api/history/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["success"], false);

    let (status, _) = send(&app, empty_request("DELETE", &format!("/api/history/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn github_analysis_rejects_bad_url_and_revoked_token() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    state
        .ledger
        .revoke("gho_revoked_token", &AuditContext::default())
        .unwrap();
    let app = app(state);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/analyze/github",
            json!({ "repoUrl": "not-a-url" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("invalid GitHub repository URL"));

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/analyze/github",
            json!({ "repoUrl": "https://github.com/acme/widgets", "githubToken": "gho_revoked_token" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn repos_requires_bearer_token() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let (status, body) = send(&app(state), empty_request("GET", "/api/github/repos")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn revoke_then_repos_is_unauthorized() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let ledger = state.ledger.clone();
    ledger.remember("gho_live_token", &AuditContext::default());
    let app = app(state);

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/github/integration")
        .header(header::AUTHORIZATION, "Bearer gho_live_token")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["revoked"], true);
    assert!(ledger.is_revoked("gho_live_token"));

    let req = Request::builder()
        .method("GET")
        .uri("/api/github/repos")
        .header(header::AUTHORIZATION, "Bearer gho_live_token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoke_accepts_token_in_body_and_requires_one() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let ledger = state.ledger.clone();
    let app = app(state);

    let (status, _) = send(
        &app,
        json_request("DELETE", "/api/github/integration", json!({ "token": "gho_body" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ledger.is_revoked("gho_body"));

    let (status, body) = send(&app, empty_request("DELETE", "/api/github/integration")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "no token provided");
}

#[tokio::test]
async fn callback_requires_code() {
    let (state, _) = state_with(Arc::new(EchoGenerator));
    let (status, body) = send(&app(state), empty_request("GET", "/api/github/callback")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "missing OAuth code");
}
