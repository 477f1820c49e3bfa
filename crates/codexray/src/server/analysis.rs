use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use codexray_core::pipeline::AnalysisPipeline;
use codexray_core::types::{AnalysisOptions, AnalysisRecord, AnalysisRequest, ModelSelection};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;

use super::{audit_context, ApiError, ApiResult, ApiSuccess};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzePayload {
    pub code: Option<String>,
    pub options: Option<AnalysisOptions>,
    pub user_prompt: Option<String>,
    pub model: Option<ModelSelection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubAnalyzePayload {
    pub repo_url: Option<String>,
    pub options: Option<AnalysisOptions>,
    pub user_prompt: Option<String>,
    pub model: Option<ModelSelection>,
    pub github_token: Option<String>,
}

fn request(
    input_text: String,
    options: Option<AnalysisOptions>,
    user_prompt: Option<String>,
    model: Option<ModelSelection>,
) -> AnalysisRequest {
    AnalysisRequest {
        input_text,
        options: options.unwrap_or_default(),
        user_instruction: user_prompt.unwrap_or_default(),
        model_selection: model.unwrap_or_default().normalized(),
    }
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
}

/// Pipeline then persistence. Nothing is stored when the pipeline fails.
async fn run_analysis(state: &AppState, req: AnalysisRequest) -> Result<AnalysisRecord, ApiError> {
    let pipeline = AnalysisPipeline::new(state.generator.as_ref(), state.pipeline);
    let result = pipeline.analyze(&req).await?;
    let record = state.store.create(req.into_new_analysis(result))?;
    info!(id = %record.id, provider = %record.model_selection.provider, "analysis stored");
    Ok(record)
}

pub async fn analyze_code(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzePayload>, JsonRejection>,
) -> ApiResult<AnalysisRecord> {
    let Json(payload) = payload.map_err(bad_json)?;
    let req = request(
        payload.code.unwrap_or_default(),
        payload.options,
        payload.user_prompt,
        payload.model,
    );
    run_analysis(&state, req).await.map(ApiSuccess)
}

pub async fn analyze_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<AnalysisRecord> {
    let mut code = None;
    let mut options = None;
    let mut user_prompt = None;
    let mut model = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart field {name}: {e}")))?;
        match name.as_str() {
            "file" => code = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "options" => {
                let raw = String::from_utf8_lossy(&bytes);
                options = Some(
                    AnalysisOptions::from_json_str(&raw)
                        .map_err(|e| ApiError::bad_request(format!("invalid options: {e}")))?,
                );
            }
            "userPrompt" => user_prompt = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "model" => {
                let raw = String::from_utf8_lossy(&bytes);
                if !raw.trim().is_empty() {
                    model = Some(
                        serde_json::from_str(raw.trim())
                            .map_err(|e| ApiError::bad_request(format!("invalid model: {e}")))?,
                    );
                }
            }
            _ => {}
        }
    }

    let code = code.ok_or_else(|| ApiError::bad_request("no file uploaded"))?;
    run_analysis(&state, request(code, options, user_prompt, model))
        .await
        .map(ApiSuccess)
}

pub async fn analyze_github(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<GithubAnalyzePayload>, JsonRejection>,
) -> ApiResult<AnalysisRecord> {
    let Json(payload) = payload.map_err(bad_json)?;
    let token = payload
        .github_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(token) = token.as_deref() {
        if state.ledger.is_revoked(token) {
            return Err(ApiError::unauthorized("GitHub token has been revoked"));
        }
        state
            .ledger
            .mark_used(token, &audit_context(&headers, peer).with_reason("analyze_github"));
    }

    let repo_url = payload.repo_url.unwrap_or_default();
    let bundle = state
        .github
        .fetch_repo_text(&repo_url, token.as_deref())
        .await?;
    info!(
        files = bundle.stats.file_count,
        estimated_tokens = bundle.stats.estimated_tokens,
        "repository bundled"
    );
    let req = request(
        bundle.text,
        payload.options,
        payload.user_prompt,
        payload.model,
    );
    run_analysis(&state, req).await.map(ApiSuccess)
}

pub async fn list_history(State(state): State<AppState>) -> ApiResult<Vec<AnalysisRecord>> {
    Ok(ApiSuccess(state.store.list()?))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AnalysisRecord> {
    state
        .store
        .get(&id)?
        .map(ApiSuccess)
        .ok_or_else(|| ApiError::not_found(format!("analysis {id} not found")))
}

pub async fn delete_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    if state.store.delete(&id)? {
        Ok(ApiSuccess(json!({ "id": id, "deleted": true })))
    } else {
        Err(ApiError::not_found(format!("analysis {id} not found")))
    }
}
