use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::Redirect;
use axum::Json;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;

use super::{audit_context, bearer_token, ApiError, ApiResult, ApiSuccess};
use crate::github::RepoSummary;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RevokeBody {
    pub token: Option<String>,
}

pub async fn login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let url = state.github.authorize_url()?;
    Ok(Redirect::temporary(&url))
}

pub async fn callback(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    let code = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("missing OAuth code"))?;
    let token = state.github.exchange_code(&code).await?;
    state
        .ledger
        .remember(&token, &audit_context(&headers, peer).with_reason("oauth_callback"));

    let target = Url::parse_with_params(
        &format!("{}/github", state.frontend_base_url),
        &[("token", token.as_str())],
    )
    .map_err(|e| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Redirect::temporary(target.as_str()))
}

pub async fn repos(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> ApiResult<Vec<RepoSummary>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("missing GitHub bearer token"))?;
    if state.ledger.is_revoked(&token) {
        return Err(ApiError::unauthorized("GitHub token has been revoked"));
    }
    state
        .ledger
        .mark_used(&token, &audit_context(&headers, peer).with_reason("list_repos"));
    let repos = state.github.list_repos(&token).await?;
    Ok(ApiSuccess(repos))
}

pub async fn revoke(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Option<Json<RevokeBody>>,
) -> ApiResult<serde_json::Value> {
    let token = bearer_token(&headers)
        .or_else(|| body.and_then(|Json(b)| b.token))
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    state
        .ledger
        .revoke(&token, &audit_context(&headers, peer).with_reason("user_disconnect"))?;
    state.ledger.clear_session(&token);
    info!("github integration disconnected");
    Ok(ApiSuccess(json!({ "revoked": true })))
}
