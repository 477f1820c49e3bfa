//! The JSON HTTP API.

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::Router;
use codexray_core::ledger::AuditContext;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::AppState;

pub mod analysis;
pub mod error;
pub mod integration;

pub use error::{ApiError, ApiResult, ApiSuccess};

pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analysis::analyze_code))
        .route("/api/analyze/file", post(analysis::analyze_file))
        .route("/api/analyze/github", post(analysis::analyze_github))
        .route("/api/history", get(analysis::list_history))
        .route(
            "/api/history/:id",
            get(analysis::get_history).delete(analysis::delete_history),
        )
        .route("/api/github/login", get(integration::login))
        .route("/api/github/callback", get(integration::callback))
        .route("/api/github/repos", get(integration::repos))
        .route("/api/github/integration", delete(integration::revoke))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves until ctrl-c.
pub async fn serve(state: AppState, bind: &str, body_limit: usize) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "codexray listening");
    let app = router(state, body_limit).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

async fn health() -> ApiSuccess<&'static str> {
    ApiSuccess("ok")
}

/// Caller identity for token audit lines: first `x-forwarded-for` hop, else
/// the socket peer, plus the user agent.
pub fn audit_context(headers: &HeaderMap, peer: Option<ConnectInfo<SocketAddr>>) -> AuditContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    AuditContext {
        ip: header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string())),
        user_agent: header("user-agent").map(str::to_string),
        reason: None,
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
