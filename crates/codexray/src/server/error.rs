use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use codexray_core::error::{AnalysisError, LedgerError, RepoError, StoreError};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use crate::github::GithubError;

/// Failure rendered as `{"success": false, "message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), message = %self.message, "request failed");
        } else {
            warn!(status = self.status.as_u16(), message = %self.message, "request rejected");
        }
        let body = Json(json!({ "success": false, "message": self.message }));
        (self.status, body).into_response()
    }
}

/// Success envelope: `{"success": true, "result": ...}`.
pub struct ApiSuccess<T>(pub T);

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        Json(json!({ "success": true, "result": self.0 })).into_response()
    }
}

pub type ApiResult<T> = Result<ApiSuccess<T>, ApiError>;

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::EmptyInput => ApiError::bad_request(err.to_string()),
            AnalysisError::Failed(_) => ApiError::new(StatusCode::BAD_GATEWAY, err.to_string()),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        let status = match &err {
            RepoError::InvalidUrl(_) | RepoError::EmptyRepository => StatusCode::BAD_REQUEST,
            RepoError::NotFound { .. } => StatusCode::NOT_FOUND,
            RepoError::Unauthorized { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::UNAUTHORIZED)
            }
            RepoError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RepoError::Fetch { .. } | RepoError::Archive(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::MissingToken => ApiError::bad_request(err.to_string()),
        }
    }
}

impl From<GithubError> for ApiError {
    fn from(err: GithubError) -> Self {
        let status = match &err {
            GithubError::Status { status, .. } if matches!(*status, 401 | 403 | 404) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GithubError::MissingCredentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, err.to_string())
    }
}
