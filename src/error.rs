use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{error, warn};

use crate::backend::BackendError;
use crate::service::planner::PlannerError;

#[derive(Debug, ThisError)]
pub enum LandwatchError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hosted backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid plan: {0}")]
    Planner(#[from] PlannerError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server not configured: {0}")]
    NotConfigured(String),

    #[error("Rejected request body ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LandwatchError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn missing_fields() -> Self {
        Self::BadRequest("Missing required fields".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Planner(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Rejected { status, .. } => *status,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Backend(BackendError::Api { status, .. })
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
            {
                *status
            }
            Self::Reqwest(_) | Self::UrlParse(_) | Self::UpstreamStatus(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Json(_)
            | Self::Backend(_)
            | Self::NotConfigured(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LandwatchError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_body = match &self {
            Self::BadRequest(msg) => ApiErrorBody::new("BAD_REQUEST", msg),
            Self::Planner(e) => ApiErrorBody::new("INVALID_PLAN", e.to_string()),
            Self::Unauthorized => ApiErrorBody::new("UNAUTHORIZED", "Unauthorized"),
            Self::Forbidden(msg) => ApiErrorBody::new("FORBIDDEN", msg),
            Self::NotFound(msg) => ApiErrorBody::new("NOT_FOUND", msg),
            Self::Rejected { status, message } => {
                let code = status
                    .canonical_reason()
                    .unwrap_or("BAD_REQUEST")
                    .to_ascii_uppercase()
                    .replace(' ', "_");
                ApiErrorBody::new(code, message)
            }
            Self::RateLimited(msg) => ApiErrorBody::new("RATE_LIMIT", msg),
            Self::NotConfigured(_) => {
                ApiErrorBody::new("NOT_CONFIGURED", "Server not configured")
            }
            Self::Backend(BackendError::Api { status, .. })
                if *status == StatusCode::UNAUTHORIZED =>
            {
                ApiErrorBody::new("UNAUTHORIZED", "Backend authentication failed.")
            }
            Self::Backend(BackendError::Api { status, .. }) if *status == StatusCode::FORBIDDEN => {
                ApiErrorBody::new("FORBIDDEN", "Backend permission denied.")
            }
            Self::Backend(_) => ApiErrorBody::new("BACKEND_ERROR", "Database request failed."),
            Self::Reqwest(_) | Self::UrlParse(_) | Self::UpstreamStatus(_) => {
                ApiErrorBody::new("BAD_GATEWAY", "Upstream service is unavailable.")
            }
            Self::Json(_) | Self::Internal(_) => {
                ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred.")
            }
        };

        if status.is_server_error() {
            error!(status = %status, error = %self, "request failed");
        } else {
            warn!(status = %status, error = %self, "request rejected");
        }

        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiErrorBody {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
