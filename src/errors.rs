use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Failures from the upstream clients (OAuth, fitness data, text generation,
/// recipes, news).
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("Authorization code is missing")]
    AuthCodeMissing,
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
    #[error("no access token found")]
    NoAccessToken,
    #[error("{service} unauthorized: check the configured credentials")]
    Unauthorized { service: &'static str },
    #[error("{service} API error 404: endpoint not found")]
    NotFound { service: &'static str },
    #[error("{service} API error {status}")]
    UpstreamHttp { service: &'static str, status: u16 },
    #[error("malformed suggestion: {0}")]
    MalformedSuggestion(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to encode prompt data: {0}")]
    PromptEncoding(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
            details: None,
        }
    }

    /// 500 with a fixed headline and the underlying cause as `details`.
    pub fn upstream(message: impl Into<String>, err: &FitError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: Some(err.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}
