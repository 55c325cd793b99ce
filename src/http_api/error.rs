//! API エラー
//!
//! 型安全なエラーコードを定義し、`IntoResponse` で JSON へ変換します。
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    Unauthorized,
    InvalidInput,
    TextTooLarge,
    RateLimited,
    UpstreamFailed,
    PersistenceFailed,
    InternalError,
}

impl ApiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorCode::Unauthorized => "UNAUTHORIZED",
            ApiErrorCode::InvalidInput => "INVALID_INPUT",
            ApiErrorCode::TextTooLarge => "TEXT_TOO_LARGE",
            ApiErrorCode::RateLimited => "RATE_LIMITED",
            ApiErrorCode::UpstreamFailed => "UPSTREAM_FAILED",
            ApiErrorCode::PersistenceFailed => "PERSISTENCE_FAILED",
            ApiErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match self.code {
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::TextTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorCode::UpstreamFailed => StatusCode::BAD_GATEWAY,
            ApiErrorCode::PersistenceFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let response = ErrorResponse {
            error: self.message,
            code: self.code.as_str().to_string(),
            details: self.details,
        };

        (status_code, Json(response)).into_response()
    }
}
