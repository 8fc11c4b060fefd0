use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            429 => ErrorCode::RateLimited,
            400..=499 => ErrorCode::Validation,
            _ => ErrorCode::Internal,
        }
    }
}

/// Error body returned by the API. Every field is optional because the
/// backend is not consistent about which ones it fills.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiErrorBody {
    pub fn best_message(&self) -> Option<&str> {
        fn present(field: &Option<String>) -> Option<&str> {
            field.as_deref().map(str::trim).filter(|m| !m.is_empty())
        }
        present(&self.message).or_else(|| present(&self.error))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            message,
        }
    }

    pub fn from_body(status: u16, body: &ApiErrorBody) -> Self {
        Self::new(status, body.best_message().map(str::to_string))
    }
}

#[derive(Debug, Error)]
#[error("{code:?} ({status}): {}", message.as_deref().unwrap_or("no message"))]
pub struct ApiException {
    pub code: ErrorCode,
    pub status: u16,
    pub message: Option<String>,
}

impl From<ApiError> for ApiException {
    fn from(value: ApiError) -> Self {
        Self {
            code: value.code,
            status: value.status,
            message: value.message,
        }
    }
}

impl From<ApiException> for ApiError {
    fn from(value: ApiException) -> Self {
        Self {
            code: value.code,
            status: value.status,
            message: value.message,
        }
    }
}
