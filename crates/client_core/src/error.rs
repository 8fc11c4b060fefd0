use shared::error::{ApiException, ErrorCode};
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("api request failed: {0}")]
    Api(#[from] ApiException),
    #[error("unauthorized: {}", .0.as_deref().unwrap_or("credential rejected"))]
    Unauthorized(Option<String>),
    #[error("failed to reach api: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("{0}")]
    Validation(String),
    #[error("not logged in")]
    NotAuthenticated,
    #[error("forbidden: requires role {0}")]
    Forbidden(String),
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("credential storage failure: {0:#}")]
    Storage(anyhow::Error),
}

impl ClientError {
    /// Message to show the user. The server's own message wins when it sent
    /// one; otherwise `fallback` describes the failed operation.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api(exception) => match (&exception.message, exception.code) {
                (Some(message), _) => message.clone(),
                (None, ErrorCode::NotFound) => "The requested item was not found.".to_string(),
                (None, ErrorCode::Forbidden) => {
                    "You do not have permission to do that.".to_string()
                }
                (None, _) => fallback.to_string(),
            },
            ClientError::Unauthorized(Some(message)) => message.clone(),
            ClientError::Unauthorized(None) => {
                "Your session has expired. Please log in again.".to_string()
            }
            ClientError::Transport(_) => {
                "Server unreachable; check the API URL and network, then retry.".to_string()
            }
            ClientError::Validation(message) => message.clone(),
            ClientError::NotAuthenticated => "Please log in first.".to_string(),
            ClientError::Forbidden(_) => "You do not have permission to do that.".to_string(),
            ClientError::Decode(_) | ClientError::InvalidCredential(_) | ClientError::Storage(_) => {
                fallback.to_string()
            }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}
