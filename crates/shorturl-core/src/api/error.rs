use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The held credential was rejected; the session has been torn down.
    #[error("Session expired - please log in again")]
    SessionExpired,

    /// 401 on a request that carried no credential (e.g. a failed login)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    /// The server's `message` field when the body is JSON, else the raw body
    fn describe_body(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody { message: Some(message) }) => Self::truncate_body(&message),
            _ => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let described = Self::describe_body(body);
        match status.as_u16() {
            400 | 422 => ApiError::Validation(described),
            401 => ApiError::Unauthorized(described),
            403 => ApiError::AccessDenied(described),
            404 => ApiError::NotFound(described),
            409 => ApiError::Conflict(described),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(described),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, described)),
        }
    }

    /// Text suitable for an inline message, falling back to `fallback`
    /// when the server gave nothing useful.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::AccessDenied(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
                if !msg.trim().is_empty() =>
            {
                msg.clone()
            }
            ApiError::SessionExpired | ApiError::RateLimited => self.to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}
