use thiserror::Error;

/// Failures surfaced to the user. `Display` is the user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Non-2xx status; `message` is the backend's `error` field when present.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        detail: Option<String>,
    },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("No response body from stream")]
    EmptyStream,
    #[error("invalid JSON: {0}")]
    Json(String),
    /// The stream delivered an `error` step.
    #[error("{0}")]
    Backend(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Network(err.to_string())
}
