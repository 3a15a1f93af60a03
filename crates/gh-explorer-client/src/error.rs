//! Remote call error taxonomy

use thiserror::Error;

/// Error produced by a remote call
///
/// `Clone` so that the request executor can keep the raw cause in its
/// observable state while also handing it to retry predicates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, TLS, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// 401: the session is no longer valid
    #[error("unauthorized: {}", message.as_deref().unwrap_or("not authenticated"))]
    Unauthorized { message: Option<String> },

    /// Any other non-success status
    #[error("request failed with status {status}: {}", message.as_deref().unwrap_or("no details"))]
    Status { status: u16, message: Option<String> },

    /// The response did not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Build the error for an HTTP status and its optional `error` body field
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        if status == 401 {
            ApiError::Unauthorized { message }
        } else {
            ApiError::Status { status, message }
        }
    }

    /// HTTP status, when a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) | ApiError::Malformed(_) => None,
        }
    }

    /// Message the server put into its `{"error": ...}` body
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message } | ApiError::Status { message, .. } => {
                message.as_deref()
            }
            ApiError::Transport(_) | ApiError::Malformed(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Status ≥ 500
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Malformed(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Malformed(err.to_string())
    }
}
