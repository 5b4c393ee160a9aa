//! Error types for the relay
//!
//! The `Display` text of each variant is the message returned to the
//! extension in the `error` field of the JSON body.

use hyper::StatusCode;

/// Main error type for relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Missing required parameters")]
    MissingParameter,

    #[error("Invalid request format")]
    InvalidRequest,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("API key not configured on server")]
    ServerMisconfigured,

    /// Non-2xx answer from the upstream vision API, relayed verbatim
    #[error("API error: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("No valid response from API")]
    EmptyCompletion,

    #[error("Unknown endpoint")]
    UnknownEndpoint,

    #[error("Database error: {0}")]
    Storage(String),

    #[error("Server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter => StatusCode::BAD_REQUEST,
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::ServerMisconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { status, .. } => *status,
            Self::EmptyCompletion => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnknownEndpoint => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<mongodb::error::Error> for RelayError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<bson::ser::Error> for RelayError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Storage(format!("BSON encoding failed: {}", err))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_mirrored() {
        let err = RelayError::Upstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "rate limited".to_string(),
        };
        let (status, body) = err.into_status_code_and_body();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, "API error: rate limited");
    }

    #[test]
    fn test_client_facing_messages() {
        assert_eq!(RelayError::MissingParameter.to_string(), "Missing required parameters");
        assert_eq!(RelayError::InvalidRequest.to_string(), "Invalid request format");
        assert_eq!(RelayError::UnknownEndpoint.to_string(), "Unknown endpoint");
        assert_eq!(
            RelayError::Internal("connection refused".into()).to_string(),
            "Server error: connection refused"
        );
        assert_eq!(RelayError::UnknownEndpoint.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::ServerMisconfigured.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
