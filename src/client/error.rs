use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the workout sync endpoint
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unexpected response: {0}")]
    Unknown(String),
}

impl ClientError {
    pub fn from_status(status: StatusCode, message: String) -> Self {
        let msg = if message.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error").to_string()
        } else {
            message
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(msg),
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited(msg),
            status if status.is_server_error() => ClientError::ServerError(msg),
            status if status.is_client_error() => ClientError::Rejected(msg),
            _ => ClientError::Unknown(msg),
        }
    }

    /// Whether the same request might succeed if sent again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::RateLimited(_) | ClientError::ServerError(_) | ClientError::NetworkError(_)
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::NetworkError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_from_status() {
        assert_matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            ClientError::Unauthorized(msg) if msg == "Unauthorized"
        );
        assert_matches!(
            ClientError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad set".to_string()),
            ClientError::Rejected(msg) if msg == "bad set"
        );
        assert_matches!(
            ClientError::from_status(StatusCode::BAD_GATEWAY, String::new()),
            ClientError::ServerError(_)
        );
        assert_matches!(
            ClientError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ClientError::RateLimited(_)
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ClientError::ServerError("x".into()).is_retryable());
        assert!(ClientError::RateLimited("x".into()).is_retryable());
        assert!(ClientError::NetworkError("x".into()).is_retryable());
        assert!(!ClientError::Rejected("x".into()).is_retryable());
        assert!(!ClientError::Unauthorized("x".into()).is_retryable());
    }
}
