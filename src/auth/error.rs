use thiserror::Error;

/// Maximum number of error body characters kept in display strings.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Request(String),
    #[error("unable to reach the server: {0}")]
    Transport(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("{url} - {status}, {}", excerpt(.body))]
    Http {
        url: String,
        status: u16,
        body: String,
    },
    #[error("{url} - {status} after token refresh, {}", excerpt(.body))]
    RetryExhausted {
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("credential storage error: {0}")]
    Storage(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::RetryExhausted { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body of an HTTP failure, unmodified.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } | Self::RetryExhausted { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingRefreshToken,
    #[error("token refresh failed: {0}")]
    Failed(String),
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_truncates_body() {
        let err = ApiError::Http {
            url: "http://api.test:80/api/bills/".to_string(),
            status: 500,
            body: "x".repeat(500),
        };
        let message = err.to_string();
        assert!(message.starts_with("http://api.test:80/api/bills/ - 500, "));
        assert_eq!(message.matches('x').count(), MAX_ERROR_CHARS);
    }

    #[test]
    fn body_is_kept_whole() {
        let err = ApiError::RetryExhausted {
            url: "http://api.test:80/x".to_string(),
            status: 401,
            body: "  ".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.body(), Some("  "));
        assert!(err.to_string().ends_with("empty response body"));
    }
}
