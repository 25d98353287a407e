//! Decides whether a failed response means "the access token expired". This is
//! the only place that inspects error bodies; the coordinator refreshes on
//! [`AuthFailure::TokenExpired`] and nothing else.

use super::error::ApiError;
use serde::Deserialize;

pub const TOKEN_NOT_VALID_CODE: &str = "token_not_valid";
pub const TOKEN_NOT_VALID_DETAIL: &str = "Given token not valid for any token type";
pub const TOKEN_EXPIRED_MESSAGE: &str = "Token is expired";
pub const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthFailure {
    NotAuthFailure,
    TokenExpired,
    Other401,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    messages: Vec<TokenMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenMessage {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

#[must_use]
pub fn classify(status: u16, body: &str) -> AuthFailure {
    if status != 401 {
        return AuthFailure::NotAuthFailure;
    }

    let Ok(body) = serde_json::from_str::<ErrorBody>(body) else {
        return AuthFailure::Other401;
    };

    let code_matches = body.code.as_deref() == Some(TOKEN_NOT_VALID_CODE);
    let detail_matches = body.detail.as_deref() == Some(TOKEN_NOT_VALID_DETAIL);
    let message_matches = body.messages.iter().any(|entry| {
        entry.message.as_deref() == Some(TOKEN_EXPIRED_MESSAGE)
            && entry.token_type.as_deref() == Some(ACCESS_TOKEN_TYPE)
    });

    if code_matches || detail_matches || message_matches {
        AuthFailure::TokenExpired
    } else {
        AuthFailure::Other401
    }
}

/// Transport, timeout and local failures are never auth failures.
#[must_use]
pub fn classify_error(err: &ApiError) -> AuthFailure {
    match err {
        ApiError::Http { status, body, .. } => classify(*status, body),
        _ => AuthFailure::NotAuthFailure,
    }
}
