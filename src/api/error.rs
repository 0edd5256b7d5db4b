//! Errors returned by the admin REST client

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No session found. Run `dailyspark-admin login` first.")]
    NoSession,

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Build a status error from a failed response body.
    ///
    /// The backend puts validation errors in `message` (a string or a list of
    /// strings) and sometimes uses `error` instead.
    pub fn from_response(status: u16, body: &str, action: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| extract_message(&value))
            .unwrap_or_else(|| format!("{} failed (status: {})", action, status));

        ApiError::Status { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Pull a human-readable message out of an error body
pub fn extract_message(body: &Value) -> Option<String> {
    match body.get("message") {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) if !items.is_empty() => {
            let joined: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            return Some(joined.join("\n"));
        }
        _ => {}
    }

    match body.get("error") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}
