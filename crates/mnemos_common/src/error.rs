//! Error types for the Mnemos client.

use thiserror::Error;

/// Generic text shown in chat when an analysis cannot be completed
pub const GENERIC_FAILURE_TEXT: &str =
    "Sorry, I couldn't complete the analysis. Please check your connection and try again.";

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport failure: connection refused, DNS, reset, ...
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Upstream returned HTTP {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// 401 from the general backend; the stored session has been cleared
    #[error("Session expired or not signed in")]
    Unauthorized,

    /// Response shape could not be normalized
    #[error("Unexpected response format: {0}")]
    Format(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Map a reqwest failure onto the taxonomy
    pub fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(timeout_secs)
        } else if err.is_decode() {
            GatewayError::Format(format!("Response body is not valid JSON: {}", err))
        } else {
            GatewayError::Network(err.to_string())
        }
    }

    /// True when the upstream never produced a usable reply
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Timeout(_))
    }

    /// Short text suitable for a chat bubble or an inline form error
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Network(_) | GatewayError::Timeout(_) => GENERIC_FAILURE_TEXT.to_string(),
            GatewayError::UpstreamStatus { message, .. } if !message.is_empty() => {
                format!("The analysis service rejected the request: {}", message)
            }
            GatewayError::UpstreamStatus { status, .. } => {
                format!("The analysis service rejected the request (HTTP {}).", status)
            }
            GatewayError::Unauthorized => "Please sign in again.".to_string(),
            GatewayError::Format(_) => {
                "The analysis service sent a response I couldn't read. Please try again.".to_string()
            }
            GatewayError::InvalidInput(msg) => msg.clone(),
            GatewayError::Io(e) => format!("Could not read the file: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Pull a human-readable reason out of an error response body.
///
/// Backends disagree on the field (`message`, `error`, `detail`); fall back
/// to the raw body, shortened.
pub(crate) fn upstream_reason(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error", "detail"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
