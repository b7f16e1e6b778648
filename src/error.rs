//! Error types for Pocket Assist.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Credential (sign-in) errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    #[error("Token endpoint rejected the grant ({status}): {reason}")]
    Rejected { status: u16, reason: String },
}

/// Mail provider errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Credential error: {0}")]
    Auth(#[from] AuthError),

    #[error("Rate limited (HTTP {status})")]
    RateLimited { status: u16 },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl MailError {
    /// Whether the retry policy may absorb this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Calendar store errors.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar access denied: {path}")]
    PermissionDenied { path: String },

    #[error("Calendar unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Failed to parse calendar: {0}")]
    Parse(String),
}

/// Tool execution errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {name} not found")]
    NotFound { name: String },

    #[error("Invalid parameters for tool {name}: {reason}")]
    InvalidParameters { name: String, reason: String },

    #[error("Tool {name} execution failed: {reason}")]
    ExecutionFailed { name: String, reason: String },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limits_are_retryable() {
        assert!(MailError::RateLimited { status: 429 }.is_retryable());
        assert!(MailError::RateLimited { status: 403 }.is_retryable());
        assert!(
            !MailError::PermissionDenied {
                reason: "insufficientPermissions".into()
            }
            .is_retryable()
        );
        assert!(!MailError::AuthRequired.is_retryable());
        assert!(
            !MailError::Http {
                status: 500,
                message: "boom".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn auth_error_converts_into_mail_error() {
        let err: MailError = AuthError::NotSignedIn.into();
        assert_eq!(err.to_string(), "Credential error: Not signed in");
    }
}
