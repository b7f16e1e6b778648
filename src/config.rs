//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::mail::MailConfig;

/// Default system prompt for the chat assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a concise personal assistant. \
When the user asks about free time or scheduling, call the find_free_time tool \
instead of guessing, then present the returned slots in a friendly format.";

/// Application configuration, assembled from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    /// `None` when no Google credentials are configured (mail disabled).
    pub mail: Option<MailConfig>,
    /// JSON event file backing the free-time tool.
    pub calendar_path: Option<PathBuf>,
    /// Directory for rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            llm: LlmConfig::from_env()?,
            mail: MailConfig::from_env()?,
            calendar_path: std::env::var("CALENDAR_PATH").ok().map(PathBuf::from),
            log_dir: std::env::var("POCKET_ASSIST_LOG_DIR")
                .ok()
                .map(PathBuf::from),
        })
    }
}

/// Read an environment variable, falling back to `default` when unset.
pub(crate) fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// A set-but-unparseable value is an error rather than a silent default.
pub(crate) fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_accepts_padded_numbers() {
        let v: u32 = parse_value("GMAIL_FETCH_LIMIT", " 25 ").unwrap();
        assert_eq!(v, 25);
    }

    #[test]
    fn parse_value_rejects_garbage() {
        let err = parse_value::<u32>("GMAIL_FETCH_LIMIT", "lots").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, message } => {
                assert_eq!(key, "GMAIL_FETCH_LIMIT");
                assert!(message.contains("lots"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn env_or_uses_default_when_unset() {
        assert_eq!(
            env_or("POCKET_ASSIST_SURELY_UNSET_VAR", "fallback"),
            "fallback"
        );
    }
}
