//! Mail collaborator: OAuth credentials, Gmail transport, retrying
//! paginated client.

pub mod auth;
pub mod client;
pub mod gmail;
pub mod model;
pub mod retry;

pub use auth::{OAuthClient, RefreshingToken, StaticToken, TokenProvider};
pub use client::MailClient;
pub use gmail::{GmailTransport, MailTransport};
pub use model::MailRecord;
pub use retry::RetryPolicy;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::{env_or, env_parse};
use crate::error::ConfigError;

/// Credential source for the mail API.
#[derive(Debug, Clone)]
pub enum MailCredential {
    /// Pre-issued access token.
    AccessToken(SecretString),
    /// OAuth2 refresh-token grant.
    OAuth(OAuthClient),
}

/// Mail workflow configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_base: String,
    pub query: String,
    pub fetch_limit: usize,
    pub page_size: u32,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub credential: MailCredential,
}

impl MailConfig {
    /// Returns `None` if no Google credential is configured (mail disabled).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let credential = if let Ok(token) = std::env::var("GOOGLE_ACCESS_TOKEN") {
            MailCredential::AccessToken(SecretString::from(token))
        } else if let Ok(refresh_token) = std::env::var("GOOGLE_REFRESH_TOKEN") {
            let client_id = std::env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::MissingEnvVar("GOOGLE_CLIENT_ID".to_string()))?;
            let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
                .map_err(|_| ConfigError::MissingEnvVar("GOOGLE_CLIENT_SECRET".to_string()))?;
            MailCredential::OAuth(OAuthClient {
                token_url: env_or("GOOGLE_TOKEN_URL", "https://oauth2.googleapis.com/token"),
                client_id,
                client_secret: SecretString::from(client_secret),
                refresh_token: SecretString::from(refresh_token),
            })
        } else {
            return Ok(None);
        };

        let page_size: u32 = env_parse("GMAIL_PAGE_SIZE", gmail::MAX_PAGE_SIZE)?;
        let retry_attempts: u32 = env_parse("GMAIL_RETRY_ATTEMPTS", 5)?;
        let retry_base_ms: u64 = env_parse("GMAIL_RETRY_BASE_MS", 500)?;

        Ok(Some(Self {
            api_base: env_or("GMAIL_API_BASE", "https://gmail.googleapis.com/gmail/v1"),
            query: env_or("GMAIL_QUERY", "in:inbox newer_than:1d"),
            fetch_limit: env_parse("GMAIL_FETCH_LIMIT", 20)?,
            page_size: page_size.clamp(1, gmail::MAX_PAGE_SIZE),
            concurrency: env_parse("GMAIL_RESOLVE_CONCURRENCY", client::DEFAULT_RESOLVE_CONCURRENCY)?,
            retry: RetryPolicy::new(retry_attempts, Duration::from_millis(retry_base_ms)),
            credential,
        }))
    }

    /// Build the token provider for this configuration.
    pub fn token_provider(&self, http: reqwest::Client) -> Arc<dyn TokenProvider> {
        match &self.credential {
            MailCredential::AccessToken(token) => Arc::new(StaticToken::new(token.clone())),
            MailCredential::OAuth(client) => Arc::new(RefreshingToken::new(http, client.clone())),
        }
    }

    /// Build the retrying client over a Gmail transport.
    pub fn client(&self, http: reqwest::Client, auth: Arc<dyn TokenProvider>) -> MailClient {
        let transport = GmailTransport::new(http, self.api_base.clone(), auth);
        MailClient::new(Arc::new(transport), self.retry)
            .with_page_size(self.page_size)
            .with_concurrency(self.concurrency)
    }
}
