//! Credential collaborator: supplies bearer tokens for the mail API.
//!
//! `RefreshingToken` exchanges an OAuth2 refresh token lazily and caches the
//! access token until shortly before it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AuthError;

/// Refresh this long before the provider-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies a valid bearer token, refreshing it when needed.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, AuthError>;

    /// Whether a credential exists without contacting anyone.
    fn has_credential(&self) -> bool;
}

/// A fixed, pre-issued access token.
pub struct StaticToken {
    token: Option<SecretString>,
}

impl StaticToken {
    pub fn new(token: SecretString) -> Self {
        Self { token: Some(token) }
    }

    /// No credential at all; every request fails with `NotSignedIn`.
    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<SecretString, AuthError> {
        self.token.clone().ok_or(AuthError::NotSignedIn)
    }

    fn has_credential(&self) -> bool {
        self.token.is_some()
    }
}

/// OAuth2 client settings for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

/// Lazily refreshed OAuth2 access token.
pub struct RefreshingToken {
    http: reqwest::Client,
    client: OAuthClient,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshingToken {
    pub fn new(http: reqwest::Client, client: OAuthClient) -> Self {
        Self {
            http,
            client,
            cached: Mutex::new(None),
        }
    }

    async fn refresh(&self) -> Result<CachedToken, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.expose_secret()),
            ("refresh_token", self.client.refresh_token.expose_secret()),
        ];
        let response = self
            .http
            .post(&self.client.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed {
                reason: format!("invalid token response: {e}"),
            })?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        info!(expires_in = lifetime.as_secs(), "Refreshed mail access token");
        Ok(CachedToken {
            token: SecretString::from(body.access_token),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl TokenProvider for RefreshingToken {
    async fn access_token(&self) -> Result<SecretString, AuthError> {
        // Held across the refresh: at most one exchange in flight.
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref()
            && current.expires_at > Instant::now()
        {
            return Ok(current.token.clone());
        }
        debug!("Access token missing or expired, refreshing");
        let fresh = self.refresh().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn has_credential(&self) -> bool {
        !self.client.refresh_token.expose_secret().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned() {
        let provider = StaticToken::new(SecretString::from("abc"));
        assert!(provider.has_credential());
        assert_eq!(provider.access_token().await.unwrap().expose_secret(), "abc");
    }

    #[tokio::test]
    async fn signed_out_token_fails() {
        let provider = StaticToken::signed_out();
        assert!(!provider.has_credential());
        assert!(matches!(
            provider.access_token().await,
            Err(AuthError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_refresh_failure() {
        let provider = RefreshingToken::new(
            reqwest::Client::new(),
            OAuthClient {
                token_url: "http://127.0.0.1:9/token".into(),
                client_id: "id".into(),
                client_secret: SecretString::from("secret"),
                refresh_token: SecretString::from("refresh"),
            },
        );
        assert!(provider.has_credential());
        assert!(matches!(
            provider.access_token().await,
            Err(AuthError::RefreshFailed { .. })
        ));
    }
}
