//! Gmail REST transport.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::MailError;
use crate::mail::auth::TokenProvider;
use crate::mail::model::{MessageMetadata, MessagePage};

/// Provider caps a single page at this many ids.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Error reasons Google reports under 403 for quota throttling.
const RATE_LIMIT_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "quotaExceeded",
    "dailyLimitExceeded",
];

/// Raw provider calls; retries and pagination live in `MailClient`.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn list_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MessagePage, MailError>;

    async fn get_message(&self, id: &str) -> Result<MessageMetadata, MailError>;
}

/// Gmail API over reqwest with a bearer token.
pub struct GmailTransport {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<dyn TokenProvider>,
}

impl GmailTransport {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MailError> {
        let token = self.auth.access_token().await?;
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| MailError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for GmailTransport {
    async fn list_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MessagePage, MailError> {
        let max_results = page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut params = vec![("q", query), ("maxResults", max_results.as_str())];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let page: MessagePage = self.get_json("/users/me/messages", &params).await?;
        debug!(
            count = page.messages.len(),
            more = page.next_page_token.is_some(),
            "Listed message page"
        );
        Ok(page)
    }

    async fn get_message(&self, id: &str) -> Result<MessageMetadata, MailError> {
        let path = format!("/users/me/messages/{id}");
        self.get_json(
            &path,
            &[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
            ],
        )
        .await
    }
}

/// Map a non-2xx response to the error taxonomy.
///
/// 403 is only treated as throttling when Google says so; other 403s are
/// permanent permission failures.
pub fn classify_failure(status: u16, body: &str) -> MailError {
    match status {
        401 => MailError::AuthRequired,
        429 => MailError::RateLimited { status },
        403 => {
            let reasons = error_reasons(body);
            if reasons.iter().any(|r| RATE_LIMIT_REASONS.contains(&r.as_str())) {
                MailError::RateLimited { status }
            } else {
                MailError::PermissionDenied {
                    reason: reasons
                        .into_iter()
                        .next()
                        .unwrap_or_else(|| "forbidden".to_string()),
                }
            }
        }
        _ => MailError::Http {
            status,
            message: error_message(body).unwrap_or_else(|| body.chars().take(200).collect()),
        },
    }
}

fn error_reasons(body: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Vec::new();
    };
    value["error"]["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["reason"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}
