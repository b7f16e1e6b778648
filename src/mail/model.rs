//! Mail record and provider payload types.

use serde::{Deserialize, Serialize};

pub const NO_SUBJECT: &str = "(No subject)";
pub const UNKNOWN_SENDER: &str = "(Unknown sender)";

/// A fetched message, reduced to what the summary needs.
///
/// Equality compares content only; two fetches of the same text under
/// different ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailRecord {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub snippet: String,
}

impl PartialEq for MailRecord {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
            && self.sender == other.sender
            && self.snippet == other.snippet
    }
}

impl Eq for MailRecord {}

impl MailRecord {
    /// Build a record from provider metadata, filling placeholders for
    /// missing headers.
    pub fn from_metadata(message: &MessageMetadata) -> Self {
        Self {
            id: message.id.clone(),
            subject: message
                .header("Subject")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(NO_SUBJECT)
                .to_string(),
            sender: message
                .header("From")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(UNKNOWN_SENDER)
                .to_string(),
            snippet: message.snippet.clone().unwrap_or_default(),
        }
    }
}

/// One page of message ids.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Message resource fetched with `format=metadata`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageMetadata {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl MessageMetadata {
    /// First header named `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}
