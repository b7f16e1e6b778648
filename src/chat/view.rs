//! Presentation-ready projection of the chat state.

use crate::chat::model::{AssistantStatus, ChatEntry, ChatState};

/// How one transcript row should be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bubble {
    User(String),
    /// Waiting for the first token.
    Typing,
    Streaming(String),
    Reply(String),
    Failed { text: Option<String>, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatView {
    pub bubbles: Vec<(u64, Bubble)>,
    pub can_send: bool,
    pub is_busy: bool,
}

impl From<&ChatState> for ChatView {
    fn from(state: &ChatState) -> Self {
        let bubbles = state
            .entries
            .iter()
            .map(|entry| {
                let bubble = match entry {
                    ChatEntry::User { text, .. } => Bubble::User(text.clone()),
                    ChatEntry::Assistant { status, .. } => match status {
                        AssistantStatus::Loading => Bubble::Typing,
                        AssistantStatus::Streaming(text) => Bubble::Streaming(text.clone()),
                        AssistantStatus::Finished(text) => Bubble::Reply(text.clone()),
                        AssistantStatus::Error { partial, message } => Bubble::Failed {
                            text: partial.clone(),
                            message: message.clone(),
                        },
                    },
                };
                (entry.id(), bubble)
            })
            .collect();

        Self {
            bubbles,
            can_send: state.can_send_message(),
            is_busy: state.is_busy(),
        }
    }
}
