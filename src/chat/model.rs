//! Chat transcript state.

/// Where an assistant reply is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantStatus {
    Loading,
    Streaming(String),
    Finished(String),
    /// Failed; keeps whatever text had arrived.
    Error {
        partial: Option<String>,
        message: String,
    },
}

impl AssistantStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Error { .. })
    }

    /// Latest text, if any has arrived.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Loading => None,
            Self::Streaming(text) | Self::Finished(text) => Some(text),
            Self::Error { partial, .. } => partial.as_deref(),
        }
    }
}

/// One row of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEntry {
    User { id: u64, text: String },
    Assistant { id: u64, status: AssistantStatus },
}

impl ChatEntry {
    pub fn id(&self) -> u64 {
        match self {
            Self::User { id, .. } | Self::Assistant { id, .. } => *id,
        }
    }
}

/// Immutable chat snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub entries: Vec<ChatEntry>,
    /// Unsent input.
    pub draft: String,
    /// Next entry id; ids are never reused within a session.
    pub next_id: u64,
}

impl ChatState {
    /// True while some assistant reply has not reached a terminal state.
    pub fn is_busy(&self) -> bool {
        self.entries.iter().any(|e| match e {
            ChatEntry::Assistant { status, .. } => !status.is_terminal(),
            ChatEntry::User { .. } => false,
        })
    }

    /// Whether `text` may be sent now.
    pub fn can_send(&self, text: &str) -> bool {
        !text.trim().is_empty() && !self.is_busy()
    }

    /// Whether the current draft may be sent now.
    pub fn can_send_message(&self) -> bool {
        self.can_send(&self.draft)
    }

    pub fn assistant(&self, id: u64) -> Option<&AssistantStatus> {
        self.entries.iter().find_map(|e| match e {
            ChatEntry::Assistant { id: eid, status } if *eid == id => Some(status),
            _ => None,
        })
    }
}
