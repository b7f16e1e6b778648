//! Server-sent event parsing for the Anthropic Messages stream.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A content block in a request or streamed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart,
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: Delta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDelta,
    },
    MessageStop,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Delta {
    #[serde(rename = "type")]
    pub delta_type: String,
    pub text: Option<String>,
    pub partial_json: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDelta {
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Incremental SSE parser. Feed raw chunks; complete events come out.
///
/// Bytes are buffered until an event is whole, so a multi-byte character
/// split across chunks decodes intact.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some((end, separator)) = find_event_end(&self.buffer[start..]) {
            let raw = &self.buffer[start..start + end];
            start += end + separator;

            let event_text = match std::str::from_utf8(raw) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Skipping SSE event with invalid UTF-8");
                    continue;
                }
            };

            let data = event_text
                .lines()
                .find_map(|line| line.strip_prefix("data:"))
                .map(str::trim);

            if let Some(json) = data.filter(|d| !d.is_empty() && *d != "[DONE]") {
                match serde_json::from_str::<StreamEvent>(json) {
                    Ok(StreamEvent::Unknown) => {}
                    Ok(event) => events.push(event),
                    Err(e) => warn!(error = %e, data = %json, "Skipping malformed SSE event"),
                }
            }
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        events
    }
}

/// Offset and length of the first blank-line separator (`\n\n` or `\r\n\r\n`).
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n");
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) if b < a => Some((b, 4)),
        (Some(a), _) => Some((a, 2)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    }
}
