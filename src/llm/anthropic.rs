//! Anthropic Messages API provider with streaming and tool use.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::sse::{ContentBlock, SseParser, StreamEvent};
use crate::llm::{LanguageModel, LlmConfig, TextStream};
use crate::tools::{ToolDefinition, ToolRegistry};

const PROVIDER: &str = "anthropic";

/// Upper bound on model → tool → model round trips per prompt.
const MAX_TOOL_ROUNDS: usize = 4;

type Sink = mpsc::UnboundedSender<Result<String, LlmError>>;

#[derive(Debug, Clone, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

impl ApiMessage {
    fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "user",
            content,
        }
    }

    fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "assistant",
            content,
        }
    }
}

/// Streaming client for the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicModel {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    api_url: String,
    anthropic_version: String,
    max_tokens: u32,
    system_prompt: String,
    tools: Option<Arc<ToolRegistry>>,
}

impl AnthropicModel {
    pub fn new(http: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_url: config.api_url.clone(),
            anthropic_version: config.anthropic_version.clone(),
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
            tools: None,
        }
    }

    /// Advertise and execute tools from `registry`.
    pub fn with_tools(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tools = Some(registry);
        self
    }

    async fn converse(&self, prompt: String, sink: &Sink) -> Result<(), LlmError> {
        let tools = match &self.tools {
            Some(registry) => registry.tool_definitions().await,
            None => Vec::new(),
        };
        let mut messages = vec![ApiMessage::user(vec![ContentBlock::Text { text: prompt }])];
        let mut accumulated = String::new();

        for round in 0..MAX_TOOL_ROUNDS {
            let response = self.send(&messages, &tools).await?;
            let turn = read_turn(response, &mut accumulated, sink).await?;

            if sink.is_closed() {
                debug!("Response consumer went away, stopping");
                return Ok(());
            }
            if turn.stop_reason.as_deref() != Some("tool_use") || !turn.has_tool_calls() {
                return Ok(());
            }

            let blocks = turn.into_blocks();
            let results = self.run_tools(&blocks).await;
            messages.push(ApiMessage::assistant(blocks));
            messages.push(ApiMessage::user(results));
            debug!(round, "Continuing after tool use");
        }

        warn!(max = MAX_TOOL_ROUNDS, "Tool round limit reached");
        Err(LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("still requesting tools after {MAX_TOOL_ROUNDS} rounds"),
        })
    }

    async fn send(
        &self,
        messages: &[ApiMessage],
        tools: &[ToolDefinition],
    ) -> Result<reqwest::Response, LlmError> {
        let mut payload = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "stream": true,
            "system": self.system_prompt,
            "messages": messages,
        });
        if !tools.is_empty() {
            payload["tools"] = serde_json::to_value(tools)?;
        }

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", &self.anthropic_version)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            },
            429 => LlmError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after,
            },
            code => LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {code}: {body}"),
            },
        })
    }

    async fn run_tools(&self, blocks: &[ContentBlock]) -> Vec<ContentBlock> {
        let mut results = Vec::new();
        for block in blocks {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };
            let outcome = match &self.tools {
                Some(registry) => registry.execute(name, input.clone()).await,
                None => Err(crate::error::ToolError::NotFound { name: name.clone() }),
            };
            let (content, is_error) = match outcome {
                Ok(output) => (output.content, false),
                Err(e) => {
                    warn!(tool = %name, error = %e, "Tool call failed");
                    (e.to_string(), true)
                }
            };
            results.push(ContentBlock::ToolResult {
                tool_use_id: id.clone(),
                content,
                is_error,
            });
        }
        results
    }
}

impl LanguageModel for AnthropicModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn stream(&self, prompt: &str) -> TextStream {
        let model = self.clone();
        let prompt = prompt.to_string();
        let started = futures::stream::once(async move {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(async move {
                if let Err(e) = model.converse(prompt, &tx).await {
                    let _ = tx.send(Err(e));
                }
            });
            UnboundedReceiverStream::new(rx)
        });
        Box::pin(started.flatten())
    }
}

/// A content block being assembled from deltas.
#[derive(Debug)]
enum PendingBlock {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        json: String,
    },
}

/// One assistant turn assembled from the event stream.
#[derive(Debug, Default)]
struct Turn {
    blocks: BTreeMap<usize, PendingBlock>,
    stop_reason: Option<String>,
    /// Set once `message_stop` arrives.
    complete: bool,
}

impl Turn {
    fn apply(&mut self, event: StreamEvent) -> Result<Option<String>, LlmError> {
        match event {
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let pending = match content_block {
                    ContentBlock::Text { text } => PendingBlock::Text(text),
                    ContentBlock::ToolUse { id, name, .. } => PendingBlock::ToolUse {
                        id,
                        name,
                        json: String::new(),
                    },
                    ContentBlock::ToolResult { .. } => return Ok(None),
                };
                self.blocks.insert(index, pending);
            }
            StreamEvent::ContentBlockDelta { index, delta } => {
                match (self.blocks.get_mut(&index), delta.delta_type.as_str()) {
                    (Some(PendingBlock::Text(text)), "text_delta") => {
                        let piece = delta.text.unwrap_or_default();
                        text.push_str(&piece);
                        return Ok(Some(piece));
                    }
                    (Some(PendingBlock::ToolUse { json, .. }), "input_json_delta") => {
                        json.push_str(delta.partial_json.as_deref().unwrap_or_default());
                    }
                    _ => {}
                }
            }
            StreamEvent::MessageDelta { delta } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
            }
            StreamEvent::MessageStop => self.complete = true,
            StreamEvent::Error { error } => {
                return Err(LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("{}: {}", error.error_type, error.message),
                });
            }
            _ => {}
        }
        Ok(None)
    }

    fn has_tool_calls(&self) -> bool {
        self.blocks
            .values()
            .any(|b| matches!(b, PendingBlock::ToolUse { .. }))
    }

    fn into_blocks(self) -> Vec<ContentBlock> {
        self.blocks
            .into_values()
            .filter_map(|block| match block {
                PendingBlock::Text(text) if text.is_empty() => None,
                PendingBlock::Text(text) => Some(ContentBlock::Text { text }),
                PendingBlock::ToolUse { id, name, json } => {
                    let input = if json.trim().is_empty() {
                        json!({})
                    } else {
                        serde_json::from_str(&json).unwrap_or_else(|e| {
                            warn!(tool = %name, error = %e, "Unparseable tool input");
                            json!({})
                        })
                    };
                    Some(ContentBlock::ToolUse { id, name, input })
                }
            })
            .collect()
    }
}

/// Consume one streamed response, forwarding accumulated text to `sink`.
async fn read_turn(
    response: reqwest::Response,
    accumulated: &mut String,
    sink: &Sink,
) -> Result<Turn, LlmError> {
    let mut parser = SseParser::new();
    let mut turn = Turn::default();
    // Text from a follow-up round is separated from what came before.
    let mut needs_separator = !accumulated.is_empty();
    let mut bytes = response.bytes_stream();

    while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;
        for event in parser.process(&chunk) {
            let Some(piece) = turn.apply(event)? else {
                continue;
            };
            if piece.is_empty() {
                continue;
            }
            if needs_separator {
                accumulated.push_str("\n\n");
                needs_separator = false;
            }
            accumulated.push_str(&piece);
            if sink.send(Ok(accumulated.clone())).is_err() {
                return Ok(turn);
            }
        }
    }
    if !turn.complete {
        return Err(LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: "stream ended before message_stop".to_string(),
        });
    }
    Ok(turn)
}
