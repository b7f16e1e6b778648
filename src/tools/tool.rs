//! Tool trait and helpers.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub use crate::error::ToolError;

/// A capability the language model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the tool's input object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;
}

/// Result of a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>, duration: Duration) -> Self {
        Self {
            content: content.into(),
            duration,
        }
    }
}

/// Tool description sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Read a required integer parameter.
pub fn require_i64(params: &serde_json::Value, tool: &str, key: &str) -> Result<i64, ToolError> {
    let value = params
        .get(key)
        .ok_or_else(|| ToolError::InvalidParameters {
            name: tool.to_string(),
            reason: format!("missing '{key}'"),
        })?;
    // Models sometimes send numbers as floats or strings.
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| ToolError::InvalidParameters {
            name: tool.to_string(),
            reason: format!("'{key}' must be an integer"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_i64_accepts_numeric_forms() {
        let params = json!({"a": 30, "b": 29.6, "c": " 45 "});
        assert_eq!(require_i64(&params, "t", "a").unwrap(), 30);
        assert_eq!(require_i64(&params, "t", "b").unwrap(), 30);
        assert_eq!(require_i64(&params, "t", "c").unwrap(), 45);
    }

    #[test]
    fn require_i64_reports_missing_and_invalid() {
        let params = json!({"a": "soon"});
        assert!(matches!(
            require_i64(&params, "t", "missing"),
            Err(ToolError::InvalidParameters { .. })
        ));
        let err = require_i64(&params, "t", "a").unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
    }
}
