//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send the conversation history (text turns plus
//! screenshots) to a model and get back text and/or tool calls. The agent
//! loop calls `invoke()` without knowing which backend is wired in.
//!
//! Implementations: native Anthropic Messages API, OpenAI-compatible.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::geometry::DisplayGeometry;
use crate::turn::{ToolUse, Turn};

/// One model invocation: the full history plus screen geometry so the
/// adapter can declare the computer-use tool with the right display size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// The model to use (e.g. "claude-sonnet-4-20250514")
    pub model: String,

    /// System prompt
    pub system: String,

    /// Conversation history, oldest first
    pub turns: Vec<Turn>,

    /// Display geometry — the target resolution is advertised to the model
    pub geometry: DisplayGeometry,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// A complete reply from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReply {
    /// Assistant text (may be empty when the reply is all tool calls)
    pub text: String,

    /// Requested actions, in proposal order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolUse>,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ModelReply {
    /// A reply with no tool calls is terminal — the run ends with its text.
    pub fn is_terminal(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Send the history and get a complete reply.
    async fn invoke(&self, request: InvokeRequest)
        -> std::result::Result<ModelReply, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_without_tool_calls_is_terminal() {
        let reply = ModelReply {
            text: "All done.".into(),
            tool_calls: vec![],
            usage: None,
            model: "claude-sonnet-4-20250514".into(),
        };
        assert!(reply.is_terminal());
    }

    #[test]
    fn reply_with_tool_calls_continues() {
        let reply = ModelReply {
            text: String::new(),
            tool_calls: vec![ToolUse {
                id: "toolu_01".into(),
                name: "computer".into(),
                input: serde_json::json!({"action": "screenshot"}),
            }],
            usage: None,
            model: "claude-sonnet-4-20250514".into(),
        };
        assert!(!reply.is_terminal());
    }
}
