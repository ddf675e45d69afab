//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not OpenAI-compatible proxy).
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` and computer-use beta headers
//! - System prompt as top-level field
//! - The `computer_20250124` tool declared with the target display size
//! - Screenshots as base64 image blocks inside tool results

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use handsfree_core::error::ProviderError;
use handsfree_core::provider::{InvokeRequest, ModelReply, Usage};
use handsfree_core::turn::{ImagePayload, Role, ToolUse, Turn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const COMPUTER_USE_BETA: &str = "computer-use-2025-01-24";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert turns to Anthropic API format with content blocks.
    fn to_api_messages(turns: &[Turn]) -> Vec<AnthropicMessage> {
        let mut result = Vec::new();

        for turn in turns {
            match turn.role {
                Role::User => {
                    let mut blocks: Vec<ContentBlock> = Vec::new();
                    if !turn.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: turn.content.clone(),
                        });
                    }
                    if let Some(image) = &turn.image {
                        blocks.push(image_block(image));
                    }
                    if blocks.is_empty() {
                        continue;
                    }
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: blocks,
                    });
                }
                Role::Assistant => {
                    let mut blocks: Vec<ContentBlock> = Vec::new();
                    if !turn.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: turn.content.clone(),
                        });
                    }
                    for tc in &turn.tool_calls {
                        blocks.push(ContentBlock::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: tc.input.clone(),
                        });
                    }
                    if blocks.is_empty() {
                        continue;
                    }
                    result.push(AnthropicMessage {
                        role: "assistant".into(),
                        content: blocks,
                    });
                }
                Role::Tool => {
                    // Tool results travel as user messages
                    let mut inner: Vec<ContentBlock> = Vec::new();
                    if !turn.content.is_empty() {
                        inner.push(ContentBlock::Text {
                            text: turn.content.clone(),
                        });
                    }
                    if let Some(image) = &turn.image {
                        inner.push(image_block(image));
                    }
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: vec![ContentBlock::ToolResult {
                            tool_use_id: turn.tool_call_id.clone().unwrap_or_default(),
                            content: inner,
                        }],
                    });
                }
            }
        }

        result
    }

    /// Convert Anthropic API response to our ModelReply.
    fn response_to_reply(resp: AnthropicResponse) -> Result<ModelReply, ProviderError> {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                ResponseContentBlock::Text { text: t } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&t);
                }
                ResponseContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolUse { id, name, input });
                }
            }
        }

        let usage = Some(Usage {
            prompt_tokens: resp.usage.input_tokens,
            completion_tokens: resp.usage.output_tokens,
            total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
        });

        Ok(ModelReply {
            text,
            tool_calls,
            usage,
            model: resp.model,
        })
    }
}

#[async_trait]
impl handsfree_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<ModelReply, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let api_messages = Self::to_api_messages(&request.turns);

        let body = serde_json::json!({
            "model": request.model,
            "system": request.system,
            "messages": api_messages,
            "max_tokens": request.max_tokens,
            "tools": [{
                "type": "computer_20250124",
                "name": "computer",
                "display_width_px": request.geometry.target_width,
                "display_height_px": request.geometry.target_height,
                "display_number": 1,
            }],
        });

        debug!(
            provider = "anthropic",
            model = %request.model,
            turns = request.turns.len(),
            "Sending invoke request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", COMPUTER_USE_BETA)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model.clone()));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!(
                "Failed to parse Anthropic response: {e}"
            )))?;

        Self::response_to_reply(api_resp)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        // Minimal request to verify the API key
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": "claude-haiku-35-20241022",
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 1,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        // 200 = works, 401 = bad key, anything else = reachable but error
        Ok(response.status().is_success() || response.status().as_u16() != 401)
    }
}

fn image_block(image: &ImagePayload) -> ContentBlock {
    ContentBlock::Image {
        source: ImageSource {
            source_type: "base64".into(),
            media_type: image.media_type.clone(),
            data: image.data.clone(),
        },
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: Vec<ContentBlock>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
    #[serde(default)]
    #[allow(dead_code)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use handsfree_core::Provider;

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider =
            AnthropicProvider::new("sk-ant-test").with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn turn_conversion_user_assistant() {
        let turns = vec![Turn::user("open safari"), Turn::assistant("Opening it now")];
        let api_msgs = AnthropicProvider::to_api_messages(&turns);
        assert_eq!(api_msgs.len(), 2);
        assert_eq!(api_msgs[0].role, "user");
        assert_eq!(api_msgs[1].role, "assistant");
    }

    #[test]
    fn turn_conversion_with_tool_calls() {
        let turn = Turn::assistant_with_tools(
            "Taking a look",
            vec![ToolUse {
                id: "toolu_123".into(),
                name: "computer".into(),
                input: serde_json::json!({"action": "screenshot"}),
            }],
        );

        let api_msgs = AnthropicProvider::to_api_messages(&[turn]);
        assert_eq!(api_msgs.len(), 1);
        assert_eq!(api_msgs[0].role, "assistant");
        assert_eq!(api_msgs[0].content.len(), 2); // text + tool_use
        match &api_msgs[0].content[1] {
            ContentBlock::ToolUse { id, name, .. } => {
                assert_eq!(id, "toolu_123");
                assert_eq!(name, "computer");
            }
            _ => panic!("Expected tool_use block"),
        }
    }

    #[test]
    fn turn_conversion_tool_result_with_screenshot() {
        let turn = Turn::tool_result_with_image(
            "toolu_123",
            "Screenshot captured",
            ImagePayload::png("aGVsbG8="),
        );

        let api_msgs = AnthropicProvider::to_api_messages(&[turn]);
        assert_eq!(api_msgs.len(), 1);
        assert_eq!(api_msgs[0].role, "user"); // Tool results go as user messages

        match &api_msgs[0].content[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => {
                assert_eq!(tool_use_id, "toolu_123");
                assert_eq!(content.len(), 2); // text + image
                assert!(matches!(content[1], ContentBlock::Image { .. }));
            }
            _ => panic!("Expected tool_result block"),
        }
    }

    #[test]
    fn turn_conversion_skips_empty_turns() {
        let mut turn = Turn::user("");
        turn.image = None;
        let api_msgs = AnthropicProvider::to_api_messages(&[turn]);
        assert!(api_msgs.is_empty());
    }

    #[test]
    fn screenshot_turn_becomes_user_image_message() {
        let turn = Turn::screenshot(ImagePayload::png("aGVsbG8="));
        let api_msgs = AnthropicProvider::to_api_messages(&[turn]);
        assert_eq!(api_msgs.len(), 1);
        assert_eq!(api_msgs[0].role, "user");
        assert!(matches!(api_msgs[0].content[0], ContentBlock::Image { .. }));
    }

    #[test]
    fn parse_text_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_01",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": "All done."}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let reply = AnthropicProvider::response_to_reply(resp).unwrap();
        assert_eq!(reply.text, "All done.");
        assert!(reply.is_terminal());
        assert_eq!(reply.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn parse_tool_use_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_02",
                "model": "claude-sonnet-4-20250514",
                "content": [
                    {"type": "text", "text": "Clicking the address bar"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "computer",
                     "input": {"action": "left_click", "coordinate": [640, 30]}}
                ],
                "usage": {"input_tokens": 20, "output_tokens": 10},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let reply = AnthropicProvider::response_to_reply(resp).unwrap();
        assert!(!reply.is_terminal());
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "computer");
        assert_eq!(reply.tool_calls[0].input["action"], "left_click");
    }

    #[test]
    fn content_block_serialization() {
        let block = ContentBlock::Image {
            source: ImageSource {
                source_type: "base64".into(),
                media_type: "image/png".into(),
                data: "aGVsbG8=".into(),
            },
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"type\":\"image\""));
        assert!(json.contains("\"media_type\":\"image/png\""));
    }
}
