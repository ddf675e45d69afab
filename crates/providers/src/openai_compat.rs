//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, vLLM, and any endpoint exposing
//! `/v1/chat/completions`. These backends have no native computer-use tool,
//! so the screen is exposed as a `computer` function tool whose schema
//! mirrors the action vocabulary, and screenshots travel as data-URI image
//! parts in user messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use handsfree_core::error::ProviderError;
use handsfree_core::provider::{InvokeRequest, ModelReply, Usage};
use handsfree_core::turn::{Role, ToolUse, Turn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// The `computer` tool declaration sent with every request.
    fn computer_tool(width: u32, height: u32) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": "computer",
                "description": format!(
                    "Control the screen at {width}x{height}. Take screenshots, move the \
                     mouse, click, type, press keys, and scroll."
                ),
                "parameters": {
                    "type": "object",
                    "properties": {
                        "action": {
                            "type": "string",
                            "enum": [
                                "screenshot", "mouse_move", "left_click", "right_click",
                                "middle_click", "double_click", "triple_click", "type",
                                "key", "scroll", "wait"
                            ]
                        },
                        "coordinate": {
                            "type": "array",
                            "items": {"type": "integer"},
                            "description": "[x, y] position for mouse actions"
                        },
                        "text": {
                            "type": "string",
                            "description": "Text to type, or key combo to press"
                        },
                        "scroll_direction": {
                            "type": "string",
                            "enum": ["up", "down", "left", "right"]
                        },
                        "scroll_amount": {"type": "integer"},
                        "duration": {
                            "type": "number",
                            "description": "Seconds to wait"
                        }
                    },
                    "required": ["action"]
                }
            }
        })
    }

    /// Convert turns to OpenAI API format.
    ///
    /// Tool messages only carry text in this dialect, so a screenshot that
    /// belongs to a tool result is re-attached as a follow-up user message.
    fn to_api_messages(system: &str, turns: &[Turn]) -> Vec<serde_json::Value> {
        let mut result = vec![serde_json::json!({"role": "system", "content": system})];

        for turn in turns {
            match turn.role {
                Role::User => {
                    if let Some(image) = &turn.image {
                        let mut parts = Vec::new();
                        if !turn.content.is_empty() {
                            parts.push(serde_json::json!({"type": "text", "text": turn.content}));
                        }
                        parts.push(image_part(&image.media_type, &image.data));
                        result.push(serde_json::json!({"role": "user", "content": parts}));
                    } else if !turn.content.is_empty() {
                        result.push(serde_json::json!({"role": "user", "content": turn.content}));
                    }
                }
                Role::Assistant => {
                    let mut msg = serde_json::json!({
                        "role": "assistant",
                        "content": turn.content,
                    });
                    if !turn.tool_calls.is_empty() {
                        let calls: Vec<serde_json::Value> = turn
                            .tool_calls
                            .iter()
                            .map(|tc| {
                                serde_json::json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.input.to_string(),
                                    }
                                })
                            })
                            .collect();
                        msg["tool_calls"] = serde_json::json!(calls);
                    }
                    result.push(msg);
                }
                Role::Tool => {
                    result.push(serde_json::json!({
                        "role": "tool",
                        "tool_call_id": turn.tool_call_id.clone().unwrap_or_default(),
                        "content": if turn.content.is_empty() {
                            "ok"
                        } else {
                            turn.content.as_str()
                        },
                    }));
                    if let Some(image) = &turn.image {
                        result.push(serde_json::json!({
                            "role": "user",
                            "content": [image_part(&image.media_type, &image.data)],
                        }));
                    }
                }
            }
        }

        result
    }
}

fn image_part(media_type: &str, data: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "image_url",
        "image_url": {"url": format!("data:{media_type};base64,{data}")}
    })
}

#[async_trait]
impl handsfree_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<ModelReply, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.system, &request.turns),
            "max_tokens": request.max_tokens,
            "tools": [Self::computer_tool(
                request.geometry.target_width,
                request.geometry.target_height,
            )],
            "stream": false,
        });

        debug!(provider = %self.name, model = %request.model, "Sending invoke request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
            return Err(ProviderError::RateLimited { retry_after_secs: 5 });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::MalformedResponse("No choices in response".into())
        })?;

        let mut tool_calls = Vec::new();
        for tc in choice.message.tool_calls.unwrap_or_default() {
            let input: serde_json::Value =
                serde_json::from_str(&tc.function.arguments).map_err(|e| {
                    ProviderError::MalformedResponse(format!(
                        "Unparseable tool arguments for {}: {e}",
                        tc.function.name
                    ))
                })?;
            tool_calls.push(ToolUse {
                id: tc.id,
                name: tc.function.name,
                input,
            });
        }

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ModelReply {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage,
            model: api_response.model.unwrap_or(request.model),
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

// --- OpenAI API response types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use handsfree_core::turn::ImagePayload;
    use handsfree_core::Provider;

    #[test]
    fn constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn computer_tool_schema_advertises_display_size() {
        let tool = OpenAiCompatProvider::computer_tool(1280, 800);
        let desc = tool["function"]["description"].as_str().unwrap();
        assert!(desc.contains("1280x800"));
        let actions = &tool["function"]["parameters"]["properties"]["action"]["enum"];
        assert!(actions.as_array().unwrap().iter().any(|a| a == "screenshot"));
    }

    #[test]
    fn system_message_comes_first() {
        let msgs = OpenAiCompatProvider::to_api_messages("be helpful", &[Turn::user("hi")]);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[0]["content"], "be helpful");
        assert_eq!(msgs[1]["role"], "user");
    }

    #[test]
    fn tool_result_image_becomes_user_message() {
        let turn = Turn::tool_result_with_image(
            "call_1",
            "Screenshot captured",
            ImagePayload::png("aGVsbG8="),
        );
        let msgs = OpenAiCompatProvider::to_api_messages("sys", &[turn]);
        // system + tool + follow-up user image
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1]["role"], "tool");
        assert_eq!(msgs[2]["role"], "user");
        let url = msgs[2]["content"][0]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn assistant_tool_calls_serialize_arguments_as_string() {
        let turn = Turn::assistant_with_tools(
            "",
            vec![ToolUse {
                id: "call_1".into(),
                name: "computer".into(),
                input: serde_json::json!({"action": "screenshot"}),
            }],
        );
        let msgs = OpenAiCompatProvider::to_api_messages("sys", &[turn]);
        let args = msgs[1]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(args).unwrap();
        assert_eq!(parsed["action"], "screenshot");
    }

    #[test]
    fn empty_tool_result_content_defaults_to_ok() {
        let turn = Turn::tool_result("call_1", "");
        let msgs = OpenAiCompatProvider::to_api_messages("sys", &[turn]);
        assert_eq!(msgs[1]["content"], "ok");
    }
}
