//! Turn and tool-call domain types.
//!
//! These are the core value objects that flow through the system:
//! a spoken command becomes a user turn → the provider answers with an
//! assistant turn (possibly carrying tool calls) → executed actions come back
//! as tool turns carrying fresh screenshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a turn in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (spoken command, or a synthetic screenshot frame)
    User,
    /// The model
    Assistant,
    /// Result of an executed action
    Tool,
}

/// A base64-encoded screenshot riding along with a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// MIME type, always "image/png" for our captures
    pub media_type: String,

    /// Base64-encoded image bytes
    pub data: String,
}

impl ImagePayload {
    pub fn png(data: impl Into<String>) -> Self {
        Self {
            media_type: "image/png".into(),
            data: data.into(),
        }
    }
}

/// A tool call requested by the model in an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Provider-assigned ID, echoed back in the matching tool result
    pub id: String,

    /// Tool name (e.g. "computer")
    pub name: String,

    /// Raw arguments as received from the provider
    pub input: serde_json::Value,
}

/// A single turn in the agent's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: Role,

    /// The text content (may be empty for image-only turns)
    pub content: String,

    /// Tool calls requested by the model (assistant turns only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolUse>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Screenshot attached to this turn, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn from command text.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            image: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            image: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn carrying tool calls.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolUse>) -> Self {
        Self {
            tool_calls,
            ..Self::assistant(content)
        }
    }

    /// Create a tool result turn.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            image: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a tool result turn carrying a screenshot.
    pub fn tool_result_with_image(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
        image: ImagePayload,
    ) -> Self {
        Self {
            image: Some(image),
            ..Self::tool_result(tool_call_id, content)
        }
    }

    /// Create a synthetic user turn carrying only a screenshot.
    ///
    /// The per-iteration screen capture enters history this way so it is
    /// pruned by the same image-retention rule as tool-result screenshots.
    pub fn screenshot(image: ImagePayload) -> Self {
        Self {
            image: Some(image),
            ..Self::user("")
        }
    }

    /// Whether this turn carries an image payload.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("open safari");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "open safari");
        assert!(turn.tool_calls.is_empty());
        assert!(!turn.has_image());
    }

    #[test]
    fn tool_result_links_back_to_call() {
        let turn = Turn::tool_result("toolu_01", "done");
        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.tool_call_id.as_deref(), Some("toolu_01"));
    }

    #[test]
    fn screenshot_turn_is_image_only_user_turn() {
        let turn = Turn::screenshot(ImagePayload::png("aGVsbG8="));
        assert_eq!(turn.role, Role::User);
        assert!(turn.content.is_empty());
        assert!(turn.has_image());
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn::assistant_with_tools(
            "Clicking the button",
            vec![ToolUse {
                id: "toolu_01".into(),
                name: "computer".into(),
                input: serde_json::json!({"action": "left_click", "coordinate": [10, 20]}),
            }],
        );
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::Assistant);
        assert_eq!(back.tool_calls.len(), 1);
        assert_eq!(back.tool_calls[0].name, "computer");
    }
}
