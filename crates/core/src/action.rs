//! The closed set of screen actions the agent may perform.
//!
//! Coordinates are always in target space (see [`crate::geometry`]); nothing
//! outside the executor ever sees native pixels. Parsing from a model tool
//! call happens here so the provider adapters stay wire-format-only.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Mouse button / click kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Double,
    Triple,
}

/// An action the model can request. Closed enum — anything a provider sends
/// that doesn't map onto one of these is rejected at parse time, never
/// forwarded to the OS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Capture the screen; no side effects.
    Screenshot,
    /// Move the pointer to a target-space coordinate.
    MoveMouse { x: i32, y: i32 },
    /// Click at a target-space coordinate.
    Click { button: MouseButton, x: i32, y: i32 },
    /// Type a string of text.
    TypeText { text: String },
    /// Press a key or key combo, e.g. "return" or "cmd+shift+t".
    KeyPress { combo: String },
    /// Scroll at the current pointer position. Positive `dy` scrolls up,
    /// positive `dx` scrolls right. A coordinate sent with the scroll is
    /// bounds-checked like any other, but scrolling still happens at the
    /// pointer.
    Scroll {
        dx: i32,
        dy: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<(i32, i32)>,
    },
    /// Pause before the next action.
    Wait { ms: u64 },
}

impl Action {
    /// Parse an action from a `computer` tool call's input, using the
    /// Anthropic computer-use action vocabulary.
    pub fn from_tool_use(input: &serde_json::Value) -> Result<Self, ProviderError> {
        let kind = input
            .get("action")
            .and_then(|v| v.as_str())
            .ok_or_else(|| malformed("missing \"action\" field", input))?;

        match kind {
            "screenshot" => Ok(Action::Screenshot),
            "mouse_move" => {
                let (x, y) = coordinate(input)?;
                Ok(Action::MoveMouse { x, y })
            }
            "left_click" | "right_click" | "middle_click" | "double_click" | "triple_click" => {
                let button = match kind {
                    "left_click" => MouseButton::Left,
                    "right_click" => MouseButton::Right,
                    "middle_click" => MouseButton::Middle,
                    "double_click" => MouseButton::Double,
                    _ => MouseButton::Triple,
                };
                let (x, y) = coordinate(input)?;
                Ok(Action::Click { button, x, y })
            }
            "type" => {
                let text = input
                    .get("text")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| malformed("type action missing \"text\"", input))?;
                Ok(Action::TypeText { text: text.to_string() })
            }
            "key" => {
                let combo = input
                    .get("text")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| malformed("key action missing \"text\"", input))?;
                Ok(Action::KeyPress { combo: combo.to_string() })
            }
            "scroll" => {
                let amount = input
                    .get("scroll_amount")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(3) as i32;
                let direction = input
                    .get("scroll_direction")
                    .and_then(|v| v.as_str())
                    .unwrap_or("down");
                let (dx, dy) = match direction {
                    "up" => (0, amount),
                    "down" => (0, -amount),
                    "left" => (-amount, 0),
                    "right" => (amount, 0),
                    other => {
                        return Err(malformed(
                            &format!("unknown scroll_direction \"{other}\""),
                            input,
                        ));
                    }
                };
                let at = match input.get("coordinate") {
                    Some(_) => Some(coordinate(input)?),
                    None => None,
                };
                Ok(Action::Scroll { dx, dy, at })
            }
            "wait" => {
                let secs = input
                    .get("duration")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(1.0)
                    .clamp(0.0, 30.0);
                Ok(Action::Wait { ms: (secs * 1000.0) as u64 })
            }
            other => Err(malformed(&format!("unknown action \"{other}\""), input)),
        }
    }

    /// The target-space coordinate this action touches, if any.
    pub fn coordinate(&self) -> Option<(i32, i32)> {
        match self {
            Action::MoveMouse { x, y } | Action::Click { x, y, .. } => Some((*x, *y)),
            Action::Scroll { at, .. } => *at,
            _ => None,
        }
    }

    /// Whether this action changes screen state (and so deserves a settle
    /// delay before the next capture).
    pub fn is_state_changing(&self) -> bool {
        matches!(
            self,
            Action::Click { .. }
                | Action::TypeText { .. }
                | Action::KeyPress { .. }
                | Action::Scroll { .. }
        )
    }

    /// Short label for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Screenshot => "screenshot",
            Action::MoveMouse { .. } => "mouse_move",
            Action::Click { .. } => "click",
            Action::TypeText { .. } => "type",
            Action::KeyPress { .. } => "key",
            Action::Scroll { .. } => "scroll",
            Action::Wait { .. } => "wait",
        }
    }
}

fn coordinate(input: &serde_json::Value) -> Result<(i32, i32), ProviderError> {
    let coord = input
        .get("coordinate")
        .and_then(|v| v.as_array())
        .ok_or_else(|| malformed("missing \"coordinate\" array", input))?;
    if coord.len() != 2 {
        return Err(malformed("\"coordinate\" must have exactly two elements", input));
    }
    let x = coord[0]
        .as_i64()
        .ok_or_else(|| malformed("coordinate x is not an integer", input))?;
    let y = coord[1]
        .as_i64()
        .ok_or_else(|| malformed("coordinate y is not an integer", input))?;
    Ok((x as i32, y as i32))
}

fn malformed(reason: &str, input: &serde_json::Value) -> ProviderError {
    ProviderError::MalformedResponse(format!("{reason} in tool input {input}"))
}
