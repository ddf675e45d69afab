//! Action executor — validation, coordinate scaling, and dispatch.
//!
//! The executor is the only path from a parsed `Action` to the OS. It
//! enforces target-space bounds before anything touches the controller:
//! an out-of-range coordinate is rejected as `InvalidCoordinate`, never
//! clamped. Actions execute strictly sequentially, and state-changing
//! actions are followed by a settle delay so the post-action screenshot
//! shows the screen after the UI reacted.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use handsfree_core::action::{Action, MouseButton};
use handsfree_core::error::ExecutorError;
use handsfree_core::geometry::DisplayGeometry;
use handsfree_core::os::OsController;
use handsfree_core::turn::ImagePayload;

/// A screenshot at the target resolution, ready for a model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedFrame {
    pub png_base64: String,
    pub geometry: DisplayGeometry,
}

impl CapturedFrame {
    pub fn into_payload(self) -> ImagePayload {
        ImagePayload::png(self.png_base64)
    }
}

/// The result of one executed action.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Human-readable summary, reported back to the model as the tool result
    pub summary: String,

    /// Post-action screenshot; `None` only if the capture itself failed
    pub frame: Option<CapturedFrame>,
}

/// Validates and executes actions against an `OsController`.
pub struct Executor {
    os: Arc<dyn OsController>,
    geometry: DisplayGeometry,
    settle_delay: Duration,
}

impl Executor {
    pub fn new(os: Arc<dyn OsController>, geometry: DisplayGeometry, settle_delay: Duration) -> Self {
        Self {
            os,
            geometry,
            settle_delay,
        }
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    /// Capture the screen at the target resolution.
    pub async fn capture(&self) -> Result<CapturedFrame, ExecutorError> {
        let bytes = self.os.screenshot(&self.geometry).await?;
        Ok(CapturedFrame {
            png_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
            geometry: self.geometry,
        })
    }

    /// Execute one action.
    ///
    /// Coordinates are validated against the target bounds before the OS
    /// layer is touched. OS failures come back as `Err`; the loop reports
    /// them to the model as tool failures rather than crashing.
    pub async fn execute(&self, action: &Action) -> Result<ExecOutcome, ExecutorError> {
        if let Some((x, y)) = action.coordinate() {
            if !self.geometry.contains_target(x, y) {
                return Err(ExecutorError::InvalidCoordinate {
                    x,
                    y,
                    width: self.geometry.target_width,
                    height: self.geometry.target_height,
                });
            }
        }

        debug!(action = action.kind(), "Executing action");

        let summary = match action {
            Action::Screenshot => "Screenshot captured".to_string(),
            Action::MoveMouse { x, y } => {
                let (nx, ny) = self.geometry.to_native(*x, *y);
                self.os.move_mouse(nx, ny).await?;
                format!("Moved mouse to ({x}, {y})")
            }
            Action::Click { button, x, y } => {
                let (nx, ny) = self.geometry.to_native(*x, *y);
                self.os.click(*button, nx, ny).await?;
                format!("{} at ({x}, {y})", click_label(*button))
            }
            Action::TypeText { text } => {
                self.os.type_text(text).await?;
                format!("Typed {} characters", text.chars().count())
            }
            Action::KeyPress { combo } => {
                self.os.key_press(combo).await?;
                format!("Pressed {combo}")
            }
            Action::Scroll { dx, dy, .. } => {
                self.os.scroll(*dx, *dy).await?;
                format!("Scrolled by ({dx}, {dy})")
            }
            Action::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                format!("Waited {ms}ms")
            }
        };

        if action.is_state_changing() && !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        // Every outcome carries a fresh frame so the model always sees the
        // screen it is about to act on. A failed capture degrades the
        // outcome instead of failing an action that already succeeded.
        let frame = match self.capture().await {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "Post-action capture failed");
                None
            }
        };

        Ok(ExecOutcome { summary, frame })
    }
}

fn click_label(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "Left click",
        MouseButton::Right => "Right click",
        MouseButton::Middle => "Middle click",
        MouseButton::Double => "Double click",
        MouseButton::Triple => "Triple click",
    }
}
