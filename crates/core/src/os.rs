//! OsController trait — the abstraction over screen manipulation.
//!
//! The executor validates and scales coordinates, then dispatches through
//! this trait. The shipped implementation shells out to cliclick,
//! screencapture, sips, and osascript; tests substitute a recording mock.
//!
//! All coordinates crossing this boundary are **native** pixels — target-space
//! validation has already happened by the time a call lands here.

use async_trait::async_trait;

use crate::action::MouseButton;
use crate::error::ExecutorError;
use crate::geometry::DisplayGeometry;

/// Low-level screen control operations.
#[async_trait]
pub trait OsController: Send + Sync {
    /// The native display resolution, probed once at startup.
    async fn native_size(&self) -> Result<(u32, u32), ExecutorError>;

    /// Capture the screen and downsample to the geometry's target
    /// resolution. Returns PNG bytes.
    async fn screenshot(&self, geometry: &DisplayGeometry) -> Result<Vec<u8>, ExecutorError>;

    /// Move the pointer to a native pixel coordinate.
    async fn move_mouse(&self, x: u32, y: u32) -> Result<(), ExecutorError>;

    /// Click at a native pixel coordinate.
    async fn click(&self, button: MouseButton, x: u32, y: u32) -> Result<(), ExecutorError>;

    /// Type a string at the current focus.
    async fn type_text(&self, text: &str) -> Result<(), ExecutorError>;

    /// Press a key or combo ("return", "cmd+shift+t").
    async fn key_press(&self, combo: &str) -> Result<(), ExecutorError>;

    /// Scroll at the current pointer position. Positive `dy` scrolls up,
    /// positive `dx` scrolls right.
    async fn scroll(&self, dx: i32, dy: i32) -> Result<(), ExecutorError>;
}
