//! macOS implementation of `OsController`.
//!
//! Drives the screen with stock command-line tools:
//! - `cliclick` for mouse movement, clicks, typing, and key presses
//! - `screencapture` + `sips` for screenshots downsampled to target size
//! - `osascript` for scrolling (cliclick has no scroll verb) and app quitting
//!
//! Every helper invocation runs under a timeout; a wedged subprocess must
//! never stall the agent loop.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use handsfree_core::action::MouseButton;
use handsfree_core::error::ExecutorError;
use handsfree_core::geometry::DisplayGeometry;
use handsfree_core::os::OsController;

/// Keystrokes per cliclick invocation when typing long text.
const TYPING_GROUP_SIZE: usize = 50;
/// Milliseconds between keystrokes (cliclick `-w` flag).
const TYPING_DELAY_MS: u64 = 2;

/// The shipped macOS controller.
pub struct MacOsController {
    command_timeout: Duration,
}

impl Default for MacOsController {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

impl MacOsController {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    /// cliclick command code for a click kind.
    fn click_code(button: MouseButton) -> &'static str {
        match button {
            MouseButton::Left => "c",
            MouseButton::Right => "rc",
            MouseButton::Middle => "mc",
            MouseButton::Double => "dc",
            MouseButton::Triple => "tc",
        }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ExecutorError> {
        run_cmd(program, args, self.command_timeout).await
    }

    async fn cliclick(&self, args: &[&str]) -> Result<String, ExecutorError> {
        self.run("cliclick", args).await
    }
}

#[async_trait]
impl OsController for MacOsController {
    async fn native_size(&self) -> Result<(u32, u32), ExecutorError> {
        probe_native_size(self.command_timeout).await
    }

    async fn screenshot(&self, geometry: &DisplayGeometry) -> Result<Vec<u8>, ExecutorError> {
        let path = format!(
            "/tmp/handsfree_screen_{}.png",
            uuid::Uuid::new_v4().simple()
        );

        let capture = self.run("screencapture", &["-x", "-t", "png", &path]).await;
        if let Err(e) = capture {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ExecutorError::CaptureFailed(e.to_string()));
        }

        // A zero-byte file means Screen Recording permission was denied.
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() == 0 => {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(ExecutorError::CaptureFailed(
                    "Screen Recording permission required (System Settings → Privacy & \
                     Security → Screen Recording)"
                        .into(),
                ));
            }
            Err(e) => {
                return Err(ExecutorError::CaptureFailed(format!(
                    "Cannot stat screenshot: {e}"
                )));
            }
            _ => {}
        }

        // Downsample to the target resolution the model reasons at.
        let resize = self
            .run(
                "sips",
                &[
                    "-z",
                    &geometry.target_height.to_string(),
                    &geometry.target_width.to_string(),
                    &path,
                ],
            )
            .await;
        if let Err(e) = resize {
            warn!(error = %e, "sips downsample failed, sending native-resolution capture");
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ExecutorError::CaptureFailed(format!("Failed to read screenshot: {e}")))?;
        let _ = tokio::fs::remove_file(&path).await;

        debug!(bytes = bytes.len(), "Captured screenshot");
        Ok(bytes)
    }

    async fn move_mouse(&self, x: u32, y: u32) -> Result<(), ExecutorError> {
        self.cliclick(&[&format!("m:{x},{y}")]).await.map(|_| ())
    }

    async fn click(&self, button: MouseButton, x: u32, y: u32) -> Result<(), ExecutorError> {
        let code = Self::click_code(button);
        self.cliclick(&[&format!("{code}:{x},{y}")]).await.map(|_| ())
    }

    async fn type_text(&self, text: &str) -> Result<(), ExecutorError> {
        // cliclick chokes on very long strings; type in small groups with a
        // short per-keystroke delay, like a fast human.
        let chars: Vec<char> = text.chars().collect();
        for chunk in chars.chunks(TYPING_GROUP_SIZE) {
            let group: String = chunk.iter().collect();
            let wait = TYPING_DELAY_MS.to_string();
            self.cliclick(&["-w", &wait, &format!("t:{group}")]).await?;
        }
        Ok(())
    }

    async fn key_press(&self, combo: &str) -> Result<(), ExecutorError> {
        let args = parse_key_combo(combo);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.cliclick(&refs).await.map(|_| ())
    }

    async fn scroll(&self, dx: i32, dy: i32) -> Result<(), ExecutorError> {
        // osascript's vertical scroll is positive-up, matching our dy.
        // Its horizontal scroll is positive-left, so dx flips sign.
        if dy != 0 {
            let script = format!("tell application \"System Events\" to scroll by {dy}");
            self.run("osascript", &["-e", &script]).await?;
        }
        if dx != 0 {
            let script = format!(
                "tell application \"System Events\" to horizontal scroll by {}",
                -dx
            );
            self.run("osascript", &["-e", &script]).await?;
        }
        Ok(())
    }
}

/// Launch (or foreground) an application by name.
pub async fn open_app(name: &str, timeout: Duration) -> Result<(), ExecutorError> {
    run_cmd("open", &["-a", name], timeout).await?;
    // Give the app a beat to come to the foreground.
    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok(())
}

/// Quit an application gracefully via AppleScript.
pub async fn quit_app(name: &str, timeout: Duration) -> Result<(), ExecutorError> {
    let script = format!("tell application \"{name}\" to quit");
    run_cmd("osascript", &["-e", &script], timeout).await.map(|_| ())
}

/// Check that cliclick is installed and Accessibility is granted.
pub async fn check_cliclick(timeout: Duration) -> Result<(), ExecutorError> {
    if run_cmd("which", &["cliclick"], timeout).await.is_err() {
        return Err(ExecutorError::MissingDependency(
            "cliclick not found. Install with: brew install cliclick".into(),
        ));
    }

    // cliclick exits non-zero without Accessibility; a cursor-position query
    // is a side-effect-free probe.
    match run_cmd("cliclick", &["p"], timeout).await {
        Ok(_) => Ok(()),
        Err(e) => {
            let msg = e.to_string().to_lowercase();
            if msg.contains("accessibility") || msg.contains("permission") || msg.contains("not allowed") {
                Err(ExecutorError::MissingDependency(
                    "Accessibility permission required (System Settings → Privacy & \
                     Security → Accessibility)"
                        .into(),
                ))
            } else {
                Err(ExecutorError::Os {
                    action: "cliclick probe".into(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Probe the native display resolution.
///
/// Tries AppKit via python3 first, falling back to `system_profiler` parsing.
pub async fn probe_native_size(timeout: Duration) -> Result<(u32, u32), ExecutorError> {
    if let Ok(out) = run_cmd(
        "python3",
        &[
            "-c",
            "from AppKit import NSScreen; f=NSScreen.mainScreen().frame(); \
             print(int(f.size.width), int(f.size.height))",
        ],
        timeout,
    )
    .await
    {
        if let Some((w, h)) = parse_size_pair(&out) {
            return Ok((w, h));
        }
    }

    let out = run_cmd("system_profiler", &["SPDisplaysDataType"], timeout)
        .await
        .map_err(|e| ExecutorError::Os {
            action: "probe display size".into(),
            reason: e.to_string(),
        })?;

    for line in out.lines() {
        let trimmed = line.trim();
        if trimmed.contains("Resolution:") || trimmed.contains("UI Looks like:") {
            if let Some(pair) = parse_resolution_line(trimmed) {
                return Ok(pair);
            }
        }
    }

    Err(ExecutorError::Os {
        action: "probe display size".into(),
        reason: "no resolution found in system_profiler output".into(),
    })
}

fn parse_size_pair(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split_whitespace();
    let w: u32 = parts.next()?.parse().ok()?;
    let h: u32 = parts.next()?.parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Parse "Resolution: 3024 x 1964 Retina" style lines.
fn parse_resolution_line(line: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "x" && i > 0 && i + 1 < parts.len() {
            let w: u32 = parts[i - 1].parse().ok()?;
            let h: u32 = parts[i + 1].parse().ok()?;
            if w > 0 && w <= 7680 && h > 0 {
                return Some((w, h));
            }
        }
    }
    None
}

/// Run a command with a timeout, returning trimmed stdout on success.
async fn run_cmd(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, ExecutorError> {
    let result = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(program).args(args).output(),
    )
    .await;

    match result {
        Ok(Ok(output)) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                Err(ExecutorError::Os {
                    action: program.to_string(),
                    reason: stderr,
                })
            }
        }
        Ok(Err(e)) => Err(ExecutorError::Os {
            action: program.to_string(),
            reason: format!("failed to spawn: {e}"),
        }),
        Err(_) => Err(ExecutorError::Timeout {
            command: program.to_string(),
            timeout_secs: timeout.as_secs(),
        }),
    }
}

/// Parse a key combo string into cliclick arguments.
///
/// Examples:
/// - `"cmd+c"` → `["kd:cmd", "kp:c", "ku:cmd"]`
/// - `"cmd+shift+t"` → `["kd:cmd", "kd:shift", "kp:t", "ku:shift", "ku:cmd"]`
/// - `"enter"` → `["kp:return"]`
fn parse_key_combo(combo: &str) -> Vec<String> {
    let parts: Vec<&str> = combo.split('+').map(str::trim).collect();

    if parts.len() == 1 {
        let key = map_key_name(parts[0]);
        return vec![format!("kp:{key}")];
    }

    // All but the last part are modifiers.
    let modifiers = &parts[..parts.len() - 1];
    let key = map_key_name(parts[parts.len() - 1]);

    let mut args = Vec::new();
    for m in modifiers {
        args.push(format!("kd:{}", map_key_name(m)));
    }
    args.push(format!("kp:{key}"));
    for m in modifiers.iter().rev() {
        args.push(format!("ku:{}", map_key_name(m)));
    }
    args
}

/// Map common key names to cliclick's expected key names.
fn map_key_name(name: &str) -> &str {
    match name.to_lowercase().as_str() {
        "enter" | "return" => "return",
        "esc" | "escape" => "escape",
        "cmd" | "command" | "super" => "cmd",
        "ctrl" | "control" => "ctrl",
        "alt" | "option" | "opt" => "alt",
        "space" | " " => "space",
        "delete" | "backspace" => "delete",
        "up" => "arrow-up",
        "down" => "arrow-down",
        "left" => "arrow-left",
        "right" => "arrow-right",
        "pageup" | "page_up" => "page-up",
        "pagedown" | "page_down" => "page-down",
        // Single characters and already-correct names pass through.
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_codes() {
        assert_eq!(MacOsController::click_code(MouseButton::Left), "c");
        assert_eq!(MacOsController::click_code(MouseButton::Right), "rc");
        assert_eq!(MacOsController::click_code(MouseButton::Middle), "mc");
        assert_eq!(MacOsController::click_code(MouseButton::Double), "dc");
        assert_eq!(MacOsController::click_code(MouseButton::Triple), "tc");
    }

    #[test]
    fn parse_single_key() {
        assert_eq!(parse_key_combo("enter"), vec!["kp:return"]);
        assert_eq!(parse_key_combo("tab"), vec!["kp:tab"]);
        assert_eq!(parse_key_combo("escape"), vec!["kp:escape"]);
    }

    #[test]
    fn parse_key_with_modifier() {
        assert_eq!(parse_key_combo("cmd+c"), vec!["kd:cmd", "kp:c", "ku:cmd"]);
    }

    #[test]
    fn parse_key_with_multiple_modifiers() {
        assert_eq!(
            parse_key_combo("cmd+shift+t"),
            vec!["kd:cmd", "kd:shift", "kp:t", "ku:shift", "ku:cmd"]
        );
    }

    #[test]
    fn parse_arrow_keys() {
        assert_eq!(parse_key_combo("up"), vec!["kp:arrow-up"]);
        assert_eq!(
            parse_key_combo("cmd+left"),
            vec!["kd:cmd", "kp:arrow-left", "ku:cmd"]
        );
    }

    #[test]
    fn map_key_names() {
        assert_eq!(map_key_name("enter"), "return");
        assert_eq!(map_key_name("esc"), "escape");
        assert_eq!(map_key_name("command"), "cmd");
        assert_eq!(map_key_name("option"), "alt");
        assert_eq!(map_key_name("backspace"), "delete");
        assert_eq!(map_key_name("a"), "a");
    }

    #[test]
    fn parse_resolution_lines() {
        assert_eq!(
            parse_resolution_line("Resolution: 3024 x 1964 Retina"),
            Some((3024, 1964))
        );
        assert_eq!(
            parse_resolution_line("UI Looks like: 1512 x 982 @ 120.00Hz"),
            Some((1512, 982))
        );
        assert_eq!(parse_resolution_line("Chipset Model: Apple M3"), None);
    }

    #[test]
    fn parse_size_pairs() {
        assert_eq!(parse_size_pair("2880 1800"), Some((2880, 1800)));
        assert_eq!(parse_size_pair("0 1800"), None);
        assert_eq!(parse_size_pair("garbage"), None);
    }

    #[tokio::test]
    async fn run_cmd_reports_missing_program() {
        let err = run_cmd("definitely-not-a-real-binary", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Os { .. }));
    }
}
