//! Line-protocol bridge to the external hand-pose classifier.
//!
//! The classifier is a separate process (the camera and pose model live
//! there); it prints one pose name per line on stdout. This module spawns
//! it and adapts the line stream to [`GestureSource`].

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use handsfree_core::error::ClassifierError;
use handsfree_core::gesture::{GesturePose, GestureSource};

pub struct HelperGestureSource {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl HelperGestureSource {
    /// Spawn the helper command (`argv[0]` plus arguments) with stdout piped.
    pub fn spawn(command: &[String]) -> Result<Self, ClassifierError> {
        let (program, args) = command.split_first().ok_or_else(|| {
            ClassifierError::Unavailable {
                modality: "gesture".into(),
                reason: "empty helper command".into(),
            }
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdout(std::process::Stdio::piped())
            .stdin(std::process::Stdio::null())
            .spawn()
            .map_err(|e| ClassifierError::Unavailable {
                modality: "gesture".into(),
                reason: format!("failed to start {program}: {e}"),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            ClassifierError::Unavailable {
                modality: "gesture".into(),
                reason: "helper stdout not captured".into(),
            }
        })?;

        info!(helper = %program, "Gesture helper started");
        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl GestureSource for HelperGestureSource {
    async fn next_pose(&mut self) -> Result<Option<GesturePose>, ClassifierError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| ClassifierError::Terminated(format!("helper read error: {e}")))?;

            let Some(line) = line else {
                // Clean EOF; collect the exit status so the child is reaped.
                let status = self.child.wait().await.ok();
                info!(?status, "Gesture helper stream ended");
                return Ok(None);
            };

            match parse_pose(&line) {
                Some(pose) => return Ok(Some(pose)),
                None => {
                    // Helpers also log diagnostics to stdout; skip anything
                    // that is not a pose name.
                    debug!(line = %line.trim(), "Skipping non-pose helper line");
                }
            }
        }
    }
}

impl Drop for HelperGestureSource {
    fn drop(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "Failed to kill gesture helper");
        }
    }
}

/// Parse one helper output line. `none` means "hand visible, no pose" and is
/// skipped like any other non-pose line.
fn parse_pose(line: &str) -> Option<GesturePose> {
    match line.trim().to_lowercase().as_str() {
        "open_palm" => Some(GesturePose::OpenPalm),
        "closed_fist" => Some(GesturePose::ClosedFist),
        "victory" => Some(GesturePose::Victory),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pose_names() {
        assert_eq!(parse_pose("open_palm"), Some(GesturePose::OpenPalm));
        assert_eq!(parse_pose("closed_fist"), Some(GesturePose::ClosedFist));
        assert_eq!(parse_pose("victory"), Some(GesturePose::Victory));
    }

    #[test]
    fn tolerates_whitespace_and_case() {
        assert_eq!(parse_pose("  OPEN_PALM \n"), Some(GesturePose::OpenPalm));
        assert_eq!(parse_pose("Victory"), Some(GesturePose::Victory));
    }

    #[test]
    fn skips_unknown_lines() {
        assert_eq!(parse_pose("none"), None);
        assert_eq!(parse_pose("INFO: camera ready"), None);
        assert_eq!(parse_pose(""), None);
    }

    #[test]
    fn empty_command_rejected() {
        let err = HelperGestureSource::spawn(&[]).err().expect("must fail");
        match err {
            ClassifierError::Unavailable { modality, .. } => assert_eq!(modality, "gesture"),
            other => panic!("Expected Unavailable, got {other:?}"),
        }
    }
}
