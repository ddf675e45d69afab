//! Subprocess-backed voice pipeline.
//!
//! Speech recognition stays a black box: audio is captured with sox's `rec`
//! (which ends the recording on sustained silence) and transcribed with
//! `whisper-cli` against a local model file. Wake-word detection reuses the
//! same machinery over short capture windows, substring-matching the
//! configured phrase.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use handsfree_config::VoiceConfig;
use handsfree_core::error::ClassifierError;
use handsfree_core::speech::{UtteranceCapture, WakeWordDetector};

/// Wake-word scans listen in short windows.
const WAKE_WINDOW_SECS: u32 = 3;
/// Transcription must not wedge the pipeline.
const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct CommandVoice {
    whisper_model: PathBuf,
    wake_phrase: String,
    silence_timeout_secs: f32,
    max_capture_secs: u32,
}

impl CommandVoice {
    pub fn from_config(cfg: &VoiceConfig) -> Self {
        Self {
            whisper_model: expand_home(&cfg.whisper_model),
            wake_phrase: cfg.wake_phrase.clone(),
            silence_timeout_secs: cfg.silence_timeout_secs,
            max_capture_secs: cfg.max_capture_secs,
        }
    }

    fn temp_wav(&self) -> PathBuf {
        let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        PathBuf::from(format!("/tmp/handsfree_audio_{ts}.wav"))
    }

    /// Record into `path` until silence, the duration cap, or `stop`.
    async fn record(
        &self,
        path: &Path,
        max_secs: u32,
        stop: Option<oneshot::Receiver<()>>,
    ) -> Result<(), ClassifierError> {
        let silence = format!("{:.1}", self.silence_timeout_secs);
        let mut child = tokio::process::Command::new("rec")
            .args([
                "-q",
                path.to_str().unwrap_or_default(),
                "rate",
                "16k",
                "trim",
                "0",
                &max_secs.to_string(),
                "silence",
                "1",
                "0.1",
                "3%",
                "1",
                &silence,
                "3%",
            ])
            // The task owning this capture can be aborted (wake scans are);
            // the recorder must not outlive it and hold the microphone.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClassifierError::Unavailable {
                modality: "voice".into(),
                reason: format!("failed to start sox `rec`: {e}"),
            })?;

        match stop {
            Some(stop) => {
                tokio::select! {
                    _ = stop => {
                        // Stop gesture: end the recording and keep what we have.
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                    }
                    status = child.wait() => {
                        if let Err(e) = status {
                            return Err(ClassifierError::CaptureFailed(e.to_string()));
                        }
                    }
                }
            }
            None => {
                child
                    .wait()
                    .await
                    .map_err(|e| ClassifierError::CaptureFailed(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Transcribe a WAV file with whisper-cli.
    async fn transcribe(&self, wav: &Path) -> Result<String, ClassifierError> {
        let model = self.whisper_model.to_str().unwrap_or_default().to_string();
        let file = wav.to_str().unwrap_or_default().to_string();

        let output = tokio::time::timeout(
            TRANSCRIBE_TIMEOUT,
            tokio::process::Command::new("whisper-cli")
                .args(["-m", &model, "-f", &file, "-np", "-nt"])
                .output(),
        )
        .await
        .map_err(|_| ClassifierError::Terminated("whisper-cli timed out".into()))?
        .map_err(|e| ClassifierError::Unavailable {
            modality: "voice".into(),
            reason: format!("failed to start whisper-cli: {e}"),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifierError::Decode(format!(
                "whisper-cli failed: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn capture_and_transcribe(
        &self,
        max_secs: u32,
        stop: Option<oneshot::Receiver<()>>,
    ) -> Result<String, ClassifierError> {
        let path = self.temp_wav();
        let recorded = self.record(&path, max_secs, stop).await;
        if let Err(e) = recorded {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        let transcript = self.transcribe(&path).await;
        let _ = tokio::fs::remove_file(&path).await;
        transcript
    }
}

#[async_trait]
impl WakeWordDetector for CommandVoice {
    async fn wait_for_wake(&self) -> Result<(), ClassifierError> {
        loop {
            let transcript = self.capture_and_transcribe(WAKE_WINDOW_SECS, None).await?;
            if transcript.is_empty() {
                continue;
            }
            debug!(heard = %transcript, "Wake scan");
            if matches_wake(&transcript, &self.wake_phrase) {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl UtteranceCapture for CommandVoice {
    async fn capture(&self, stop: oneshot::Receiver<()>) -> Result<String, ClassifierError> {
        let transcript = self
            .capture_and_transcribe(self.max_capture_secs, Some(stop))
            .await?;
        if transcript.is_empty() {
            warn!("Capture produced no transcript");
        }
        Ok(transcript)
    }
}

/// Case- and punctuation-insensitive wake-phrase match.
///
/// Whisper renders "hey computer" as anything from "Hey, computer!" to
/// "hey computer.", so compare squashed alphanumeric forms.
fn matches_wake(transcript: &str, phrase: &str) -> bool {
    let squash = |s: &str| {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase()
    };
    let needle = squash(phrase);
    !needle.is_empty() && squash(transcript).contains(&needle)
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_matching_ignores_case_and_punctuation() {
        assert!(matches_wake("Hey, computer!", "hey computer"));
        assert!(matches_wake("um hey computer please", "hey computer"));
        assert!(matches_wake("HEY COMPUTER.", "hey computer"));
        assert!(!matches_wake("hey there", "hey computer"));
        assert!(!matches_wake("", "hey computer"));
    }

    #[test]
    fn empty_phrase_never_matches() {
        assert!(!matches_wake("anything", ""));
    }

    #[test]
    fn home_expansion() {
        let expanded = expand_home("~/models/ggml-base.en.bin");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
