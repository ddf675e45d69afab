//! Spoken feedback.
//!
//! Two engines: macOS `say` (zero-install) and `edge-tts` (nicer voices,
//! rendered to a temp file and played with `afplay`). Model replies arrive
//! as markdown, which sounds terrible read verbatim, so everything passes
//! through the sanitizer first.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use handsfree_config::VoiceConfig;
use handsfree_core::error::ClassifierError;
use handsfree_core::speech::TextToSpeech;

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("static regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]*`").expect("static regex"));
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("static regex"));
static SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_#~<>|\[\]{}]").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Strip markup that should not be read aloud.
pub fn sanitize_for_speech(text: &str) -> String {
    let text = CODE_BLOCK.replace_all(text, " ");
    let text = INLINE_CODE.replace_all(&text, " ");
    let text = MARKDOWN_LINK.replace_all(&text, "$1");
    let text = SPECIAL_CHARS.replace_all(&text, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Build the configured speech engine.
pub fn build_tts(cfg: &VoiceConfig) -> Arc<dyn TextToSpeech> {
    if !cfg.speak_feedback {
        return Arc::new(SilentTts);
    }
    match cfg.tts_engine.as_str() {
        "edge" => Arc::new(EdgeTts {
            voice: cfg.tts_voice.clone(),
        }),
        _ => Arc::new(SayTts {
            voice: cfg.tts_voice.clone(),
        }),
    }
}

/// macOS built-in `say`.
pub struct SayTts {
    voice: String,
}

#[async_trait]
impl TextToSpeech for SayTts {
    async fn speak(&self, text: &str) -> Result<(), ClassifierError> {
        let clean = sanitize_for_speech(text);
        if clean.is_empty() {
            return Ok(());
        }
        debug!(chars = clean.len(), "Speaking via say");
        let status = tokio::process::Command::new("say")
            .args(["-v", &self.voice, &clean])
            .status()
            .await
            .map_err(|e| ClassifierError::Unavailable {
                modality: "voice".into(),
                reason: format!("failed to start say: {e}"),
            })?;
        if !status.success() {
            warn!(voice = %self.voice, "say exited with failure");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ClassifierError> {
        let _ = tokio::process::Command::new("killall")
            .args(["say"])
            .status()
            .await;
        Ok(())
    }
}

/// edge-tts rendered to a temp file, played with afplay.
pub struct EdgeTts {
    voice: String,
}

#[async_trait]
impl TextToSpeech for EdgeTts {
    async fn speak(&self, text: &str) -> Result<(), ClassifierError> {
        let clean = sanitize_for_speech(text);
        if clean.is_empty() {
            return Ok(());
        }

        let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let path = format!("/tmp/handsfree_tts_{ts}.mp3");

        let render = tokio::time::timeout(
            Duration::from_secs(30),
            tokio::process::Command::new("edge-tts")
                .args(["--voice", &self.voice, "--text", &clean, "--write-media", &path])
                .status(),
        )
        .await;

        match render {
            Ok(Ok(status)) if status.success() => {
                let _ = tokio::process::Command::new("afplay").arg(&path).status().await;
                let _ = tokio::fs::remove_file(&path).await;
                Ok(())
            }
            other => {
                let _ = tokio::fs::remove_file(&path).await;
                warn!(?other, "edge-tts failed, dropping spoken feedback");
                Ok(())
            }
        }
    }

    async fn stop(&self) -> Result<(), ClassifierError> {
        let _ = tokio::process::Command::new("killall")
            .args(["afplay"])
            .status()
            .await;
        Ok(())
    }
}

/// Used when spoken feedback is disabled.
pub struct SilentTts;

#[async_trait]
impl TextToSpeech for SilentTts {
    async fn speak(&self, _text: &str) -> Result<(), ClassifierError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_blocks() {
        let input = "Run this:\n```bash\nls -la\n```\nand you're done.";
        assert_eq!(sanitize_for_speech(input), "Run this: and you're done.");
    }

    #[test]
    fn unwraps_markdown_links() {
        assert_eq!(
            sanitize_for_speech("See [the docs](https://example.com) for more."),
            "See the docs for more."
        );
    }

    #[test]
    fn strips_special_characters() {
        assert_eq!(
            sanitize_for_speech("**Done!** Opened _Safari_ #finally"),
            "Done! Opened Safari finally"
        );
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(sanitize_for_speech("a   b\n\n\nc"), "a b c");
    }

    #[test]
    fn inline_code_removed() {
        assert_eq!(
            sanitize_for_speech("Type `cmd+q` to quit."),
            "Type to quit."
        );
    }

    #[test]
    fn silent_engine_when_feedback_disabled() {
        let cfg = VoiceConfig {
            speak_feedback: false,
            ..Default::default()
        };
        // Just verify construction takes the silent path without panicking.
        let _ = build_tts(&cfg);
    }
}
