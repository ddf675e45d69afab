//! Speech seams — wake-word detection, utterance capture, and spoken output.
//!
//! Speech recognition is a black box behind these traits. The shipped
//! implementations shell out to sox and whisper-cli (capture) and `say` /
//! edge-tts (output); tests substitute scripted fakes.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::ClassifierError;

/// Blocks until the wake phrase is heard.
#[async_trait]
pub trait WakeWordDetector: Send + Sync {
    /// Resolve once when the wake phrase is detected. Called again for the
    /// next detection; implementations own their own audio loop.
    async fn wait_for_wake(&self) -> Result<(), ClassifierError>;
}

/// Records one utterance from the microphone and transcribes it.
#[async_trait]
pub trait UtteranceCapture: Send + Sync {
    /// Record until `stop` fires or the implementation's silence timeout
    /// elapses, then return the raw transcript. An empty string means
    /// nothing intelligible was heard.
    async fn capture(&self, stop: oneshot::Receiver<()>) -> Result<String, ClassifierError>;
}

/// Speaks status lines and model replies out loud.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Speak the given text, returning once playback finishes.
    async fn speak(&self, text: &str) -> Result<(), ClassifierError>;

    /// Cut off any in-progress playback. Default: no-op.
    async fn stop(&self) -> Result<(), ClassifierError> {
        Ok(())
    }
}
