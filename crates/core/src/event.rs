//! Input event vocabulary.
//!
//! Voice and gesture producers both publish onto one mpsc channel using these
//! types; the listening state machine is the single consumer. A classifier
//! crashing degrades its modality (a `ClassifierDown` event) rather than
//! taking the whole pipeline down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gesture::GestureEvent;

/// Which input modality an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Voice,
    Gesture,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Voice => write!(f, "voice"),
            Modality::Gesture => write!(f, "gesture"),
        }
    }
}

/// Events flowing from the input producers to the listening state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// The wake phrase was heard while idle.
    WakeDetected,
    /// Incremental transcript text during capture.
    Transcript(String),
    /// Capture ended (silence timeout or explicit stop).
    EndOfUtterance,
    /// A debounced gesture event.
    Gesture(GestureEvent),
    /// A classifier process died or its dependency is missing.
    ClassifierDown { modality: Modality, reason: String },
}

/// A finalized voice command, produced once per Listening → Processing
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Cleaned transcript text, guaranteed non-empty.
    pub text: String,

    /// When capture finished.
    pub captured_at: DateTime<Utc>,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            captured_at: Utc::now(),
        }
    }
}
