//! Hand-gesture domain types and the classifier seam.
//!
//! The pose classifier itself is a black box (an external helper process in
//! the shipped implementation); this module only defines its output
//! vocabulary and the trait the event pump consumes poses through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// A raw hand pose as reported by the classifier, one reading per frame.
///
/// A held pose produces a stream of identical readings; the debouncer in the
/// input crate collapses those into a single [`GestureEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePose {
    /// All five fingers extended.
    OpenPalm,
    /// All fingers curled.
    ClosedFist,
    /// Index and middle extended, others curled.
    Victory,
}

/// A debounced, one-shot control event derived from a pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureEvent {
    /// Open palm: begin capturing a voice command.
    StartListening,
    /// Closed fist: stop capturing and process what was heard.
    StopListening,
    /// Victory sign: clear history and cancel any in-flight run.
    ResetHistory,
}

impl GestureEvent {
    /// The control event a pose maps to.
    pub fn from_pose(pose: GesturePose) -> Self {
        match pose {
            GesturePose::OpenPalm => GestureEvent::StartListening,
            GesturePose::ClosedFist => GestureEvent::StopListening,
            GesturePose::Victory => GestureEvent::ResetHistory,
        }
    }
}

/// A stream of classified hand poses.
///
/// `next_pose` resolves with `None` when the underlying classifier stream
/// ends cleanly; hard failures surface as `ClassifierError` and degrade the
/// gesture modality only.
#[async_trait]
pub trait GestureSource: Send + Sync {
    async fn next_pose(&mut self) -> Result<Option<GesturePose>, ClassifierError>;
}
