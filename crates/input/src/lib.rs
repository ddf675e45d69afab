//! Voice and hand-gesture input pipeline for Handsfree.
//!
//! Two producers — a microphone pipeline and an external hand-pose
//! classifier — feed one event channel consumed by the listening state
//! machine. Either modality can die without taking the other down.

pub mod debounce;
pub mod gesture;
pub mod listener;
pub mod pump;
pub mod tts;
pub mod voice;

pub use debounce::GestureDebouncer;
pub use gesture::HelperGestureSource;
pub use listener::{ListenerStateMachine, ListeningState, Transition};
pub use pump::spawn_gesture_pump;
pub use tts::{build_tts, sanitize_for_speech};
pub use voice::CommandVoice;
