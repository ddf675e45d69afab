//! # Handsfree Core
//!
//! Domain types, traits, and error definitions for the Handsfree agent — a
//! voice- and gesture-driven computer-use runtime for macOS.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod action;
pub mod error;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod os;
pub mod provider;
pub mod speech;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use action::{Action, MouseButton};
pub use error::{ClassifierError, Error, ExecutorError, ProviderError, Result};
pub use event::{Command, InputEvent, Modality};
pub use geometry::DisplayGeometry;
pub use gesture::{GestureEvent, GesturePose, GestureSource};
pub use os::OsController;
pub use provider::{InvokeRequest, ModelReply, Provider, Usage};
pub use speech::{TextToSpeech, UtteranceCapture, WakeWordDetector};
pub use turn::{ImagePayload, Role, ToolUse, Turn};
