//! The Handsfree agent loop.
//!
//! A captured voice command drives a capture-invoke-execute cycle: screenshot
//! the screen, send the history to the model, execute whatever actions it
//! proposes, feed the results (with fresh screenshots) back, repeat until the
//! model answers in plain text or a limit is hit. Cancellation and history
//! reset can interrupt the cycle between actions.

pub mod cancel;
pub mod fast_path;
pub mod history;
pub mod loop_runner;

pub use cancel::CancelFlag;
pub use fast_path::try_fast_path;
pub use history::{Generation, HistoryStore};
pub use loop_runner::{AgentLoop, RunOutcome};
