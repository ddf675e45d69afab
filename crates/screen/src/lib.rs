//! Screen capture and action execution for Handsfree.
//!
//! `MacOsController` is the shipped `OsController` implementation, driving
//! cliclick, screencapture, sips, and osascript through `tokio::process`.
//! `Executor` sits above it: it validates target-space coordinates, converts
//! them to native pixels, and attaches fresh screenshots to outcomes.

pub mod controller;
pub mod executor;

pub use controller::MacOsController;
pub use executor::{CapturedFrame, ExecOutcome, Executor};
