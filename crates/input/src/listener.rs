//! The listening state machine.
//!
//! Exactly one of three states at any time:
//! - `Idle` — waiting for the wake phrase or the start gesture
//! - `Listening` — capturing a voice command
//! - `Processing` — a command is running; input is ignored except reset
//!
//! Both modalities feed the same `handle` entry point, so "wake word or
//! start gesture, whichever lands first" needs no special casing: the
//! first event transitions, the duplicate is ignored.

use tracing::{info, warn};

use handsfree_core::event::{Command, InputEvent};
use handsfree_core::gesture::GestureEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Idle,
    Listening,
    Processing,
}

/// What the orchestrator should do in response to an input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Start capturing audio and announce "Listening".
    BeginCapture,
    /// Capture finished with a usable command; run the agent.
    EmitCommand(Command),
    /// Capture finished but nothing intelligible was heard.
    DiscardEmpty,
    /// Clear history and cancel any in-flight run.
    ResetRequested,
    /// No state change.
    Ignored,
}

/// Pure transition core — owns the state and the accumulating transcript,
/// performs no I/O.
pub struct ListenerStateMachine {
    state: ListeningState,
    transcript: String,
}

impl ListenerStateMachine {
    pub fn new() -> Self {
        Self {
            state: ListeningState::Idle,
            transcript: String::new(),
        }
    }

    pub fn state(&self) -> ListeningState {
        self.state
    }

    /// Feed one input event and get the resulting transition.
    pub fn handle(&mut self, event: InputEvent) -> Transition {
        match event {
            InputEvent::WakeDetected | InputEvent::Gesture(GestureEvent::StartListening) => {
                match self.state {
                    ListeningState::Idle => {
                        info!("Capture started");
                        self.state = ListeningState::Listening;
                        self.transcript.clear();
                        Transition::BeginCapture
                    }
                    // Duplicate start edge (wake word *and* open palm) is
                    // idempotent; Processing ignores new commands entirely.
                    _ => Transition::Ignored,
                }
            }

            InputEvent::Transcript(text) => {
                if self.state == ListeningState::Listening {
                    if !self.transcript.is_empty() {
                        self.transcript.push(' ');
                    }
                    self.transcript.push_str(&text);
                }
                Transition::Ignored
            }

            InputEvent::EndOfUtterance | InputEvent::Gesture(GestureEvent::StopListening) => {
                if self.state != ListeningState::Listening {
                    return Transition::Ignored;
                }
                let text = clean_transcript(&self.transcript);
                self.transcript.clear();
                if text.is_empty() {
                    info!("Empty capture discarded");
                    self.state = ListeningState::Idle;
                    Transition::DiscardEmpty
                } else {
                    info!(command = %text, "Command captured");
                    self.state = ListeningState::Processing;
                    Transition::EmitCommand(Command::new(text))
                }
            }

            InputEvent::Gesture(GestureEvent::ResetHistory) => {
                info!(state = ?self.state, "Reset requested");
                self.state = ListeningState::Idle;
                self.transcript.clear();
                Transition::ResetRequested
            }

            InputEvent::ClassifierDown { modality, reason } => {
                // One modality degrading must not take the machine down.
                warn!(%modality, %reason, "Input classifier unavailable");
                Transition::Ignored
            }
        }
    }

    /// Called by the orchestrator when a run ends (success or failure).
    pub fn run_finished(&mut self) {
        if self.state == ListeningState::Processing {
            self.state = ListeningState::Idle;
        }
    }
}

impl Default for ListenerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a raw transcript.
///
/// The microphone regularly picks up the spoken "Listening" prompt at the
/// start of the capture window; drop that echo plus any leading punctuation
/// before judging emptiness.
pub fn clean_transcript(raw: &str) -> String {
    let mut s = raw.trim();
    if s.to_lowercase().starts_with("listening") {
        s = s["listening".len()..].trim_start();
    }
    s.trim_start_matches(|c: char| ".,!?-".contains(c) || c.is_whitespace())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use handsfree_core::event::Modality;

    fn machine() -> ListenerStateMachine {
        ListenerStateMachine::new()
    }

    #[test]
    fn wake_word_begins_capture() {
        let mut m = machine();
        assert_eq!(m.handle(InputEvent::WakeDetected), Transition::BeginCapture);
        assert_eq!(m.state(), ListeningState::Listening);
    }

    #[test]
    fn start_gesture_begins_capture() {
        let mut m = machine();
        assert_eq!(
            m.handle(InputEvent::Gesture(GestureEvent::StartListening)),
            Transition::BeginCapture
        );
        assert_eq!(m.state(), ListeningState::Listening);
    }

    #[test]
    fn duplicate_start_edge_is_idempotent() {
        let mut m = machine();
        m.handle(InputEvent::WakeDetected);
        // The other modality lands a moment later.
        assert_eq!(
            m.handle(InputEvent::Gesture(GestureEvent::StartListening)),
            Transition::Ignored
        );
        assert_eq!(m.state(), ListeningState::Listening);
    }

    #[test]
    fn stop_with_transcript_emits_command() {
        let mut m = machine();
        m.handle(InputEvent::WakeDetected);
        m.handle(InputEvent::Transcript("open safari".into()));
        match m.handle(InputEvent::Gesture(GestureEvent::StopListening)) {
            Transition::EmitCommand(cmd) => assert_eq!(cmd.text, "open safari"),
            other => panic!("Expected EmitCommand, got {other:?}"),
        }
        assert_eq!(m.state(), ListeningState::Processing);
    }

    #[test]
    fn end_of_utterance_emits_command() {
        let mut m = machine();
        m.handle(InputEvent::WakeDetected);
        m.handle(InputEvent::Transcript("check my email".into()));
        match m.handle(InputEvent::EndOfUtterance) {
            Transition::EmitCommand(cmd) => assert_eq!(cmd.text, "check my email"),
            other => panic!("Expected EmitCommand, got {other:?}"),
        }
    }

    #[test]
    fn empty_transcript_returns_to_idle() {
        let mut m = machine();
        m.handle(InputEvent::WakeDetected);
        assert_eq!(m.handle(InputEvent::EndOfUtterance), Transition::DiscardEmpty);
        assert_eq!(m.state(), ListeningState::Idle);
    }

    #[test]
    fn whitespace_only_transcript_discarded() {
        let mut m = machine();
        m.handle(InputEvent::WakeDetected);
        m.handle(InputEvent::Transcript("   ".into()));
        assert_eq!(m.handle(InputEvent::EndOfUtterance), Transition::DiscardEmpty);
        assert_eq!(m.state(), ListeningState::Idle);
    }

    #[test]
    fn processing_ignores_everything_but_reset() {
        let mut m = machine();
        m.handle(InputEvent::WakeDetected);
        m.handle(InputEvent::Transcript("open safari".into()));
        m.handle(InputEvent::EndOfUtterance);
        assert_eq!(m.state(), ListeningState::Processing);

        assert_eq!(m.handle(InputEvent::WakeDetected), Transition::Ignored);
        assert_eq!(
            m.handle(InputEvent::Gesture(GestureEvent::StartListening)),
            Transition::Ignored
        );
        assert_eq!(
            m.handle(InputEvent::Gesture(GestureEvent::StopListening)),
            Transition::Ignored
        );
        assert_eq!(m.state(), ListeningState::Processing);
    }

    #[test]
    fn reset_works_from_every_state() {
        for setup in 0..3 {
            let mut m = machine();
            if setup >= 1 {
                m.handle(InputEvent::WakeDetected);
            }
            if setup == 2 {
                m.handle(InputEvent::Transcript("open safari".into()));
                m.handle(InputEvent::EndOfUtterance);
            }
            assert_eq!(
                m.handle(InputEvent::Gesture(GestureEvent::ResetHistory)),
                Transition::ResetRequested
            );
            assert_eq!(m.state(), ListeningState::Idle);
        }
    }

    #[test]
    fn run_finished_returns_to_idle() {
        let mut m = machine();
        m.handle(InputEvent::WakeDetected);
        m.handle(InputEvent::Transcript("open safari".into()));
        m.handle(InputEvent::EndOfUtterance);
        m.run_finished();
        assert_eq!(m.state(), ListeningState::Idle);
    }

    #[test]
    fn classifier_down_keeps_machine_operable() {
        let mut m = machine();
        assert_eq!(
            m.handle(InputEvent::ClassifierDown {
                modality: Modality::Gesture,
                reason: "helper exited".into(),
            }),
            Transition::Ignored
        );
        // Voice still drives the machine.
        assert_eq!(m.handle(InputEvent::WakeDetected), Transition::BeginCapture);
    }

    #[test]
    fn transcript_cleanup_strips_prompt_echo() {
        assert_eq!(clean_transcript("Listening. open safari"), "open safari");
        assert_eq!(clean_transcript("listening"), "");
        assert_eq!(clean_transcript(", open safari"), "open safari");
        assert_eq!(clean_transcript("  open safari  "), "open safari");
        assert_eq!(clean_transcript(""), "");
    }

    #[test]
    fn multiple_transcript_chunks_accumulate() {
        let mut m = machine();
        m.handle(InputEvent::WakeDetected);
        m.handle(InputEvent::Transcript("open".into()));
        m.handle(InputEvent::Transcript("safari".into()));
        match m.handle(InputEvent::EndOfUtterance) {
            Transition::EmitCommand(cmd) => assert_eq!(cmd.text, "open safari"),
            other => panic!("Expected EmitCommand, got {other:?}"),
        }
    }
}
