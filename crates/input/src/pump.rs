//! Gesture event pump.
//!
//! Reads raw poses from a [`GestureSource`], debounces them, and publishes
//! control events onto the shared input channel. If the source fails or its
//! stream ends, a single `ClassifierDown` event is published and the pump
//! exits; voice keeps working.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use handsfree_core::event::{InputEvent, Modality};
use handsfree_core::gesture::GestureSource;

use crate::debounce::GestureDebouncer;

pub fn spawn_gesture_pump(
    mut source: impl GestureSource + 'static,
    mut debouncer: GestureDebouncer,
    events: mpsc::Sender<InputEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match source.next_pose().await {
                Ok(Some(pose)) => {
                    let Some(event) = debouncer.accept(pose, Instant::now()) else {
                        continue;
                    };
                    debug!(?pose, ?event, "Gesture accepted");
                    if events.send(InputEvent::Gesture(event)).await.is_err() {
                        // Consumer gone; shutting down.
                        return;
                    }
                }
                Ok(None) => {
                    info!("Gesture source ended");
                    let _ = events
                        .send(InputEvent::ClassifierDown {
                            modality: Modality::Gesture,
                            reason: "pose stream ended".into(),
                        })
                        .await;
                    return;
                }
                Err(e) => {
                    let _ = events
                        .send(InputEvent::ClassifierDown {
                            modality: Modality::Gesture,
                            reason: e.to_string(),
                        })
                        .await;
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;

    use handsfree_core::error::ClassifierError;
    use handsfree_core::gesture::{GestureEvent, GesturePose};

    struct ScriptedSource {
        script: VecDeque<Result<Option<GesturePose>, ClassifierError>>,
    }

    #[async_trait]
    impl GestureSource for ScriptedSource {
        async fn next_pose(&mut self) -> Result<Option<GesturePose>, ClassifierError> {
            self.script.pop_front().unwrap_or(Ok(None))
        }
    }

    fn scripted(
        script: Vec<Result<Option<GesturePose>, ClassifierError>>,
    ) -> ScriptedSource {
        ScriptedSource {
            script: script.into(),
        }
    }

    #[tokio::test]
    async fn poses_become_debounced_events() {
        let source = scripted(vec![
            Ok(Some(GesturePose::OpenPalm)),
            // Same hold, same instant bucket; suppressed by cooldown.
            Ok(Some(GesturePose::OpenPalm)),
            Ok(None),
        ]);
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_gesture_pump(source, GestureDebouncer::new(Duration::from_secs(2)), tx);

        assert_eq!(
            rx.recv().await,
            Some(InputEvent::Gesture(GestureEvent::StartListening))
        );
        match rx.recv().await {
            Some(InputEvent::ClassifierDown { modality, .. }) => {
                assert_eq!(modality, Modality::Gesture)
            }
            other => panic!("Expected ClassifierDown, got {other:?}"),
        }
        assert_eq!(rx.recv().await, None);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn source_error_degrades_to_classifier_down() {
        let source = scripted(vec![Err(ClassifierError::Terminated(
            "helper crashed".into(),
        ))]);
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_gesture_pump(source, GestureDebouncer::new(Duration::from_secs(2)), tx);

        match rx.recv().await {
            Some(InputEvent::ClassifierDown { modality, reason }) => {
                assert_eq!(modality, Modality::Gesture);
                assert!(reason.contains("helper crashed"));
            }
            other => panic!("Expected ClassifierDown, got {other:?}"),
        }
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn zero_cooldown_passes_every_pose() {
        let source = scripted(vec![
            Ok(Some(GesturePose::OpenPalm)),
            Ok(Some(GesturePose::ClosedFist)),
            Ok(Some(GesturePose::Victory)),
            Ok(None),
        ]);
        let (tx, mut rx) = mpsc::channel(8);
        spawn_gesture_pump(source, GestureDebouncer::new(Duration::ZERO), tx);

        assert_eq!(
            rx.recv().await,
            Some(InputEvent::Gesture(GestureEvent::StartListening))
        );
        assert_eq!(
            rx.recv().await,
            Some(InputEvent::Gesture(GestureEvent::StopListening))
        );
        assert_eq!(
            rx.recv().await,
            Some(InputEvent::Gesture(GestureEvent::ResetHistory))
        );
    }
}
