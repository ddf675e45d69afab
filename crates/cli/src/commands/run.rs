//! `handsfree run` — the live voice + gesture listener.
//!
//! Wiring: the gesture pump and the voice tasks publish onto one event
//! channel; the listening state machine decides what each event means; this
//! loop acts on the transitions (spawning captures, launching agent runs,
//! speaking feedback). Exactly one voice task holds the microphone at a
//! time — a wake scanner while idle, a command capture while listening.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use handsfree_agent::{AgentLoop, CancelFlag, HistoryStore, RunOutcome, try_fast_path};
use handsfree_config::AppConfig;
use handsfree_core::event::{Command, InputEvent, Modality};
use handsfree_core::gesture::GestureEvent;
use handsfree_core::geometry::DisplayGeometry;
use handsfree_core::speech::{UtteranceCapture, WakeWordDetector};
use handsfree_input::{
    CommandVoice, GestureDebouncer, HelperGestureSource, ListenerStateMachine, ListeningState,
    Transition, build_tts, spawn_gesture_pump,
};
use handsfree_providers::build_from_config;
use handsfree_screen::Executor;
use handsfree_screen::controller::{MacOsController, check_cliclick, probe_native_size};

/// Everything `run` and `exec` share: config, display geometry, executor,
/// and a ready agent loop.
pub(crate) struct Runtime {
    pub config: AppConfig,
    pub agent: Arc<AgentLoop>,
    pub history: Arc<HistoryStore>,
    pub cancel: CancelFlag,
    pub command_timeout: Duration,
}

impl Runtime {
    pub async fn bootstrap() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load()?;
        config.validate()?;

        let provider = build_from_config(&config)?;
        let command_timeout = Duration::from_secs(config.executor.command_timeout_secs);

        check_cliclick(command_timeout).await?;
        let (native_w, native_h) = probe_native_size(command_timeout).await?;
        let geometry = match config.executor.target_override() {
            Some((tw, th)) => DisplayGeometry::with_target(native_w, native_h, tw, th),
            None => DisplayGeometry::select(native_w, native_h),
        };
        info!(
            native_width = native_w,
            native_height = native_h,
            target_width = geometry.target_width,
            target_height = geometry.target_height,
            "Display geometry selected"
        );

        let controller = Arc::new(MacOsController::new(command_timeout));
        let executor = Arc::new(Executor::new(
            controller,
            geometry,
            Duration::from_millis(config.executor.settle_delay_ms),
        ));

        let mut agent = AgentLoop::new(provider, executor, &config.model)
            .with_max_tokens(config.max_tokens)
            .with_max_iterations(config.agent.max_iterations)
            .with_retry(
                config.agent.max_attempts,
                Duration::from_millis(config.agent.initial_backoff_ms),
            )
            .with_image_retention(config.agent.image_retention);
        if let Some(prompt) = &config.agent.system_prompt_override {
            agent = agent.with_system_prompt(prompt.clone());
        }

        Ok(Self {
            config,
            agent: Arc::new(agent),
            history: Arc::new(HistoryStore::new()),
            cancel: CancelFlag::new(),
            command_timeout,
        })
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::bootstrap().await?;
    let voice = Arc::new(CommandVoice::from_config(&rt.config.voice));
    let tts = build_tts(&rt.config.voice);

    let (events_tx, mut events_rx) = mpsc::channel::<InputEvent>(32);

    if rt.config.gesture.enabled {
        match HelperGestureSource::spawn(&rt.config.gesture.helper_command) {
            Ok(source) => {
                spawn_gesture_pump(
                    source,
                    GestureDebouncer::new(Duration::from_millis(rt.config.gesture.cooldown_ms)),
                    events_tx.clone(),
                );
            }
            Err(e) => warn!(error = %e, "Gesture helper unavailable; running voice-only"),
        }
    }

    println!(
        "🎙️  Say \"{}\" or show an open palm to start. Ctrl-C to quit.",
        rt.config.voice.wake_phrase
    );

    let mut machine = ListenerStateMachine::new();
    let mut wake_task: Option<JoinHandle<()>> = None;
    let mut capture_stop: Option<oneshot::Sender<()>> = None;
    let mut run_task: Option<JoinHandle<()>> = None;
    // Finished runs report their spoken line here.
    let (done_tx, mut done_rx) = mpsc::channel::<String>(4);

    loop {
        // The wake scanner runs whenever the microphone is free.
        if machine.state() != ListeningState::Listening
            && wake_task.as_ref().is_none_or(|t| t.is_finished())
        {
            wake_task = Some(spawn_wake(voice.clone(), events_tx.clone()));
        }

        tokio::select! {
            maybe_event = events_rx.recv() => {
                let Some(event) = maybe_event else { break };
                match event {
                    // A stop gesture while capturing ends the recording early;
                    // the capture task finalizes through EndOfUtterance with
                    // whatever was heard.
                    InputEvent::Gesture(GestureEvent::StopListening)
                        if machine.state() == ListeningState::Listening
                            && capture_stop.is_some() =>
                    {
                        if let Some(stop) = capture_stop.take() {
                            let _ = stop.send(());
                        }
                    }

                    // The wake word mid-run is an interrupt.
                    InputEvent::WakeDetected if run_task.is_some() => {
                        info!("Wake word during a run; cancelling");
                        rt.cancel.cancel();
                        let _ = tts.stop().await;
                    }

                    event => match machine.handle(event) {
                        Transition::BeginCapture => {
                            if let Some(task) = wake_task.take() {
                                task.abort();
                            }
                            let _ = tts.speak("Listening").await;
                            let (stop_tx, stop_rx) = oneshot::channel();
                            capture_stop = Some(stop_tx);
                            spawn_capture(voice.clone(), stop_rx, events_tx.clone());
                        }

                        Transition::EmitCommand(command) => {
                            capture_stop = None;
                            println!("🗣️  \"{}\"", command.text);

                            if rt.config.agent.local_fast_path {
                                if let Some(note) =
                                    try_fast_path(&command.text, rt.command_timeout).await
                                {
                                    println!("✅ {note}");
                                    let _ = tts.speak(&note).await;
                                    machine.run_finished();
                                    continue;
                                }
                            }

                            let _ = tts.speak("Processing").await;
                            rt.cancel.clear();
                            run_task = Some(spawn_run(
                                rt.agent.clone(),
                                rt.history.clone(),
                                rt.cancel.clone(),
                                command,
                                done_tx.clone(),
                            ));
                        }

                        Transition::DiscardEmpty => {
                            capture_stop = None;
                            let _ = tts.speak("I didn't catch that").await;
                        }

                        Transition::ResetRequested => {
                            rt.cancel.cancel();
                            rt.history.reset();
                            if let Some(stop) = capture_stop.take() {
                                let _ = stop.send(());
                            }
                            let _ = tts.stop().await;
                            println!("🔄 History cleared");
                            let _ = tts.speak("Reset").await;
                            if run_task.is_none() {
                                rt.cancel.clear();
                            }
                        }

                        Transition::Ignored => {}
                    },
                }
            }

            maybe_message = done_rx.recv() => {
                let Some(message) = maybe_message else { break };
                run_task = None;
                machine.run_finished();
                rt.cancel.clear();
                println!("💬 {message}");
                let _ = tts.speak(&message).await;
            }

            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 Shutting down");
                break;
            }
        }
    }

    if let Some(task) = wake_task.take() {
        task.abort();
    }
    if let Some(task) = run_task.take() {
        task.abort();
    }

    Ok(())
}

/// Listen for the wake phrase and publish a single event.
fn spawn_wake(voice: Arc<CommandVoice>, events: mpsc::Sender<InputEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match voice.wait_for_wake().await {
            Ok(()) => {
                let _ = events.send(InputEvent::WakeDetected).await;
            }
            Err(e) => {
                let _ = events
                    .send(InputEvent::ClassifierDown {
                        modality: Modality::Voice,
                        reason: e.to_string(),
                    })
                    .await;
                // Back off so a hard failure (no mic, missing binary) does
                // not spin the respawn loop.
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    })
}

/// Record one command and publish the transcript.
fn spawn_capture(
    voice: Arc<CommandVoice>,
    stop: oneshot::Receiver<()>,
    events: mpsc::Sender<InputEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match voice.capture(stop).await {
            Ok(text) => {
                if !text.is_empty() {
                    let _ = events.send(InputEvent::Transcript(text)).await;
                }
                let _ = events.send(InputEvent::EndOfUtterance).await;
            }
            Err(e) => {
                let _ = events
                    .send(InputEvent::ClassifierDown {
                        modality: Modality::Voice,
                        reason: e.to_string(),
                    })
                    .await;
                // Finalize so the machine returns to Idle.
                let _ = events.send(InputEvent::EndOfUtterance).await;
            }
        }
    })
}

/// Drive the agent and report the outcome as a spoken line.
fn spawn_run(
    agent: Arc<AgentLoop>,
    history: Arc<HistoryStore>,
    cancel: CancelFlag,
    command: Command,
    done: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let message = match agent.run(&command, &history, &cancel).await {
            Ok(RunOutcome::Completed { reply }) => {
                if reply.text.is_empty() {
                    "Done".to_string()
                } else {
                    reply.text
                }
            }
            Ok(RunOutcome::Cancelled) => "Cancelled".to_string(),
            Ok(RunOutcome::IterationLimit) => {
                "I ran out of steps before finishing. Try breaking the task up.".to_string()
            }
            Err(e) => {
                error!(error = %e, "Run failed");
                format!("That didn't work: {e}")
            }
        };
        let _ = done.send(message).await;
    })
}
