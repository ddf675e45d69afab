//! The capture-invoke-execute cycle.
//!
//! One run per voice command: screenshot the screen, send the history to the
//! model, execute the actions it proposes, append the results with fresh
//! screenshots, and loop until the model answers in plain text, the
//! iteration cap is hit, or the run is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use handsfree_core::Error;
use handsfree_core::action::Action;
use handsfree_core::error::ProviderError;
use handsfree_core::event::Command;
use handsfree_core::provider::{InvokeRequest, ModelReply, Provider};
use handsfree_core::turn::Turn;
use handsfree_screen::Executor;

use crate::cancel::CancelFlag;
use crate::history::HistoryStore;

/// Instructions sent with every request. Kept short; the screenshots carry
/// most of the context.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a computer-use assistant controlling a macOS \
desktop on the user's behalf. The user speaks commands; you see the screen through the \
screenshots in the conversation. Use the computer tool to act. Coordinates are in the \
advertised display resolution. Take a screenshot when unsure about the current state. When \
the task is done, reply with a short spoken-style summary and no tool calls.";

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The model replied with plain text.
    Completed { reply: ModelReply },
    /// Cancelled by the reset gesture or a mid-run wake word.
    Cancelled,
    /// The iteration cap was reached before the model finished.
    IterationLimit,
}

/// Drives one command through the model and the executor.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    executor: Arc<Executor>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    max_iterations: u32,
    max_attempts: u32,
    initial_backoff: Duration,
    image_retention: usize,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        executor: Arc<Executor>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            executor,
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_tokens: 4096,
            max_iterations: 20,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            image_retention: 3,
        }
    }

    /// Replace the default system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    /// Cap the number of invoke-execute iterations per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Retry policy for provider calls.
    pub fn with_retry(mut self, max_attempts: u32, initial_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    /// How many screenshots stay in history.
    pub fn with_image_retention(mut self, n: usize) -> Self {
        self.image_retention = n;
        self
    }

    /// Run one command to completion.
    ///
    /// Provider errors that survive the retry policy surface as `Err`, so
    /// the caller can speak them; a reset mid-run comes back as
    /// `RunOutcome::Cancelled` with the history already cleared.
    pub async fn run(
        &self,
        command: &Command,
        history: &HistoryStore,
        cancel: &CancelFlag,
    ) -> Result<RunOutcome, Error> {
        let generation = history.begin_run();
        info!(command = %command.text, "Starting run");

        if !history.append_in(generation, Turn::user(&command.text)) {
            return Ok(RunOutcome::Cancelled);
        }

        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                info!(iteration, "Run cancelled");
                return Ok(RunOutcome::Cancelled);
            }

            debug!(iteration, "Loop iteration");

            // A fresh frame ahead of every model call, pruned with the rest.
            let frame = self.executor.capture().await?;
            if !history.append_in(generation, Turn::screenshot(frame.into_payload())) {
                return Ok(RunOutcome::Cancelled);
            }
            history.retain_recent_images(self.image_retention);

            let request = InvokeRequest {
                model: self.model.clone(),
                system: self.system_prompt.clone(),
                turns: history.snapshot(),
                geometry: self.executor.geometry(),
                max_tokens: self.max_tokens,
            };

            let reply = self.invoke_with_retry(request).await?;

            if !history.append_in(
                generation,
                Turn::assistant_with_tools(reply.text.clone(), reply.tool_calls.clone()),
            ) {
                return Ok(RunOutcome::Cancelled);
            }

            if reply.is_terminal() {
                info!(iteration, "Run completed");
                return Ok(RunOutcome::Completed { reply });
            }

            for tool in &reply.tool_calls {
                let turn = match Action::from_tool_use(&tool.input) {
                    Ok(action) => match self.executor.execute(&action).await {
                        Ok(outcome) => match outcome.frame {
                            Some(frame) => Turn::tool_result_with_image(
                                &tool.id,
                                outcome.summary,
                                frame.into_payload(),
                            ),
                            None => Turn::tool_result(&tool.id, outcome.summary),
                        },
                        Err(e) => {
                            // Reported to the model so it can recover.
                            warn!(action = ?action.kind(), error = %e, "Action failed");
                            Turn::tool_result(&tool.id, format!("Error: {e}"))
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "Unparseable tool call");
                        Turn::tool_result(&tool.id, format!("Error: {e}"))
                    }
                };

                if !history.append_in(generation, turn) {
                    return Ok(RunOutcome::Cancelled);
                }
                if cancel.is_cancelled() {
                    info!("Run cancelled mid-actions");
                    return Ok(RunOutcome::Cancelled);
                }
            }
        }

        warn!(max = self.max_iterations, "Iteration limit reached");
        Ok(RunOutcome::IterationLimit)
    }

    /// Invoke the provider, retrying transient failures with exponential
    /// backoff. A rate-limit hint from the provider overrides the backoff.
    async fn invoke_with_retry(&self, request: InvokeRequest) -> Result<ModelReply, ProviderError> {
        let mut backoff = self.initial_backoff;

        for attempt in 1..=self.max_attempts {
            match self.provider.invoke(request.clone()).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = match &e {
                        ProviderError::RateLimited { retry_after_secs } => {
                            Duration::from_secs(*retry_after_secs)
                        }
                        _ => backoff,
                    };
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }
}
