//! `handsfree exec` — One typed command through the agent, no microphone.

use handsfree_agent::{RunOutcome, try_fast_path};
use handsfree_core::event::Command;

use super::run::Runtime;

pub async fn run(text: String) -> Result<(), Box<dyn std::error::Error>> {
    if text.trim().is_empty() {
        return Err("no command given; try: handsfree exec open safari".into());
    }

    let rt = Runtime::bootstrap().await?;

    if rt.config.agent.local_fast_path {
        if let Some(note) = try_fast_path(&text, rt.command_timeout).await {
            println!("{note}");
            return Ok(());
        }
    }

    let outcome = rt
        .agent
        .run(&Command::new(text), &rt.history, &rt.cancel)
        .await?;

    match outcome {
        RunOutcome::Completed { reply } => {
            println!("{}", if reply.text.is_empty() { "Done." } else { reply.text.as_str() });
        }
        RunOutcome::Cancelled => println!("Cancelled."),
        RunOutcome::IterationLimit => {
            println!("Stopped: reached the iteration limit before finishing.");
        }
    }

    Ok(())
}
