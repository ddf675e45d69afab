//! Local fast path for trivial app commands.
//!
//! "Open Safari" does not need a model round trip. Simple open/close
//! phrases are executed directly through the OS; anything compound or
//! long falls through to the agent loop.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{info, warn};

use handsfree_screen::controller::{open_app, quit_app};

static OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:open|launch|start)\s+(?:the\s+)?(.+?)\s*$").expect("static regex")
});
static CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:close|quit)\s+(?:the\s+)?(.+?)\s*$").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppVerb {
    Open,
    Close,
}

/// Match a command against the fast-path patterns.
fn classify(command: &str) -> Option<(AppVerb, String)> {
    let trimmed = command.trim().trim_end_matches(['.', '!', '?']);

    // Compound instructions need the model.
    let lower = trimmed.to_lowercase();
    if lower.contains(" and ") || lower.contains(" then ") {
        return None;
    }

    let (verb, app) = if let Some(caps) = OPEN_RE.captures(trimmed) {
        (AppVerb::Open, caps[1].to_string())
    } else if let Some(caps) = CLOSE_RE.captures(trimmed) {
        (AppVerb::Close, caps[1].to_string())
    } else {
        return None;
    };

    // App names run one to three words ("Safari", "Activity Monitor",
    // "Visual Studio Code"); longer tails are instructions, not names.
    if app.split_whitespace().count() > 3 {
        return None;
    }

    Some((verb, app))
}

/// Try to satisfy a command without the model. Returns the status note to
/// speak/print if the fast path handled it.
pub async fn try_fast_path(command: &str, command_timeout: Duration) -> Option<String> {
    let (verb, app) = classify(command)?;

    let result = match verb {
        AppVerb::Open => open_app(&app, command_timeout).await,
        AppVerb::Close => quit_app(&app, command_timeout).await,
    };

    match result {
        Ok(()) => {
            info!(%app, ?verb, "Fast path handled command");
            Some(match verb {
                AppVerb::Open => format!("Opened {app}"),
                AppVerb::Close => format!("Closed {app}"),
            })
        }
        Err(e) => {
            // Fall through to the agent; the model can find the app.
            warn!(%app, error = %e, "Fast path failed, deferring to agent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_phrases_match() {
        assert_eq!(
            classify("open safari"),
            Some((AppVerb::Open, "safari".into()))
        );
        assert_eq!(
            classify("Launch the Activity Monitor"),
            Some((AppVerb::Open, "Activity Monitor".into()))
        );
        assert_eq!(
            classify("start Terminal."),
            Some((AppVerb::Open, "Terminal".into()))
        );
    }

    #[test]
    fn close_phrases_match() {
        assert_eq!(
            classify("quit Safari"),
            Some((AppVerb::Close, "Safari".into()))
        );
        assert_eq!(
            classify("close the Notes"),
            Some((AppVerb::Close, "Notes".into()))
        );
    }

    #[test]
    fn compound_commands_fall_through() {
        assert_eq!(classify("open safari and search for rust"), None);
        assert_eq!(classify("open safari then click the address bar"), None);
    }

    #[test]
    fn long_tails_fall_through() {
        assert_eq!(classify("open the file I was editing yesterday"), None);
    }

    #[test]
    fn unrelated_commands_fall_through() {
        assert_eq!(classify("check my email"), None);
        assert_eq!(classify("take a screenshot"), None);
        assert_eq!(classify(""), None);
    }
}
