//! `handsfree doctor` — Check external dependencies and permissions.

use std::time::Duration;

use handsfree_config::AppConfig;
use handsfree_screen::controller::{check_cliclick, probe_native_size};

async fn has_binary(name: &str) -> bool {
    tokio::process::Command::new("which")
        .arg(name)
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Handsfree Doctor");
    println!("===================\n");

    let mut issues = 0;
    let timeout = Duration::from_secs(10);

    // Config
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");
                if config.has_api_key() {
                    println!("  ✅ API key configured");
                } else {
                    println!("  ⚠️  No API key — add api_key to config.toml or export ANTHROPIC_API_KEY");
                    issues += 1;
                }
                Some(config)
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                issues += 1;
                None
            }
        }
    } else {
        println!("  ❌ No config file — run `handsfree onboard`");
        issues += 1;
        None
    };

    // Screen control
    match check_cliclick(timeout).await {
        Ok(()) => println!("  ✅ cliclick installed and accessibility granted"),
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }
    match probe_native_size(timeout).await {
        Ok((w, h)) => println!("  ✅ Display detected: {w}x{h}"),
        Err(e) => {
            println!("  ⚠️  Could not detect display size: {e}");
            issues += 1;
        }
    }

    // Voice pipeline
    if has_binary("rec").await {
        println!("  ✅ sox (rec) installed");
    } else {
        println!("  ❌ sox not found — brew install sox");
        issues += 1;
    }
    if has_binary("whisper-cli").await {
        println!("  ✅ whisper-cli installed");
    } else {
        println!("  ❌ whisper-cli not found — brew install whisper-cpp");
        issues += 1;
    }
    if let Some(config) = &config {
        let model = shellexpand_home(&config.voice.whisper_model);
        if std::path::Path::new(&model).exists() {
            println!("  ✅ Whisper model present: {model}");
        } else {
            println!("  ❌ Whisper model missing: {model}");
            issues += 1;
        }

        // Speech output
        let tts = if config.voice.tts_engine == "edge" { "edge-tts" } else { "say" };
        if has_binary(tts).await {
            println!("  ✅ Speech engine available: {tts}");
        } else {
            println!("  ⚠️  Speech engine not found: {tts}");
            issues += 1;
        }

        // Gesture helper
        if config.gesture.enabled {
            match config.gesture.helper_command.first() {
                Some(helper) if has_binary(helper).await => {
                    println!("  ✅ Gesture helper found: {helper}");
                }
                Some(helper) => {
                    println!("  ⚠️  Gesture helper not found: {helper} (voice still works)");
                    issues += 1;
                }
                None => {
                    println!("  ❌ Gesture enabled but helper_command is empty");
                    issues += 1;
                }
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed! Run `handsfree run` to start.");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

fn shellexpand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{home}/{rest}"),
        _ => path.to_string(),
    }
}
