//! `handsfree status` — Show configuration summary.

use handsfree_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    println!("🎙️  Handsfree Status");
    println!("===================\n");

    println!("  Provider:        {}", config.provider);
    println!("  Model:           {}", config.model);
    println!(
        "  API key:         {}",
        if config.has_api_key() { "configured" } else { "missing" }
    );
    println!("  Wake phrase:     \"{}\"", config.voice.wake_phrase);
    println!("  Whisper model:   {}", config.voice.whisper_model);
    println!(
        "  Speech output:   {} ({})",
        if config.voice.speak_feedback { "on" } else { "off" },
        config.voice.tts_engine
    );
    println!(
        "  Gestures:        {}",
        if config.gesture.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  Target display:  {}",
        config
            .executor
            .target_resolution
            .as_deref()
            .unwrap_or("auto (aspect-ratio match)")
    );
    println!("  Max iterations:  {}", config.agent.max_iterations);
    println!(
        "  Fast path:       {}",
        if config.agent.local_fast_path { "on" } else { "off" }
    );
    println!();

    Ok(())
}
