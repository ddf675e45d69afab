//! `handsfree onboard` — First-time setup.

use handsfree_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let models_dir = config_dir.join("models");

    println!("🎙️  Handsfree — First-Time Setup");
    println!("================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !models_dir.exists() {
        std::fs::create_dir_all(&models_dir)?;
        println!("✅ Created models directory: {}", models_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    println!("\n📝 Next steps:");
    println!("   1. Add your API key to {} (or export ANTHROPIC_API_KEY)", config_path.display());
    println!("   2. Install dependencies: brew install cliclick sox whisper-cpp");
    println!(
        "   3. Download a whisper model into {} (e.g. ggml-base.en.bin)",
        models_dir.display()
    );
    println!("   4. Run: handsfree doctor");
    println!("   5. Run: handsfree run — then say \"hey computer\"\n");

    Ok(())
}
