//! The `doctor` command: diagnose the local setup.

use std::time::Duration;

use patchsmith_config::AppConfig;
use patchsmith_providers::OllamaClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Patchsmith Doctor");
    println!("=================\n");

    let mut issues = 0;

    // Configuration
    let config = match AppConfig::load() {
        Ok(config) => {
            println!("✅ Configuration loads and validates");
            config
        }
        Err(e) => {
            println!("❌ Configuration: {e}");
            println!("\n1 issue found");
            return Ok(());
        }
    };

    // Work directory
    if config.work_dir.is_dir() {
        println!("✅ Work directory exists: {}", config.work_dir.display());
    } else {
        println!(
            "❌ Work directory does not exist: {}",
            config.work_dir.display()
        );
        issues += 1;
    }

    // Ollama server
    let client = OllamaClient::new(
        &config.provider.base_url,
        &config.provider.model,
        Duration::from_secs(10),
    )?;
    match client.health_check().await {
        Ok(true) => {
            println!("✅ Ollama server reachable at {}", config.provider.base_url);

            match client.list_models().await {
                Ok(models) if models.iter().any(|m| m == &config.provider.model) => {
                    println!("✅ Model '{}' is available", config.provider.model);
                }
                Ok(models) => {
                    println!(
                        "❌ Model '{}' not found. Available: {}",
                        config.provider.model,
                        if models.is_empty() {
                            "none".to_string()
                        } else {
                            models.join(", ")
                        }
                    );
                    println!("   Run: ollama pull {}", config.provider.model);
                    issues += 1;
                }
                Err(e) => {
                    println!("⚠️  Could not list models: {e}");
                }
            }
        }
        Ok(false) | Err(_) => {
            println!(
                "❌ Ollama server not reachable at {}",
                config.provider.base_url
            );
            println!("   Run: ollama serve");
            issues += 1;
        }
    }

    // Security mode
    if config.security.strict {
        println!("✅ Strict security mode is on");
    } else {
        println!("⚠️  Strict security mode is off (denylists still apply)");
    }

    println!();
    if issues == 0 {
        println!("All checks passed.");
    } else {
        println!("{issues} issue(s) found");
    }

    Ok(())
}
