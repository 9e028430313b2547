//! Interactive setup wizard for pinpilot configuration

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use pinpilot_core::{
    mask_secret, save_config, save_config_to, ConfigFile, PinataConfig, DEFAULT_BASE_URL,
};
use std::path::Path;

/// Run the interactive setup wizard
pub async fn run_init_wizard(config_path: Option<&Path>) -> Result<()> {
    println!("🚀 Welcome to pinpilot setup!\n");

    println!("This wizard will guide you through the configuration process.");
    println!("You will need a Pinata API key and its secret.");
    println!("Create one at https://app.pinata.cloud/developers/api-keys\n");

    let api_key = prompt_api_key()?;
    let secret_api_key = prompt_secret_api_key()?;

    // Summary
    println!("\n📋 Configuration summary:");
    println!("  Backend: Pinata");
    println!("  Endpoint: {}", DEFAULT_BASE_URL);
    println!("  API key: {}", mask_secret(&api_key));

    let confirm = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Save this configuration?")
        .default(false)
        .interact()?;

    if !confirm {
        println!("❌ Configuration cancelled");
        return Ok(());
    }

    let config = ConfigFile {
        pinata: PinataConfig {
            api_key: Some(api_key),
            secret_api_key: Some(secret_api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
        },
        advanced: None,
        logging: None,
    };

    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message("Saving configuration...");

    let saved_to = match config_path {
        Some(path) => {
            save_config_to(&config, path)?;
            path.to_path_buf()
        }
        None => save_config(&config)?,
    };

    pb.inc(1);
    pb.finish_with_message("✅ Configuration saved!");

    println!("\n🎉 Setup complete!");
    println!("\nConfiguration saved to: {}", saved_to.display());
    println!("\nYou can now use pinpilot:");
    println!("  $ pinpilot pin dir ./public --tag my-site");
    println!("  $ pinpilot pin cid <CID>");
    println!("  $ pinpilot config show");

    Ok(())
}

/// Prompt for the Pinata API key
fn prompt_api_key() -> Result<String> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Pinata API key")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("API key cannot be empty")
            } else if !input.chars().all(|c| c.is_ascii_alphanumeric()) {
                Err("API key must be alphanumeric")
            } else {
                Ok(())
            }
        })
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to get API key: {}", e))
}

/// Prompt for the Pinata secret API key
fn prompt_secret_api_key() -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Pinata secret API key")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Secret API key cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to get secret API key: {}", e))
}
