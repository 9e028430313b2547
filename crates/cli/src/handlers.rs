//! Command handlers for pinpilot CLI

use crate::wizard::run_init_wizard;
use anyhow::{Context, Result};
use clap::Command;
use clap_complete::{generate, Shell as ClapShell};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use pinpilot_core::{
    config_exists, get_config_path, load_config, load_config_from, mask_secret, validate_config,
    ConfigFile, Error, Pinner, PinataPinner, ReqwestTransport, WalkDirSource,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};

/// Global flags that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub secret_api_key: Option<String>,
}

/// Load the configuration file (if any) and apply command-line overrides.
///
/// A missing default config file is not an error: credentials may come from
/// the environment. An explicitly requested file must exist.
pub fn load_settings(overrides: &Overrides) -> Result<ConfigFile> {
    let mut config = match &overrides.config_path {
        Some(path) => load_config_from(path)?,
        None if config_exists() => load_config()?,
        None => ConfigFile::default(),
    };

    if let Some(key) = &overrides.api_key {
        config.pinata.api_key = Some(key.clone());
    }
    if let Some(secret) = &overrides.secret_api_key {
        config.pinata.secret_api_key = Some(secret.clone());
    }

    Ok(config)
}

/// Build the Pinata backend described by `config`
fn build_pinner(config: &ConfigFile, include_hidden: bool) -> Result<PinataPinner> {
    let advanced = config.advanced.clone().unwrap_or_default();
    let transport = ReqwestTransport::new(advanced.timeout())?;
    let files = WalkDirSource::new()
        .include_hidden(include_hidden || advanced.include_hidden)
        .follow_links(advanced.follow_links);

    Ok(PinataPinner::with_parts(Arc::new(transport), Arc::new(files))
        .with_base_url(config.pinata.base_url.clone()))
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Handle init command
pub async fn handle_init(overrides: &Overrides) -> Result<()> {
    run_init_wizard(overrides.config_path.as_deref()).await
}

/// Handle `pin dir`
pub async fn handle_pin_dir(
    overrides: &Overrides,
    path: &Path,
    tag: Option<&str>,
    hidden: bool,
    output: &str,
) -> Result<()> {
    let config = load_settings(overrides)?;
    let pinner = build_pinner(&config, hidden)?;

    // Credentials are checked here, before anything is read or sent
    let api = pinner
        .builder(config.pinata.options())
        .await
        .map_err(with_hint)?;

    let pb = spinner(format!("Pinning {} to {}...", path.display(), pinner.name()))?;
    let result = pinner.pin_dir(&api, path, tag).await;
    pb.finish_and_clear();

    let cid = result.with_context(|| format!("Failed to pin {}", path.display()))?;

    match output {
        "json" => {
            println!(
                "{}",
                serde_json::json!({
                    "backend": pinner.slug(),
                    "path": path.display().to_string(),
                    "cid": cid,
                    "tag": tag,
                    "pinned_at": chrono::Utc::now().to_rfc3339(),
                })
            );
        }
        _ => {
            #[derive(Tabled)]
            struct PinRow {
                backend: String,
                path: String,
                cid: String,
            }

            let rows = vec![PinRow {
                backend: pinner.name().to_string(),
                path: path.display().to_string(),
                cid: cid.clone(),
            }];

            println!("{} Directory pinned", style("✅").green());
            println!();
            println!("{}", Table::new(rows));
            println!();
            println!("  https://ipfs.io/ipfs/{}", cid);
        }
    }

    Ok(())
}

/// Handle `pin cid`
pub async fn handle_pin_cid(overrides: &Overrides, cid: Option<&str>, tag: Option<&str>) -> Result<()> {
    let config = load_settings(overrides)?;
    let pinner = build_pinner(&config, false)?;

    let api = pinner
        .builder(config.pinata.options())
        .await
        .map_err(with_hint)?;

    let label = cid.unwrap_or("<none>");
    let pb = spinner(format!("Requesting pin of {} on {}...", label, pinner.name()))?;
    let result = pinner.pin_cid(&api, cid, tag).await;
    pb.finish_and_clear();

    result.with_context(|| format!("Failed to pin {}", label))?;

    println!("{} Pin requested: {}", style("✅").green(), label);
    Ok(())
}

/// Handle config commands
pub async fn handle_config(action: &str, overrides: &Overrides) -> Result<()> {
    match action {
        "show" => {
            let config = load_settings(overrides)?;
            let path = match &overrides.config_path {
                Some(p) => p.clone(),
                None => get_config_path()?,
            };

            #[derive(Tabled)]
            struct SettingRow {
                setting: String,
                value: String,
            }

            let advanced = config.advanced.clone().unwrap_or_default();
            let rows = vec![
                SettingRow {
                    setting: "file".to_string(),
                    value: path.display().to_string(),
                },
                SettingRow {
                    setting: "pinata.api_key".to_string(),
                    value: config
                        .pinata
                        .api_key
                        .as_deref()
                        .map(mask_secret)
                        .unwrap_or_else(|| "(not set)".to_string()),
                },
                SettingRow {
                    setting: "pinata.secret_api_key".to_string(),
                    value: if config.pinata.secret_api_key.is_some() {
                        "***".to_string()
                    } else {
                        "(not set)".to_string()
                    },
                },
                SettingRow {
                    setting: "pinata.base_url".to_string(),
                    value: config.pinata.base_url.clone(),
                },
                SettingRow {
                    setting: "advanced.timeout".to_string(),
                    value: format!("{}s", advanced.timeout),
                },
                SettingRow {
                    setting: "advanced.include_hidden".to_string(),
                    value: advanced.include_hidden.to_string(),
                },
                SettingRow {
                    setting: "advanced.follow_links".to_string(),
                    value: advanced.follow_links.to_string(),
                },
            ];

            println!("Current configuration:");
            println!();
            println!("{}", Table::new(rows));

            Ok(())
        }
        "validate" => {
            println!("Validating configuration...");

            let config = load_settings(overrides)?;
            validate_config(&config)?;
            println!("  {} Valid configuration format", style("✅").green());

            let pinner = build_pinner(&config, false)?;
            pinner.builder(config.pinata.options()).await?;
            // Only the shape of the keys is checked, no request is made
            println!("  {} {} credentials well-formed", style("✅").green(), pinner.name());

            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: show, validate");
            Ok(())
        }
    }
}

/// Handle doctor commands
pub async fn handle_doctor(action: &str, overrides: &Overrides) -> Result<()> {
    match action {
        "check" => {
            println!("Checking pinpilot installation...");

            println!("  {} pinpilot is installed", style("✅").green());
            println!("  Version: {}", env!("CARGO_PKG_VERSION"));

            let explicit = overrides.config_path.is_some();
            if explicit || config_exists() {
                println!("  {} Configuration found", style("✅").green());
            } else {
                println!("  ⚠️  Configuration not found (run 'pinpilot init')");
            }

            let config = load_settings(overrides)?;
            match validate_config(&config) {
                Ok(()) => println!("  {} Configuration valid", style("✅").green()),
                Err(e) => println!("  ⚠️  {}", e),
            }

            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: check");
            Ok(())
        }
    }
}

/// Attach setup instructions to credential errors
fn with_hint(err: Error) -> anyhow::Error {
    match err {
        Error::Config(_) => anyhow::anyhow!(
            "{}\n\
             Run 'pinpilot init', or set PINATA_API_KEY and PINATA_SECRET_API_KEY.\n\
             Get API keys from: https://app.pinata.cloud/developers/api-keys",
            err
        ),
        other => other.into(),
    }
}

/// Handle shell completion generation
pub async fn handle_completion(shell: &str, cmd: &mut Command) -> Result<()> {
    use std::io;

    let clap_shell = match shell {
        "bash" => ClapShell::Bash,
        "zsh" => ClapShell::Zsh,
        "fish" => ClapShell::Fish,
        "elvish" => ClapShell::Elvish,
        "powershell" | "pwsh" => ClapShell::PowerShell,
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported shell: {}\nSupported shells: bash, zsh, fish, elvish, powershell",
                shell
            ));
        }
    };

    generate(clap_shell, cmd, "pinpilot", &mut io::stdout());

    Ok(())
}
