use anyhow::Result;
use clap::{CommandFactory, Parser};
use color_eyre::config::HookBuilder;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod handlers;
mod wizard;

/// pinpilot - pin websites and content to IPFS pinning services
#[derive(Parser, Debug)]
#[command(name = "pinpilot")]
#[command(author = "Kev <kev@m7academy.com>")]
#[command(version)]
#[command(about = "Pin directories and CIDs to IPFS pinning services from your terminal", long_about = None)]
struct Cli {
    /// Path to the configuration file (default: ~/.config/pinpilot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Pinata API key, overrides the configuration file
    #[arg(long, global = true, env = "PINATA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Pinata secret API key, overrides the configuration file
    #[arg(long, global = true, env = "PINATA_SECRET_API_KEY", hide_env_values = true)]
    secret_api_key: Option<String>,

    /// Sub-command to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Initial setup (interactive wizard)
    Init,

    /// Pin content
    Pin {
        #[command(subcommand)]
        action: PinAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Shell completion
    Completion {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: String,
    },

    /// Diagnostics
    Doctor {
        #[command(subcommand)]
        action: DoctorAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum PinAction {
    /// Upload a local directory and pin it
    Dir {
        /// Directory to upload
        path: PathBuf,
        /// Name attached to the pin
        #[arg(short, long)]
        tag: Option<String>,
        /// Include dot-files and dot-directories
        #[arg(long)]
        hidden: bool,
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Pin existing content by CID
    Cid {
        /// Content identifier to pin
        cid: Option<String>,
        /// Name attached to the pin
        #[arg(short, long)]
        tag: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Validate the configuration and credentials
    Validate,
}

#[derive(clap::Subcommand, Debug)]
enum DoctorAction {
    /// Check the installation
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    if let Err(e) = HookBuilder::default().install() {
        eprintln!("Warning: Failed to install error handler: {}", e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();

    let overrides = handlers::Overrides {
        config_path: cli.config.clone(),
        api_key: cli.api_key.clone(),
        secret_api_key: cli.secret_api_key.clone(),
    };

    init_tracing(cli.log_level.as_deref(), &overrides);

    // Execute command
    match cli.command {
        Commands::Init => handlers::handle_init(&overrides).await,
        Commands::Pin { action } => match action {
            PinAction::Dir { path, tag, hidden, output } => {
                handlers::handle_pin_dir(&overrides, &path, tag.as_deref(), hidden, &output).await
            }
            PinAction::Cid { cid, tag } => {
                handlers::handle_pin_cid(&overrides, cid.as_deref(), tag.as_deref()).await
            }
        },
        Commands::Config { action } => {
            let action_str = match action {
                ConfigAction::Show => "show",
                ConfigAction::Validate => "validate",
            };
            handlers::handle_config(action_str, &overrides).await
        }
        Commands::Completion { shell } => {
            handlers::handle_completion(&shell, &mut Cli::command()).await
        }
        Commands::Doctor { action } => {
            let action_str = match action {
                DoctorAction::Check => "check",
            };
            handlers::handle_doctor(action_str, &overrides).await
        }
    }
}

/// Install the stderr log subscriber.
///
/// The level comes from `--log-level`, then the config file, then `warn`.
fn init_tracing(cli_level: Option<&str>, overrides: &handlers::Overrides) {
    let configured = handlers::load_settings(overrides)
        .ok()
        .and_then(|c| c.logging)
        .map(|l| l.level);

    let log_level: tracing::Level = cli_level
        .map(str::to_string)
        .or(configured)
        .and_then(|l| l.parse().ok())
        .unwrap_or(tracing::Level::WARN);

    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}
