//! Myko - command-line client for the Myko device cloud.
//!
//! Main entry point for the `myko` CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

mod commands;
mod exit;

use commands::{account, config, devices, get, login, states};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Myko - command-line client for the Myko device cloud
#[derive(Parser)]
#[command(name = "myko")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: $MYKO_CONFIG_DIR/myko.toml)
    #[arg(long, global = true, env = "MYKO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data API base URL
    #[arg(long, global = true, env = "MYKO_BASE_URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Maximum attempts per request, including the first
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Account username
    #[arg(short, long, global = true, env = "MYKO_USERNAME")]
    pub username: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and show token lifetime
    Login(login::LoginArgs),

    /// Show the account ID
    Account(account::AccountArgs),

    /// List devices
    Devices(devices::DevicesArgs),

    /// Show one device
    Device(devices::DeviceArgs),

    /// Show the current states of a device
    States(states::StatesArgs),

    /// Fetch any API path and print the normalized response
    Get(get::GetArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            ExitCode::from(exit::exit_code(&e))
        }
    }
}

/// Console (human-readable, stderr) + rotating JSON file.
fn init_tracing(verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "myko=debug,myko_client=debug,myko_config=debug,info"
    } else {
        "myko=warn,myko_client=warn,warn"
    };

    let log_dir = myko_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("myko")
        .filename_suffix("log")
        .build(&log_dir)
        .ok()
        .map(tracing_appender::non_blocking);
    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(tracing_subscriber::EnvFilter::new(
                        "myko=trace,myko_client=trace,myko_config=trace,info",
                    )),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}

async fn run(cli: Cli) -> Result<()> {
    let loaded = match (&cli.command, cli.config.as_deref()) {
        // `config init --config <new file>` creates the file it names.
        (Commands::Config(args), Some(path)) if args.is_init() && !path.exists() => {
            myko_config::LoadedConfig {
                config: myko_config::MykoConfig::default(),
                path: Some(path.to_path_buf()),
                loaded: false,
                warnings: Vec::new(),
            }
        }
        (_, explicit) => myko_config::load_config(explicit)?,
    };
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let mut config = loaded.config;
    if let Some(base_url) = cli.base_url {
        config.client.base_url = base_url;
    }
    if let Some(timeout) = cli.timeout {
        config.client.timeout_secs = timeout;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(username) = cli.username {
        config.auth.username = Some(username);
    }
    config.validate()?;

    let ctx = commands::Context {
        config,
        config_path: loaded.path,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Login(args) => login::run(args, &ctx).await,
        Commands::Account(args) => account::run(args, &ctx).await,
        Commands::Devices(args) => devices::run_list(args, &ctx).await,
        Commands::Device(args) => devices::run_show(args, &ctx).await,
        Commands::States(args) => states::run(args, &ctx).await,
        Commands::Get(args) => get::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
