//! Config command - configuration management.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;

use myko_config::{ConfigError, MykoConfig};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration (password redacted)
    Show,

    /// Show the configuration file path
    Path,

    /// Write a config file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigArgs {
    /// Whether this invocation writes a new config file.
    pub fn is_init(&self) -> bool {
        matches!(self.command, ConfigCommand::Init { .. })
    }
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { force } => cmd_init(ctx, force),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    if config.auth.password.is_some() {
        config.auth.password = Some("********".to_string());
    }

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    match &ctx.config_path {
        Some(path) if path.is_file() => {
            println!("{}", dim.apply_to(format!("# {}", path.display())));
        }
        _ => println!("{}", dim.apply_to("# No config file loaded (using defaults)")),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path = ctx.config_path.as_ref().ok_or(ConfigError::NoConfigDir)?;
    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.is_file(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_init(ctx: &Context, force: bool) -> Result<()> {
    let path = ctx.config_path.as_ref().ok_or(ConfigError::NoConfigDir)?;
    if path.exists() && !force {
        bail!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    myko_config::save_config(&MykoConfig::default(), path)?;

    let green = Style::new().green();
    println!("{} Wrote {}", green.apply_to("✓"), path.display());
    Ok(())
}
