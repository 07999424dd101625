//! Login command - verifies credentials.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Print the ID token (sensitive)
    #[arg(long)]
    pub show_token: bool,
}

/// Login result for JSON output.
#[derive(Debug, Serialize)]
struct LoginOutput {
    username: String,
    expires_in_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Run the login command.
pub async fn run(args: LoginArgs, ctx: &Context) -> Result<()> {
    let client = ctx.authenticated_client()?;
    let token = client
        .scoped(|c| async move { c.auth().login().await })
        .await?;

    let output = LoginOutput {
        username: ctx.config.auth.username.clone().unwrap_or_default(),
        expires_in_secs: token.expires_in().as_secs(),
        token: args.show_token.then(|| token.value().to_string()),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let green = Style::new().green();
    let dim = Style::new().dim();

    println!(
        "{} Logged in as {}",
        green.apply_to("✓"),
        style(&output.username).bold()
    );
    println!(
        "  {} {}s",
        dim.apply_to("Token expires in:"),
        output.expires_in_secs
    );
    if let Some(token) = &output.token {
        println!("  {} {}", dim.apply_to("Token:"), token);
    }

    Ok(())
}
