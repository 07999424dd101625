//! Account command - shows the account ID.

use anyhow::Result;
use clap::Args;
use console::Style;
use serde::Serialize;

use super::Context;

/// Arguments for the account command.
#[derive(Args, Debug)]
pub struct AccountArgs {}

#[derive(Debug, Serialize)]
struct AccountOutput {
    account_id: String,
}

/// Run the account command.
pub async fn run(_args: AccountArgs, ctx: &Context) -> Result<()> {
    let client = ctx.authenticated_client()?;
    let account_id = client
        .scoped(|c| async move { c.account().id().await })
        .await?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&AccountOutput { account_id })?
        );
    } else {
        let dim = Style::new().dim();
        println!("{} {}", dim.apply_to("Account:"), account_id);
    }

    Ok(())
}
