//! States command - shows the current states of a device.

use anyhow::Result;
use chrono::DateTime;
use clap::Args;
use console::{Style, style};
use myko_client::DeviceState;
use serde_json::Value;

use super::Context;

/// Arguments for the states command.
#[derive(Args, Debug)]
pub struct StatesArgs {
    /// Metadevice ID
    pub id: String,
}

/// Run the states command.
pub async fn run(args: StatesArgs, ctx: &Context) -> Result<()> {
    let client = ctx.authenticated_client()?;
    let states = client
        .scoped(|c| async move { c.devices().states(&args.id).await })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&states)?);
    } else {
        print_states(&states);
    }

    Ok(())
}

/// Print states as an aligned table.
pub fn print_states(states: &[DeviceState]) {
    let dim = Style::new().dim();
    if states.is_empty() {
        println!("{}", dim.apply_to("No states reported"));
        return;
    }

    println!(
        "{}",
        style(format!(
            "{:<24} {:<20} {:<24} {}",
            "FUNCTION", "INSTANCE", "VALUE", "UPDATED"
        ))
        .bold()
    );
    for state in states {
        println!(
            "{:<24} {:<20} {:<24} {}",
            state.function_class,
            state.function_instance.as_deref().unwrap_or("-"),
            format_value(&state.value),
            state
                .last_update_time
                .and_then(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

/// Strings print bare; everything else as compact JSON.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_timestamp(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
