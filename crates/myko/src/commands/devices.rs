//! Device commands - list devices and show one device.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;
use super::states::print_states;

/// Arguments for the devices command.
#[derive(Args, Debug)]
pub struct DevicesArgs {
    /// Only show devices of this class (e.g. fan, light, switch)
    #[arg(short, long)]
    pub class: Option<String>,
}

/// Arguments for the device command.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Metadevice ID
    pub id: String,
}

/// List devices.
pub async fn run_list(args: DevicesArgs, ctx: &Context) -> Result<()> {
    let client = ctx.authenticated_client()?;
    let devices = client
        .scoped(|c| async move {
            match args.class {
                Some(class) => c.devices().list_class(&class).await,
                None => c.devices().list().await,
            }
        })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if devices.is_empty() {
        println!("{}", dim.apply_to("No devices found"));
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "{:<38} {:<10} {:<20} {}",
            "ID", "CLASS", "MODEL", "NAME"
        ))
        .bold()
    );
    for device in &devices {
        println!(
            "{:<38} {:<10} {:<20} {}",
            device.id, device.device_class, device.model, device.friendly_name
        );
    }
    if ctx.verbose {
        println!();
        println!("{}", dim.apply_to(format!("{} devices", devices.len())));
    }

    Ok(())
}

/// Show one device with its states.
pub async fn run_show(args: DeviceArgs, ctx: &Context) -> Result<()> {
    let client = ctx.authenticated_client()?;
    let device = client
        .scoped(|c| async move { c.devices().get(&args.id).await })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&device)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style(&device.friendly_name).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("ID:"), device.id);
    println!("  {} {}", dim.apply_to("Device ID:"), device.device_id);
    println!("  {} {}", dim.apply_to("Class:"), device.device_class);
    println!("  {} {}", dim.apply_to("Model:"), device.model);
    if let Some(manufacturer) = &device.manufacturer_name {
        println!("  {} {}", dim.apply_to("Manufacturer:"), manufacturer);
    }
    if !device.children.is_empty() {
        println!(
            "  {} {}",
            dim.apply_to("Children:"),
            device.children.join(", ")
        );
    }
    println!();
    print_states(&device.states);
    println!();

    Ok(())
}
