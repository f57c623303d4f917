//! Config command - manage configuration, and config resolution for the
//! other commands.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use tracing::debug;

use billsheet_core::BillsheetConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the configuration in effect
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, explicit: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(explicit),
        ConfigCommand::Init(init_args) => init_config(init_args),
        ConfigCommand::Path => show_path(explicit),
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("billsheet")
        .join("config.json")
}

/// Resolve the configuration: `--config`, then the per-user file, then
/// built-in defaults. An explicit file that cannot be read is an error.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<BillsheetConfig> {
    if let Some(path) = explicit {
        return BillsheetConfig::from_file(path).map_err(|e| {
            anyhow::anyhow!("Failed to load config {}: {}", path.display(), e)
        });
    }

    let user_path = default_config_path();
    if user_path.exists() {
        debug!("Using config file {}", user_path.display());
        return BillsheetConfig::from_file(&user_path).map_err(|e| {
            anyhow::anyhow!("Failed to load config {}: {}", user_path.display(), e)
        });
    }

    debug!("No config file found, using defaults");
    Ok(BillsheetConfig::defaults())
}

fn show_config(explicit: Option<&Path>) -> anyhow::Result<()> {
    if explicit.is_none() && !default_config_path().exists() {
        eprintln!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }

    let config = load_config(explicit)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(default_config_path);

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    // Create parent directory if needed
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    BillsheetConfig::defaults().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );
    println!("Set sheets.spreadsheet_id before processing invoices.");

    Ok(())
}

fn show_path(explicit: Option<&Path>) -> anyhow::Result<()> {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    println!("Configuration file: {}", config_path.display());

    if config_path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'billsheet config init' to create a configuration file.");
    }

    Ok(())
}
