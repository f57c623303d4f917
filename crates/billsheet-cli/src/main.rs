//! CLI application for extracting invoice totals into Google Sheets.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{auth, config, process, templates};

/// Extract invoice totals with YAML templates and append them to a Google Sheet
#[derive(Parser)]
#[command(name = "billsheet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Defaults to `process` on the configured document
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one invoice and append it to the spreadsheet
    Process(process::ProcessArgs),

    /// List the templates found in the templates directory
    Templates(templates::TemplatesArgs),

    /// Authorize access to Google Sheets and store the token
    Auth(auth::AuthArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.debug { "debug" } else { "info" }));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Process(process::ProcessArgs::default()));

    // Execute command
    match command {
        Commands::Process(args) => process::run(args, &config::load_config(config_path)?).await,
        Commands::Templates(args) => {
            templates::run(args, &config::load_config(config_path)?).await
        }
        Commands::Auth(args) => auth::run(args, &config::load_config(config_path)?).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
