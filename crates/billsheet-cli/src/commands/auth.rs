//! Auth command - run the OAuth consent flow and store the token.

use std::time::Duration;

use chrono::Local;
use clap::Args;
use console::style;

use billsheet_core::BillsheetConfig;
use billsheet_sheets::Authenticator;

/// Arguments for the auth command.
#[derive(Args)]
pub struct AuthArgs {
    /// Ignore the stored token and ask for consent again
    #[arg(long)]
    force: bool,
}

pub async fn run(args: AuthArgs, config: &BillsheetConfig) -> anyhow::Result<()> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.sheets.timeout_secs))
        .build()?;

    let token = Authenticator::new(http, &config.sheets)
        .authorize(args.force)
        .await?;

    println!(
        "{} Authorized. Token stored at {}",
        style("✓").green(),
        config.sheets.token_path.display()
    );
    if let Some(expiry) = token.expiry {
        println!(
            "Access token valid until {}",
            expiry.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
    if token.refresh_token.is_none() {
        println!(
            "{} No refresh token was granted; consent will be needed again when it expires.",
            style("ℹ").blue()
        );
    }

    Ok(())
}
