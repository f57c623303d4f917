//! Templates command - list the template collection in discovery order.

use std::path::PathBuf;

use clap::Args;
use console::style;

use billsheet_core::{load_templates, BillsheetConfig};

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesArgs {
    /// Templates directory (overrides the configured one)
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

pub async fn run(args: TemplatesArgs, config: &BillsheetConfig) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(dir) = args.dir {
        config.templates.dir = dir;
    }

    let templates = load_templates(&config)?;
    if templates.is_empty() {
        println!(
            "{} No templates found in {}",
            style("ℹ").blue(),
            config.templates.dir.display()
        );
        return Ok(());
    }

    for (i, template) in templates.iter().enumerate() {
        println!(
            "{:>3}. {} ({})",
            i + 1,
            style(template.name()).bold(),
            template.issuer()
        );
        println!("     keywords: {}", template.keywords().join(", "));
        println!("     fields:   {}", template.field_names().join(", "));
        println!("     source:   {}", template.source().display());
    }

    println!();
    println!("{} {} templates loaded", style("✓").green(), templates.len());

    Ok(())
}
