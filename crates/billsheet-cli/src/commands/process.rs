//! Process command - extract one invoice and append it to the spreadsheet.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use billsheet_core::extraction::{text_source_for, PdftotextSource};
use billsheet_core::models::config::TextSourceKind;
use billsheet_core::{extract_record, load_templates, publish_record, BillsheetConfig, RunReport};
use billsheet_sheets::SheetsPublisher;

/// Arguments for the process command.
#[derive(Args, Default)]
pub struct ProcessArgs {
    /// Invoice document (PDF, image or text); defaults to the configured document
    document: Option<PathBuf>,

    /// Print the extracted record as JSON instead of publishing it
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: ProcessArgs, config: &BillsheetConfig) -> anyhow::Result<()> {
    let start = Instant::now();
    let document = args.document.unwrap_or_else(|| config.document.clone());

    // A broken template directory is the one fatal failure of a run.
    let templates = load_templates(config)?;
    info!("{} templates loaded", templates.len());

    if config.extraction.text_source == TextSourceKind::Pdftotext && !PdftotextSource::is_available()
    {
        warn!("pdftotext does not appear to be installed");
    }
    let source = text_source_for(&config.extraction);

    if args.dry_run {
        let pb = spinner("Extracting invoice data...");
        let record = extract_record(&templates, &document, source.as_ref(), &config.extraction.fields);
        pb.finish_and_clear();

        match record {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => eprintln!("{} No invoice data extracted", style("✗").red()),
        }
        debug!("Total processing time: {:?}", start.elapsed());
        return Ok(());
    }

    let record = extract_record(&templates, &document, source.as_ref(), &config.extraction.fields);

    // Only a document with data needs the spreadsheet.
    let report = match record {
        None => RunReport::NoRecord,
        Some(record) => match SheetsPublisher::from_config(&config.sheets) {
            Ok(publisher) => publish_record(record, &publisher).await,
            Err(e) => {
                error!("An error occurred: {}", e);
                RunReport::PublishFailed {
                    record,
                    reason: e.to_string(),
                }
            }
        },
    };

    match report {
        RunReport::Published { cells, .. } => {
            println!("{} {} cells appended.", style("✓").green(), cells);
        }
        RunReport::NoRecord => {
            eprintln!("{} No invoice data extracted", style("✗").red());
        }
        RunReport::PublishFailed { reason, .. } => {
            eprintln!("{} Publishing failed: {}", style("✗").red(), reason);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
