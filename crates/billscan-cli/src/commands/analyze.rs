//! Analyze command - extract data from a single receipt image.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use billscan_core::{ImageSource, ParsedReceipt, ReceiptAnalyzer};

use super::config::load_config;
use super::output::{format_receipt, OutputFormat};

/// Arguments for the analyze command.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Receipt image file or http(s) URL
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Use only the rule-based parser
    #[arg(long)]
    no_llm: bool,

    /// Show extraction confidence and validation warnings
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: AnalyzeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let source = ImageSource::parse(&args.input);
    if let ImageSource::Path(path) = &source {
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
    }

    info!("Analyzing receipt: {}", source);

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    let progress = pb.clone();
    let mut analyzer = ReceiptAnalyzer::from_config(&config)?.with_progress(move |percent, stage| {
        progress.set_position(u64::from(percent));
        progress.set_message(stage.to_string());
    });
    if args.no_llm {
        analyzer = analyzer.without_llm();
    }
    debug!(
        "OCR engine: {}, language model: {}",
        analyzer.engine_name(),
        analyzer.has_llm()
    );

    let response = analyzer.analyze(&source).await;
    pb.finish_and_clear();

    let Some(receipt) = response.analysis else {
        anyhow::bail!(
            "{}",
            response.message.as_deref().unwrap_or(billscan_core::ANALYSIS_FAILED)
        );
    };

    write_output(&receipt, args.format, args.output.as_ref())?;

    if args.show_confidence {
        print_confidence(&receipt);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub(crate) fn write_output(
    receipt: &ParsedReceipt,
    format: OutputFormat,
    output: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let rendered = format_receipt(receipt, format)?;

    if let Some(output_path) = output {
        fs::write(output_path, &rendered)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", rendered);
    }

    Ok(())
}

pub(crate) fn print_confidence(receipt: &ParsedReceipt) {
    eprintln!();
    eprintln!(
        "{} Extraction confidence: {:.1}% ({})",
        style("ℹ").blue(),
        receipt.confidence * 100.0,
        receipt.note
    );

    let issues = receipt.validate();
    if !issues.is_empty() {
        eprintln!("{}", style("Validation issues:").yellow());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
    }
}
