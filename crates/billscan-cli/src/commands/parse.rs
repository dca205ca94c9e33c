//! Parse command - run the rule-based parser on extracted text.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;

use billscan_core::{HeuristicParser, ReceiptText};

use super::analyze::{print_confidence, write_output};
use super::config::load_config;
use super::output::OutputFormat;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file with OCR output, or `-` for stdin
    #[arg(required = true)]
    input: String,

    /// OCR confidence (0-100) to assume for the text
    #[arg(long, default_value = "90")]
    ocr_confidence: f32,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show extraction confidence and validation warnings
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let text = if args.input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.input, e))?
    };

    let parser = HeuristicParser::from_config(&config.extraction);
    let receipt = parser.parse(&ReceiptText::new(text, args.ocr_confidence));

    write_output(&receipt, args.format, args.output.as_ref())?;

    if args.show_confidence {
        print_confidence(&receipt);
    }

    Ok(())
}
