//! Translate command - translate texts through the configured service.

use clap::Args;
use tracing::info;

use billscan_core::CachedTranslator;

use super::config::load_config;

/// Arguments for the translate command.
#[derive(Args)]
pub struct TranslateArgs {
    /// Texts to translate
    #[arg(required = true)]
    texts: Vec<String>,

    /// Target language code (e.g. "en")
    #[arg(short, long)]
    to: String,

    /// Source language code (default from config)
    #[arg(long)]
    from: Option<String>,
}

pub async fn run(args: TranslateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut translator = CachedTranslator::from_config(&config.translation)?;
    if let Some(from) = args.from {
        translator = translator.with_source_language(from);
    }

    info!("Translating {} texts to {}", args.texts.len(), args.to);
    let results = translator.translate_batch(&args.texts, &args.to).await;

    for translated in results {
        println!("{}", translated);
    }

    Ok(())
}
