//! End-to-end receipt analysis: acquire, recognize, parse.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::models::config::BillscanConfig;
use crate::models::receipt::{AnalysisResponse, ParsedReceipt, ReceiptText};
use crate::ocr::{create_recognizer, TextRecognizer};
use crate::receipt::{CompletionClient, HeuristicParser, LlmParser, OpenAiClient, ReceiptDefaults};
use crate::source::{ImageLoader, ImageSource};

/// Message returned for any acquisition or OCR failure.
pub const ANALYSIS_FAILED: &str = "Receipt analysis failed";

/// Observer for pipeline progress (percentage, stage description).
pub type ProgressCallback = Box<dyn Fn(u8, &str) + Send + Sync>;

/// Receipt analysis pipeline.
///
/// The language model parser is optional; when it is absent or fails the
/// heuristic parser produces the result.
pub struct ReceiptAnalyzer<R, C> {
    loader: ImageLoader,
    recognizer: R,
    llm: Option<LlmParser<C>>,
    heuristic: HeuristicParser,
    progress: Option<ProgressCallback>,
}

impl ReceiptAnalyzer<Box<dyn TextRecognizer>, OpenAiClient> {
    /// Wire the configured OCR engine and, when a credential is available,
    /// the chat-completion client.
    pub fn from_config(config: &BillscanConfig) -> Result<Self> {
        let loader = ImageLoader::from_config(config)?;
        let recognizer = create_recognizer(&config.ocr)?;
        let heuristic = HeuristicParser::from_config(&config.extraction);

        let analyzer = Self::new(loader, recognizer, heuristic);
        Ok(match llm_from_config(config) {
            Some(llm) => analyzer.with_llm(llm),
            None => analyzer,
        })
    }
}

/// Language model parser, if enabled and a credential resolves.
fn llm_from_config(config: &BillscanConfig) -> Option<LlmParser<OpenAiClient>> {
    if !config.llm.enabled {
        debug!("Language model disabled by configuration");
        return None;
    }

    match OpenAiClient::from_config(&config.llm) {
        Ok(client) => Some(LlmParser::new(
            client,
            ReceiptDefaults::from_config(&config.extraction),
        )),
        Err(e) => {
            info!("Language model disabled: {}", e);
            None
        }
    }
}

impl<R: TextRecognizer, C: CompletionClient> ReceiptAnalyzer<R, C> {
    /// Create a pipeline without a language model.
    pub fn new(loader: ImageLoader, recognizer: R, heuristic: HeuristicParser) -> Self {
        Self {
            loader,
            recognizer,
            llm: None,
            heuristic,
            progress: None,
        }
    }

    /// Use a language model parser before the heuristic fallback.
    pub fn with_llm(mut self, llm: LlmParser<C>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Drop the language model parser.
    pub fn without_llm(mut self) -> Self {
        self.llm = None;
        self
    }

    /// Observe progress events.
    pub fn with_progress(mut self, callback: impl Fn(u8, &str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Whether a language model parser is configured.
    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Name of the OCR engine in use.
    pub fn engine_name(&self) -> &'static str {
        self.recognizer.name()
    }

    /// Run the full pipeline on one image.
    pub async fn analyze(&self, source: &ImageSource) -> AnalysisResponse {
        let start = Instant::now();
        info!("Analyzing receipt: {}", source);

        self.report(10, "Loading image");
        let image = match self.loader.load(source).await {
            Ok(image) => image,
            Err(e) => {
                error!("Failed to acquire {}: {}", source, e);
                return AnalysisResponse::failed(ANALYSIS_FAILED);
            }
        };

        self.report(30, "Running OCR");
        let text = match self.recognizer.recognize(&image) {
            Ok(text) => text,
            Err(e) => {
                error!("OCR failed ({}): {}", self.recognizer.name(), e);
                return AnalysisResponse::failed(ANALYSIS_FAILED);
            }
        };
        self.report(60, "OCR complete");

        self.report(70, "Extracting receipt data");
        let receipt = self.analyze_text(&text).await;
        self.report(100, "Done");

        info!("Receipt analyzed in {}ms", start.elapsed().as_millis());
        AnalysisResponse::ok(receipt)
    }

    /// Parse already recognized text. Never fails.
    pub async fn analyze_text(&self, text: &ReceiptText) -> ParsedReceipt {
        if let Some(llm) = &self.llm {
            if text.is_blank() {
                debug!("OCR text is blank, skipping language model");
            } else {
                match llm.parse(text).await {
                    Ok(receipt) => return receipt,
                    Err(e) => warn!("Language model parse failed, using heuristics: {}", e),
                }
            }
        }

        self.heuristic.parse(text)
    }

    fn report(&self, percent: u8, stage: &str) {
        debug!("Progress {}%: {}", percent, stage);
        if let Some(callback) = &self.progress {
            callback(percent, stage);
        }
    }
}
