//! Core library for receipt OCR and expense extraction.
//!
//! This crate provides:
//! - Image acquisition from URLs, files and memory
//! - OCR through the tesseract CLI (or a pure Rust ONNX engine)
//! - Receipt parsing with a chat-completion model and a rule-based fallback
//! - A cached, rate-paced translation utility

pub mod error;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod receipt;
pub mod source;
pub mod translate;

pub use error::{BillscanError, Result};
pub use models::config::BillscanConfig;
pub use models::receipt::{AnalysisResponse, ParseStrategy, ParsedReceipt, ReceiptItem, ReceiptText};
pub use ocr::{create_recognizer, TesseractEngine, TextRecognizer};
#[cfg(feature = "onnx")]
pub use ocr::PureOcrEngine;
pub use pipeline::{ReceiptAnalyzer, ANALYSIS_FAILED};
pub use receipt::{CompletionClient, HeuristicParser, LlmParser, OpenAiClient};
pub use source::{ImageLoader, ImageSource};
pub use translate::{CachedTranslator, MyMemoryClient, TranslationCache, Translator};
