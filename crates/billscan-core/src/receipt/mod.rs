//! Receipt parsing strategies.

mod heuristic;
pub mod llm;
pub mod rules;

pub use heuristic::HeuristicParser;
pub use llm::{coerce_receipt, CompletionClient, LlmParser, OpenAiClient, ReceiptDefaults};

use chrono::NaiveDate;

/// Current local date, used when a receipt date cannot be read.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
