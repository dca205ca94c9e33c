//! Receipt data models shared by both parser strategies.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Merchant value used when no known chain could be identified.
pub const UNKNOWN_MERCHANT: &str = "Unknown";

/// Maximum number of items kept on a parsed receipt.
pub const MAX_ITEMS: usize = 20;

/// Raw OCR output for a single receipt image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptText {
    /// Recognized text, one receipt line per text line.
    text: String,

    /// Engine confidence (0 - 100).
    confidence: f32,
}

impl ReceiptText {
    /// Create a new OCR result. Confidence is clamped to 0 - 100.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// Full recognized text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Engine confidence (0 - 100).
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Trimmed, non-empty lines in reading order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }

    /// True when the OCR engine found no usable text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A single purchased item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    /// Item description as printed.
    pub name: String,

    /// Line price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Number of units, always at least 1.
    pub quantity: u32,
}

impl ReceiptItem {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
            quantity: 1,
        }
    }
}

/// Which strategy produced a [`ParsedReceipt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Language model extraction.
    Llm,
    /// Line-oriented pattern matching.
    Heuristic,
}

impl ParseStrategy {
    /// Provenance note stored on the receipt.
    pub fn note(&self) -> &'static str {
        match self {
            ParseStrategy::Llm => "Parsed by language model",
            ParseStrategy::Heuristic => "Parsed by heuristic fallback",
        }
    }
}

/// Structured receipt record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedReceipt {
    /// Amount paid.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,

    /// Retail chain name or [`UNKNOWN_MERCHANT`].
    pub merchant: String,

    /// Purchase date.
    pub date: NaiveDate,

    /// Purchased items, at most [`MAX_ITEMS`].
    pub items: Vec<ReceiptItem>,

    /// Currency code.
    pub currency: String,

    /// Extraction confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Which strategy produced this record.
    pub note: String,
}

impl ParsedReceipt {
    /// Sum of all item prices times quantities, `None` on overflow.
    pub fn items_total(&self) -> Option<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |sum, item| {
            item.price
                .checked_mul(Decimal::from(item.quantity))
                .and_then(|line| sum.checked_add(line))
        })
    }

    /// True when the merchant is the unknown sentinel.
    pub fn has_unknown_merchant(&self) -> bool {
        self.merchant == UNKNOWN_MERCHANT
    }

    /// Check the record for internal inconsistencies.
    ///
    /// Returns human-readable warnings; an empty list means no issues.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.total_amount.is_zero() {
            issues.push("Total amount could not be determined".to_string());
        }

        if self.has_unknown_merchant() {
            issues.push("Merchant could not be identified".to_string());
        }

        if self.items.is_empty() {
            issues.push("No items were recognized".to_string());
        } else if !self.total_amount.is_zero() {
            match self.items_total() {
                Some(items_total) if items_total != self.total_amount => {
                    issues.push(format!(
                        "Item sum {} differs from total {}",
                        items_total, self.total_amount
                    ));
                }
                Some(_) => {}
                None => issues.push("Item sum is out of range".to_string()),
            }
        }

        issues
    }
}

/// Result handed back to the caller of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Whether a structured result is available.
    pub success: bool,

    /// The parsed receipt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ParsedReceipt>,

    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnalysisResponse {
    pub fn ok(analysis: ParsedReceipt) -> Self {
        Self {
            success: true,
            analysis: Some(analysis),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            analysis: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> ParsedReceipt {
        ParsedReceipt {
            total_amount: Decimal::from(450),
            merchant: "LIDL".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            items: vec![ReceiptItem::new("Tej 2L", Decimal::from(450))],
            currency: "HUF".to_string(),
            confidence: 0.9,
            note: ParseStrategy::Heuristic.note().to_string(),
        }
    }

    #[test]
    fn test_receipt_text_clamps_confidence() {
        assert_eq!(ReceiptText::new("x", 140.0).confidence(), 100.0);
        assert_eq!(ReceiptText::new("x", -3.0).confidence(), 0.0);
        assert_eq!(ReceiptText::new("x", f32::NAN).confidence(), 0.0);
    }

    #[test]
    fn test_receipt_text_lines() {
        let text = ReceiptText::new("  LIDL \n\n   \nTej 2L 450\n", 90.0);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["LIDL", "Tej 2L 450"]);
        assert!(ReceiptText::new(" \n ", 50.0).is_blank());
    }

    #[test]
    fn test_serializes_camel_case_with_numbers() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["totalAmount"], serde_json::json!(450.0));
        assert_eq!(json["date"], "2024-03-15");
        assert_eq!(json["items"][0]["price"], serde_json::json!(450.0));
        assert_eq!(json["items"][0]["quantity"], 1);
        assert_eq!(json["note"], "Parsed by heuristic fallback");
    }

    #[test]
    fn test_validate_consistent_receipt() {
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_mismatch() {
        let mut receipt = sample();
        receipt.items.push(ReceiptItem::new("Kenyér", Decimal::from_str("299.90").unwrap()));

        let issues = receipt.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("differs"));
    }

    #[test]
    fn test_validate_reports_item_sum_overflow() {
        let mut receipt = sample();
        let price = Decimal::from_str("50000000000000000000000000000").unwrap();
        let mut item = ReceiptItem::new("Tej", price);
        item.quantity = 2;
        receipt.items = vec![item];

        assert_eq!(receipt.items_total(), None);
        assert_eq!(receipt.validate(), vec!["Item sum is out of range".to_string()]);
    }

    #[test]
    fn test_failed_response_omits_analysis() {
        let json = serde_json::to_value(AnalysisResponse::failed("Receipt analysis failed")).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("analysis").is_none());
        assert_eq!(json["message"], "Receipt analysis failed");
    }
}
