//! Line-oriented pattern matching parser.
//!
//! This is the fallback strategy: it accepts any text, including empty or
//! garbled OCR output, and always produces a [`ParsedReceipt`].

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::config::ExtractionConfig;
use crate::models::receipt::{
    ParseStrategy, ParsedReceipt, ReceiptItem, ReceiptText, MAX_ITEMS, UNKNOWN_MERCHANT,
};

use super::rules::{
    AmountExtractor, DateExtractor, MerchantMatcher, ITEM_LINE, TITLE_KEYWORD, TOTAL_KEYWORD,
    parse_amount,
};
use super::today;

/// Lines shorter than this are never items.
const MIN_ITEM_LINE_CHARS: usize = 5;

/// Item names must be longer than this.
const MIN_ITEM_NAME_CHARS: usize = 2;

const PENALTY_NO_TOTAL: f32 = 0.5;
const PENALTY_NO_ITEMS: f32 = 0.7;
const PENALTY_NO_MERCHANT: f32 = 0.8;

/// Rule-based receipt parser.
#[derive(Debug, Clone)]
pub struct HeuristicParser {
    merchants: MerchantMatcher,
    default_currency: String,
    max_items: usize,
    max_item_price: Decimal,
}

impl HeuristicParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Create a parser from extraction settings.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            merchants: MerchantMatcher::new(&config.merchants),
            default_currency: config.default_currency.clone(),
            max_items: config.max_items.min(MAX_ITEMS),
            max_item_price: Decimal::from(config.max_item_price),
        }
    }

    /// Set the currency reported on every receipt.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Replace the known merchant list.
    pub fn with_merchants(mut self, merchants: MerchantMatcher) -> Self {
        self.merchants = merchants;
        self
    }

    /// Parse OCR text into a receipt. Never fails.
    pub fn parse(&self, receipt: &ReceiptText) -> ParsedReceipt {
        let lines: Vec<&str> = receipt.lines().collect();

        let merchant = self.merchants.detect(lines.iter().copied());
        let mut total_amount = self.extract_total(&lines);
        let date = self.extract_date(&lines).unwrap_or_else(today);
        let items = self.extract_items(&lines, merchant.as_deref());

        if total_amount.is_zero() && !items.is_empty() {
            total_amount = items.iter().map(|i| i.price).sum();
        }

        let confidence = score(
            receipt.confidence(),
            total_amount.is_zero(),
            items.is_empty(),
            merchant.is_none(),
        );

        debug!(
            "Heuristic parse: merchant={:?}, total={}, {} items, confidence {:.2}",
            merchant,
            total_amount,
            items.len(),
            confidence
        );

        ParsedReceipt {
            total_amount,
            merchant: merchant.unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
            date,
            items,
            currency: self.default_currency.clone(),
            confidence,
            note: ParseStrategy::Heuristic.note().to_string(),
        }
    }

    /// Total from keyword lines. Each matching line overwrites the previous
    /// candidate with its largest amount, so the last such line wins.
    fn extract_total(&self, lines: &[&str]) -> Decimal {
        let amounts = AmountExtractor::new();
        let mut total = Decimal::ZERO;

        for line in lines.iter().filter(|l| TOTAL_KEYWORD.is_match(l)) {
            if let Some(max) = amounts.max(line) {
                total = max;
            }
        }

        total
    }

    fn extract_date(&self, lines: &[&str]) -> Option<chrono::NaiveDate> {
        let dates = DateExtractor::new();
        lines.iter().filter_map(|line| dates.extract_last(line)).last()
    }

    fn extract_items(&self, lines: &[&str], merchant: Option<&str>) -> Vec<ReceiptItem> {
        let mut items: Vec<ReceiptItem> = lines
            .iter()
            .filter(|line| !self.is_excluded(line, merchant))
            .filter_map(|line| self.parse_item(line))
            .collect();

        items.truncate(self.max_items);
        items
    }

    fn is_excluded(&self, line: &str, merchant: Option<&str>) -> bool {
        line.chars().count() < MIN_ITEM_LINE_CHARS
            || TOTAL_KEYWORD.is_match(line)
            || TITLE_KEYWORD.is_match(line)
            || merchant.is_some_and(|m| line.to_uppercase().contains(m))
    }

    fn parse_item(&self, line: &str) -> Option<ReceiptItem> {
        let caps = ITEM_LINE.captures(line)?;
        let name = caps[1].trim();
        let price = parse_amount(&caps[2])?;

        if price <= Decimal::ZERO || price >= self.max_item_price {
            return None;
        }
        if name.chars().count() <= MIN_ITEM_NAME_CHARS {
            return None;
        }

        Some(ReceiptItem::new(name, price))
    }
}

impl Default for HeuristicParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Confidence from the OCR score, reduced for every missing field.
fn score(ocr_confidence: f32, no_total: bool, no_items: bool, no_merchant: bool) -> f32 {
    let mut confidence = ocr_confidence / 100.0;
    if no_total {
        confidence *= PENALTY_NO_TOTAL;
    }
    if no_items {
        confidence *= PENALTY_NO_ITEMS;
    }
    if no_merchant {
        confidence *= PENALTY_NO_MERCHANT;
    }
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn parse(text: &str, confidence: f32) -> ParsedReceipt {
        HeuristicParser::new().parse(&ReceiptText::new(text, confidence))
    }

    #[test]
    fn test_simple_lidl_receipt() {
        let receipt = parse("LIDL\nTej 2L 450\nÖSSZESEN 450", 90.0);

        assert_eq!(receipt.merchant, "LIDL");
        assert_eq!(receipt.items, vec![ReceiptItem::new("Tej 2L", dec("450"))]);
        assert_eq!(receipt.total_amount, dec("450"));
        assert!((receipt.confidence - 0.9).abs() < 1e-6);
        assert_eq!(receipt.currency, "HUF");
        assert_eq!(receipt.note, ParseStrategy::Heuristic.note());
    }

    #[test]
    fn test_empty_input() {
        let receipt = parse("", 80.0);

        assert_eq!(receipt.total_amount, Decimal::ZERO);
        assert_eq!(receipt.merchant, UNKNOWN_MERCHANT);
        assert!(receipt.items.is_empty());
        assert_eq!(receipt.date, today());
        // 0.8 * 0.5 * 0.7 * 0.8
        assert!((receipt.confidence - 0.224).abs() < 1e-6);
    }

    #[test]
    fn test_garbled_input_never_panics() {
        for text in ["\u{0}\u{1}", "||||", "1 2 3 4 5 6 7", "ÖSSZESEN", ",,,...", "💥 99999999999999999999999999999999"] {
            let receipt = parse(text, 100.0);
            assert!((0.0..=1.0).contains(&receipt.confidence));
            assert!(receipt.items.len() <= MAX_ITEMS);
        }
    }

    #[test]
    fn test_missing_total_is_backfilled() {
        let receipt = parse("SPAR\nKenyér 10\nVaj 250g 20\nAlma 1kg 5", 100.0);

        assert_eq!(receipt.items.len(), 3);
        assert_eq!(receipt.total_amount, dec("35"));
        assert!((receipt.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_total_no_items_penalty() {
        let receipt = parse("TESCO\nKöszönjük a vásárlást!", 100.0);

        assert_eq!(receipt.total_amount, Decimal::ZERO);
        assert!((receipt.confidence - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_last_total_line_wins() {
        let receipt = parse("ALDI\nÖSSZESEN 1 990\nBankkártya\nFIZETENDŐ 1 985", 100.0);
        assert_eq!(receipt.total_amount, dec("1985"));
    }

    #[test]
    fn test_largest_amount_on_total_line() {
        let receipt = parse("ALDI\nÖSSZESEN 3 db 1 299,50", 100.0);
        assert_eq!(receipt.total_amount, dec("1299.50"));
    }

    #[test]
    fn test_date_normalization() {
        let receipt = parse("PENNY\n2024.03.15 10:22", 90.0);
        assert_eq!(receipt.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

        let receipt = parse("PENNY\n15.03.2024", 90.0);
        assert_eq!(receipt.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn test_item_filters() {
        let text = "LIDL Budapest 1\nNYUGTA 0001\nAb 99\nX 5\nTej 0\nDrága tévé 99 999\nSajt 1 299,90\nÖSSZESEN 1 299,90";
        let receipt = parse(text, 90.0);

        assert_eq!(receipt.items, vec![ReceiptItem::new("Sajt", dec("1299.90"))]);
    }

    #[test]
    fn test_items_capped_after_scanning_all_lines() {
        let text: String = (1..=30)
            .map(|i| format!("Termék-{} {}", i, i * 10 + 100))
            .collect::<Vec<_>>()
            .join("\n");
        let receipt = parse(&text, 90.0);

        assert_eq!(receipt.items.len(), MAX_ITEMS);
        assert_eq!(receipt.items[0].name, "Termék-1");
        assert_eq!(receipt.items[19].name, "Termék-20");
    }

    #[test]
    fn test_custom_currency() {
        let parser = HeuristicParser::new().with_currency("EUR");
        let receipt = parser.parse(&ReceiptText::new("ALDI\nMilch 1,29", 90.0));

        assert_eq!(receipt.currency, "EUR");
        assert_eq!(receipt.items[0].price, dec("1.29"));
    }
}
