//! Amount extraction for receipts.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::AMOUNT_PATTERN;
use super::{FieldExtractor, Located};

/// Amount field extractor.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Largest amount in the text, if any.
    pub fn max(&self, text: &str) -> Option<Decimal> {
        self.extract_all(text).into_iter().map(|m| m.value).max()
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = Decimal;

    fn extract(&self, text: &str) -> Option<Located<Decimal>> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Located<Decimal>> {
        AMOUNT_PATTERN
            .find_iter(text)
            .filter_map(|m| parse_amount(m.as_str()).map(|amount| Located::from_match(amount, m)))
            .collect()
    }
}

/// Parse a receipt-formatted amount (e.g. "1 234,56", "49.99", "450 Ft").
///
/// Grouping spaces are dropped and a comma decimal mark becomes a dot.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else if cleaned.contains(',') && cleaned.contains('.') {
        // Whichever mark comes last is the decimal separator
        match (cleaned.rfind(','), cleaned.rfind('.')) {
            (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
            _ => cleaned.replace(',', ""),
        }
    } else {
        cleaned
    };

    Decimal::from_str(&normalized).ok()
}

/// Format an amount with space-grouped thousands (1 234,56).
///
/// Whole amounts are printed without decimals.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let s = if rounded.fract().is_zero() {
        format!("{}", rounded.trunc().normalize())
    } else {
        format!("{:.2}", rounded)
    };

    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (s.as_str(), None),
    };

    let (sign, digits) = match integer_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer_part),
    };

    let chars: Vec<char> = digits.chars().collect();
    let mut formatted = String::from(sign);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(' ');
        }
        formatted.push(*c);
    }

    match decimal_part {
        Some(d) => format!("{},{}", formatted, d),
        None => formatted,
    }
}
