//! Common regex patterns for receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Amount token: dot-grouped thousands with comma decimals, space-grouped
/// thousands, or plain digits with optional `,`/`.` decimals.
const AMOUNT: &str = r"\d{1,3}(?:\.\d{3})+,\d{1,2}|\d{1,3}(?:[ \u{00a0}]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?";

lazy_static! {
    // Amounts (1 234,56 / 1234.56 / 450)
    pub static ref AMOUNT_PATTERN: Regex = Regex::new(AMOUNT).unwrap();

    // "<name> <price>" with the price at the end of the line
    pub static ref ITEM_LINE: Regex = Regex::new(
        &format!(r"^(.+?)\s+({AMOUNT})$")
    ).unwrap();

    // Total keywords (Hungarian and English)
    pub static ref TOTAL_KEYWORD: Regex = Regex::new(
        r"(?i)összesen|végösszeg|fizetendő|összeg|total|\bsum\b"
    ).unwrap();

    // Receipt title and fiscal header lines
    pub static ref TITLE_KEYWORD: Regex = Regex::new(
        r"(?i)nyugta|blokk|receipt|adószám|\bnav\b"
    ).unwrap();

    // YYYY.MM.DD or DD.MM.YYYY, `.` or `,` separated, spaces allowed around separators
    pub static ref DATE_PATTERN: Regex = Regex::new(
        r"\b(\d{4})[ \t]*[.,][ \t]*(\d{1,2})[ \t]*[.,][ \t]*(\d{1,2})\b|\b(\d{1,2})[ \t]*[.,][ \t]*(\d{1,2})[ \t]*[.,][ \t]*(\d{4})\b"
    ).unwrap();

    // ISO dates as returned by the language model
    pub static ref ISO_DATE: Regex = Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_keyword_is_case_insensitive() {
        assert!(TOTAL_KEYWORD.is_match("ÖSSZESEN 450"));
        assert!(TOTAL_KEYWORD.is_match("Fizetendő: 1 200"));
        assert!(TOTAL_KEYWORD.is_match("TOTAL 12.99"));
        assert!(!TOTAL_KEYWORD.is_match("Tej 2L 450"));
    }

    #[test]
    fn test_item_line_splits_trailing_price() {
        let caps = ITEM_LINE.captures("Tej 2L 450").unwrap();
        assert_eq!(&caps[1], "Tej 2L");
        assert_eq!(&caps[2], "450");

        let caps = ITEM_LINE.captures("Sajt trappista 1 299,90").unwrap();
        assert_eq!(&caps[1], "Sajt trappista");
        assert_eq!(&caps[2], "1 299,90");
    }

    #[test]
    fn test_amount_pattern_dot_grouping() {
        let m = AMOUNT_PATTERN.find("Total: 12.345,67").unwrap();
        assert_eq!(m.as_str(), "12.345,67");

        let m = AMOUNT_PATTERN.find("Milch 1.29").unwrap();
        assert_eq!(m.as_str(), "1.29");
    }

    #[test]
    fn test_item_line_requires_price_at_end() {
        assert!(ITEM_LINE.captures("450 Tej").is_none());
        assert!(ITEM_LINE.captures("Kenyér").is_none());
    }
}
