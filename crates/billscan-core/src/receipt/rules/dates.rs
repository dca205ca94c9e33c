//! Date extraction for receipts.

use chrono::NaiveDate;

use super::patterns::{DATE_PATTERN, ISO_DATE};
use super::{FieldExtractor, Located};

/// Date field extractor.
///
/// Accepts year-first (`2024.03.15`) and day-first (`15.03.2024`) forms
/// with `.` or `,` separators. Matches that are not real calendar dates
/// are dropped.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// The last valid date in the text.
    pub fn extract_last(&self, text: &str) -> Option<NaiveDate> {
        self.extract_all(text).pop().map(|m| m.value)
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = NaiveDate;

    fn extract(&self, text: &str) -> Option<Located<NaiveDate>> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Located<NaiveDate>> {
        let mut results = Vec::new();

        for caps in DATE_PATTERN.captures_iter(text) {
            let (year, month, day) = if let Some(year) = caps.get(1) {
                (year.as_str(), &caps[2], &caps[3])
            } else {
                (&caps[6], &caps[5], &caps[4])
            };

            if let (Some(date), Some(whole)) = (ymd(year, month, day), caps.get(0)) {
                results.push(Located::from_match(date, whole));
            }
        }

        results
    }
}

/// Parse a date as printed on a receipt or returned by the model.
///
/// ISO (`2024-03-15`) is tried first, then the receipt forms.
pub fn parse_receipt_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(caps) = ISO_DATE.captures(s) {
        if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
            return Some(date);
        }
    }
    DateExtractor::new().extract(s).map(|m| m.value)
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_first() {
        let extractor = DateExtractor::new();
        assert_eq!(extractor.extract_last("2024.03.15"), Some(date(2024, 3, 15)));
        assert_eq!(extractor.extract_last("2024. 03. 15. 14:22"), Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_day_first() {
        let extractor = DateExtractor::new();
        assert_eq!(extractor.extract_last("15.03.2024"), Some(date(2024, 3, 15)));
        assert_eq!(extractor.extract_last("15,03,2024"), Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_last_match_wins() {
        let text = "Nyitva: 2023.01.02\nVásárlás: 2024.03.15 10:41";
        assert_eq!(DateExtractor::new().extract_last(text), Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_invalid_calendar_date_ignored() {
        assert_eq!(DateExtractor::new().extract_last("2024.13.45"), None);
        assert_eq!(DateExtractor::new().extract_last("Tej 2L 450"), None);
    }

    #[test]
    fn test_parse_receipt_date() {
        assert_eq!(parse_receipt_date("2024-03-15"), Some(date(2024, 3, 15)));
        assert_eq!(parse_receipt_date("15.03.2024"), Some(date(2024, 3, 15)));
        assert_eq!(parse_receipt_date("yesterday"), None);
    }
}
