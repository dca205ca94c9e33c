//! Rule-based field extractors for receipt text.

pub mod amounts;
pub mod dates;
pub mod merchants;
pub mod patterns;

pub use amounts::{format_amount, parse_amount, AmountExtractor};
pub use dates::{parse_receipt_date, DateExtractor};
pub use merchants::{MerchantMatcher, DEFAULT_MERCHANTS};
pub use patterns::*;

/// A regex-driven extractor for one kind of receipt field.
pub trait FieldExtractor {
    type Output;

    /// First occurrence in `text`.
    fn extract(&self, text: &str) -> Option<Located<Self::Output>>;

    /// Every occurrence in `text`, left to right.
    fn extract_all(&self, text: &str) -> Vec<Located<Self::Output>>;
}

/// A parsed value and the slice of text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    pub value: T,
    pub matched: String,
}

impl<T> Located<T> {
    pub fn from_match(value: T, m: regex::Match<'_>) -> Self {
        Self {
            value,
            matched: m.as_str().to_string(),
        }
    }
}
