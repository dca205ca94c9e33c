//! Known retail chain detection.

/// Retail chains recognized by default.
pub const DEFAULT_MERCHANTS: &[&str] = &[
    "INTERSPAR", "SPAR", "LIDL", "ALDI", "TESCO", "AUCHAN", "PENNY", "CBA", "COOP",
    "ROSSMANN", "DM", "METRO", "PRIMA", "MÜLLER",
];

/// Number of leading lines searched for a merchant name.
pub const MERCHANT_SCAN_LINES: usize = 5;

/// Case-insensitive substring matcher over chain names.
#[derive(Debug, Clone)]
pub struct MerchantMatcher {
    names: Vec<String>,
}

impl MerchantMatcher {
    /// Build a matcher. Longer names are tried first so that e.g.
    /// INTERSPAR is not reported as SPAR.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_uppercase())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        names.dedup();
        Self { names }
    }

    /// Chain name contained in the line, if any.
    pub fn find_in_line(&self, line: &str) -> Option<&str> {
        let upper = line.to_uppercase();
        self.names
            .iter()
            .find(|name| upper.contains(name.as_str()))
            .map(String::as_str)
    }

    /// First chain found in the leading lines of a receipt.
    pub fn detect<'a, I>(&self, lines: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .take(MERCHANT_SCAN_LINES)
            .find_map(|line| self.find_in_line(line))
            .map(str::to_string)
    }
}

impl Default for MerchantMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MERCHANTS)
    }
}
