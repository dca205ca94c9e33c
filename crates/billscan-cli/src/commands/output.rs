//! Rendering of parsed receipts.

use billscan_core::ParsedReceipt;
use billscan_core::receipt::rules::format_amount;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
    /// CSV with one row per item
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
            OutputFormat::Csv => "csv",
        }
    }
}

pub fn format_receipt(receipt: &ParsedReceipt, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(receipt)?),
        OutputFormat::Text => Ok(format_text(receipt)),
        OutputFormat::Csv => format_csv(receipt),
    }
}

fn format_csv(receipt: &ParsedReceipt) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["merchant", "date", "item", "quantity", "price", "currency"])?;

    for item in &receipt.items {
        wtr.write_record([
            receipt.merchant.as_str(),
            &receipt.date.to_string(),
            &item.name,
            &item.quantity.to_string(),
            &item.price.to_string(),
            &receipt.currency,
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(receipt: &ParsedReceipt) -> String {
    let mut output = String::new();

    output.push_str(&format!("Merchant: {}\n", receipt.merchant));
    output.push_str(&format!("Date: {}\n", receipt.date));
    output.push('\n');

    if !receipt.items.is_empty() {
        output.push_str("Items:\n");
        for item in &receipt.items {
            let name = if item.quantity > 1 {
                format!("{} x{}", item.name, item.quantity)
            } else {
                item.name.clone()
            };
            output.push_str(&format!(
                "  {:<32} {:>12} {}\n",
                name,
                format_amount(item.price),
                receipt.currency
            ));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Total: {} {}\n",
        format_amount(receipt.total_amount),
        receipt.currency
    ));
    output.push_str(&format!("Source: {}\n", receipt.note));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use billscan_core::receipt::rules::parse_amount;
    use billscan_core::{ParseStrategy, ReceiptItem};
    use chrono::NaiveDate;

    fn sample() -> ParsedReceipt {
        let amount = |s: &str| parse_amount(s).unwrap();
        ParsedReceipt {
            total_amount: amount("1450"),
            merchant: "LIDL".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            items: vec![
                ReceiptItem::new("Tej 2L", amount("450")),
                ReceiptItem::new("Sajt, trappista", amount("1000")),
            ],
            currency: "HUF".to_string(),
            confidence: 0.9,
            note: ParseStrategy::Heuristic.note().to_string(),
        }
    }

    #[test]
    fn test_text_output() {
        let text = format_receipt(&sample(), OutputFormat::Text).unwrap();
        assert!(text.contains("Merchant: LIDL"));
        assert!(text.contains("Total: 1 450 HUF"));
    }

    #[test]
    fn test_csv_output() {
        let csv = format_receipt(&sample(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "merchant,date,item,quantity,price,currency");
        assert_eq!(lines[2], "LIDL,2024-03-15,\"Sajt, trappista\",1,1000,HUF");
    }
}
