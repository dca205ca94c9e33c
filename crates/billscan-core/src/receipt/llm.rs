//! Language model receipt parser.
//!
//! The model is asked for a JSON object with a fixed schema, but its answer
//! is treated as untyped: [`coerce_receipt`] defaults every field on its own
//! so a non-conforming response still yields a complete record.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::LlmError;
use crate::models::config::{ExtractionConfig, LlmConfig};
use crate::models::receipt::{
    ParseStrategy, ParsedReceipt, ReceiptItem, ReceiptText, MAX_ITEMS, UNKNOWN_MERCHANT,
};

use super::rules::{parse_amount, parse_receipt_date};
use super::today;

const SYSTEM_PROMPT: &str = "You extract structured data from shopping receipts. \
Answer with a single JSON object and nothing else.";

/// Confidence assumed when the model does not report one.
const DEFAULT_MODEL_CONFIDENCE: f32 = 0.5;

/// Transport for chat-completion requests returning JSON text.
pub trait CompletionClient {
    /// Send the prompts and return the raw content of the model answer.
    fn complete_json(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// Client for OpenAI-compatible chat completion endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl OpenAiClient {
    /// Create a client. Fails with [`LlmError::MissingCredential`] when no
    /// API key can be resolved.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.resolve_api_key().ok_or(LlmError::MissingCredential)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| LlmError::Network(err.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }
}

impl CompletionClient for OpenAiClient {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let payload = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ]
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Network(err.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(LlmError::Auth),
            StatusCode::TOO_MANY_REQUESTS => return Err(LlmError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::InvalidResponse(format!(
                    "status {status} body {body}"
                )));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;

        body.get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("missing message content".to_string()))
    }
}

/// Values used for fields the model leaves out.
#[derive(Debug, Clone)]
pub struct ReceiptDefaults {
    pub currency: String,
    pub max_items: usize,
}

impl ReceiptDefaults {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            currency: config.default_currency.clone(),
            max_items: config.max_items.min(MAX_ITEMS),
        }
    }
}

impl Default for ReceiptDefaults {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

/// Receipt parser backed by a chat-completion model.
pub struct LlmParser<C> {
    client: C,
    defaults: ReceiptDefaults,
}

impl<C: CompletionClient> LlmParser<C> {
    pub fn new(client: C, defaults: ReceiptDefaults) -> Self {
        Self { client, defaults }
    }

    /// Ask the model to structure the OCR text.
    pub async fn parse(&self, receipt: &ReceiptText) -> Result<ParsedReceipt, LlmError> {
        if receipt.is_blank() {
            return Err(LlmError::InvalidResponse("no OCR text to parse".to_string()));
        }

        info!("Sending {} characters of OCR text to the model", receipt.text().len());

        let content = self
            .client
            .complete_json(SYSTEM_PROMPT, &build_prompt(receipt.text()))
            .await?;

        let value: Value = serde_json::from_str(strip_code_fence(&content))
            .map_err(|err| LlmError::InvalidResponse(format!("model output not JSON: {err}")))?;

        if !value.is_object() {
            return Err(LlmError::InvalidResponse(
                "model output is not a JSON object".to_string(),
            ));
        }

        let parsed = coerce_receipt(&value, &self.defaults);
        debug!(
            "Model parse: merchant={}, total={}, {} items",
            parsed.merchant,
            parsed.total_amount,
            parsed.items.len()
        );

        Ok(parsed)
    }
}

/// Instruction sent with every receipt.
pub fn build_prompt(ocr_text: &str) -> String {
    format!(
        r#"Extract the data of this shopping receipt. The text comes from OCR and may contain errors.

Return JSON with exactly these fields:
{{
  "totalAmount": number,
  "merchant": string,
  "date": "YYYY-MM-DD",
  "items": [{{"name": string, "price": number, "quantity": integer}}],
  "currency": string,
  "confidence": number between 0 and 1
}}

Rules:
- The total is on the line with ÖSSZESEN, FIZETENDŐ, VÉGÖSSZEG or TOTAL.
- Known merchants: LIDL, ALDI, SPAR, INTERSPAR, TESCO, AUCHAN, PENNY, CBA, COOP, ROSSMANN, DM, METRO, PRIMA, MÜLLER. Use "{UNKNOWN_MERCHANT}" if none is found.
- Dates like 2024.03.15 or 15.03.2024 must be converted to 2024-03-15.
- Prices are plain numbers without currency or thousand separators; "1 234,56" is 1234.56.
- List at most {MAX_ITEMS} items.
- Currency defaults to HUF.

Receipt text:
{ocr_text}"#
    )
}

/// Build a fully typed receipt from an untyped model answer.
pub fn coerce_receipt(value: &Value, defaults: &ReceiptDefaults) -> ParsedReceipt {
    let total_amount = field(value, &["totalAmount", "total_amount", "total"])
        .and_then(as_amount)
        .unwrap_or(Decimal::ZERO);

    let merchant = field(value, &["merchant", "store"])
        .and_then(as_text)
        .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string());

    let date = field(value, &["date"])
        .and_then(Value::as_str)
        .and_then(parse_receipt_date)
        .unwrap_or_else(today);

    let mut items: Vec<ReceiptItem> = field(value, &["items"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_item).collect())
        .unwrap_or_default();
    items.truncate(defaults.max_items);

    let currency = field(value, &["currency"])
        .and_then(as_text)
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| defaults.currency.clone());

    let confidence = field(value, &["confidence"])
        .and_then(as_confidence)
        .unwrap_or(DEFAULT_MODEL_CONFIDENCE);

    ParsedReceipt {
        total_amount,
        merchant,
        date,
        items,
        currency,
        confidence,
        note: ParseStrategy::Llm.note().to_string(),
    }
}

fn coerce_item(value: &Value) -> Option<ReceiptItem> {
    let name = field(value, &["name", "description"]).and_then(as_text)?;
    let price = field(value, &["price", "amount"])
        .and_then(as_amount)
        .unwrap_or(Decimal::ZERO);
    let quantity = field(value, &["quantity", "qty"])
        .and_then(as_quantity)
        .unwrap_or(1);

    Some(ReceiptItem {
        name,
        price,
        quantity,
    })
}

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(*key)).filter(|v| !v.is_null())
}

fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-negative amount from a JSON number or a formatted string.
fn as_amount(value: &Value) -> Option<Decimal> {
    let amount = match value {
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .ok()?
        }
        Value::String(s) if s.trim_start().starts_with('-') => return None,
        Value::String(s) => parse_amount(s)?,
        _ => return None,
    };
    (amount >= Decimal::ZERO).then_some(amount)
}

fn as_quantity(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|q| *q > 0)
}

/// Confidence in 0 - 1, clamped before narrowing to `f32`.
fn as_confidence(value: &Value) -> Option<f32> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then(|| f.clamp(0.0, 1.0) as f32)
}

/// Remove a Markdown code fence some models wrap JSON in.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedClient {
        answer: Result<String, ()>,
        calls: AtomicUsize,
    }

    impl CannedClient {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CompletionClient for CannedClient {
        async fn complete_json(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(user.contains("Receipt text:"));
            self.answer
                .clone()
                .map_err(|_| LlmError::Network("connection refused".to_string()))
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_coerce_complete_answer() {
        let value = json!({
            "totalAmount": 1299.5,
            "merchant": "SPAR",
            "date": "2024-03-15",
            "items": [{"name": "Sajt", "price": "1 299,50", "quantity": 1}],
            "currency": "huf",
            "confidence": 0.93
        });

        let receipt = coerce_receipt(&value, &ReceiptDefaults::default());

        assert_eq!(receipt.total_amount, dec("1299.5"));
        assert_eq!(receipt.merchant, "SPAR");
        assert_eq!(receipt.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(receipt.items, vec![ReceiptItem::new("Sajt", dec("1299.50"))]);
        assert_eq!(receipt.currency, "HUF");
        assert!((receipt.confidence - 0.93).abs() < 1e-6);
        assert_eq!(receipt.note, ParseStrategy::Llm.note());
    }

    #[test]
    fn test_coerce_defaults_every_field() {
        let value = json!({
            "totalAmount": "n/a",
            "merchant": 42,
            "date": "sometime",
            "items": "none",
            "confidence": 7
        });

        let receipt = coerce_receipt(&value, &ReceiptDefaults::default());

        assert_eq!(receipt.total_amount, Decimal::ZERO);
        assert_eq!(receipt.merchant, UNKNOWN_MERCHANT);
        assert_eq!(receipt.date, today());
        assert!(receipt.items.is_empty());
        assert_eq!(receipt.currency, "HUF");
        assert_eq!(receipt.confidence, 1.0);
    }

    #[test]
    fn test_coerce_huge_confidence_clamps() {
        let receipt = coerce_receipt(&json!({"confidence": 1e300}), &ReceiptDefaults::default());
        assert_eq!(receipt.confidence, 1.0);

        let receipt = coerce_receipt(&json!({"confidence": "-2.5"}), &ReceiptDefaults::default());
        assert_eq!(receipt.confidence, 0.0);
    }

    #[test]
    fn test_oversized_model_answer_validates_without_panic() {
        let value = json!({
            "totalAmount": 1,
            "merchant": "LIDL",
            "items": [{"name": "Tej", "price": 5e28, "quantity": 2}]
        });

        let receipt = coerce_receipt(&value, &ReceiptDefaults::default());

        assert_eq!(receipt.items.len(), 1);
        assert!(receipt.validate().iter().any(|issue| issue.contains("out of range")));
    }

    #[test]
    fn test_coerce_item_fields() {
        let value = json!({
            "items": [
                {"name": "Tej", "price": -3, "quantity": 0},
                {"name": "Kenyér", "price": 299, "quantity": 2.0},
                {"price": 100},
                {"name": "  ", "price": 100}
            ],
            "confidence": -1
        });

        let receipt = coerce_receipt(&value, &ReceiptDefaults::default());

        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[0].price, Decimal::ZERO);
        assert_eq!(receipt.items[0].quantity, 1);
        assert_eq!(receipt.items[1].quantity, 2);
        assert_eq!(receipt.confidence, 0.0);
    }

    #[test]
    fn test_coerce_caps_items() {
        let items: Vec<Value> = (0..35).map(|i| json!({"name": format!("Item {i}"), "price": i})).collect();
        let receipt = coerce_receipt(&json!({ "items": items }), &ReceiptDefaults::default());
        assert_eq!(receipt.items.len(), MAX_ITEMS);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence(" {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_parse_uses_client_answer() {
        let client = CannedClient::answering(r#"{"totalAmount": 450, "merchant": "LIDL"}"#);
        let parser = LlmParser::new(client, ReceiptDefaults::default());

        let receipt = parser
            .parse(&ReceiptText::new("LIDL\nÖSSZESEN 450", 90.0))
            .await
            .unwrap();

        assert_eq!(receipt.total_amount, dec("450"));
        assert_eq!(receipt.merchant, "LIDL");
        assert_eq!(parser.client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parse_rejects_non_json() {
        let parser = LlmParser::new(
            CannedClient::answering("I could not read this receipt."),
            ReceiptDefaults::default(),
        );

        let result = parser.parse(&ReceiptText::new("LIDL", 90.0)).await;
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_parse_skips_blank_text() {
        let parser = LlmParser::new(CannedClient::answering("{}"), ReceiptDefaults::default());

        assert!(parser.parse(&ReceiptText::new("  ", 90.0)).await.is_err());
        assert_eq!(parser.client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = CannedClient {
            answer: Err(()),
            calls: AtomicUsize::new(0),
        };
        let parser = LlmParser::new(client, ReceiptDefaults::default());

        let result = parser.parse(&ReceiptText::new("LIDL", 90.0)).await;
        assert!(matches!(result, Err(LlmError::Network(_))));
    }

    #[test]
    fn test_missing_credential() {
        let config = LlmConfig {
            api_key: None,
            api_key_env: "BILLSCAN_TEST_UNSET_VARIABLE".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiClient::from_config(&config),
            Err(LlmError::MissingCredential)
        ));
    }
}
