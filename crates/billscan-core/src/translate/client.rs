//! MyMemory translation API client.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::TranslateError;
use crate::models::config::TranslationConfig;

use super::Translator;

/// Client for the MyMemory `get` endpoint.
#[derive(Debug, Clone)]
pub struct MyMemoryClient {
    http: reqwest::Client,
    endpoint: String,
}

impl MyMemoryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &TranslationConfig) -> Result<Self, TranslateError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

impl Translator for MyMemoryClient {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let langpair = format!("{}|{}", source, target);
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[("q", text), ("langpair", langpair.as_str())],
        )
        .map_err(|e| TranslateError::Network(format!("invalid endpoint: {}", e)))?;

        debug!("Translating {} characters ({})", text.len(), langpair);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

        extract_translation(&body)
    }
}

/// Read `responseData.translatedText`, honouring the in-body status code.
fn extract_translation(body: &Value) -> Result<String, TranslateError> {
    let status = match body.get("responseStatus") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    if let Some(code) = status.filter(|code| *code != 200) {
        let detail = body
            .get("responseDetails")
            .and_then(Value::as_str)
            .unwrap_or("no details");
        return Err(TranslateError::InvalidResponse(format!(
            "status {}: {}",
            code, detail
        )));
    }

    body.pointer("/responseData/translatedText")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TranslateError::InvalidResponse("missing translatedText".to_string()))
}
