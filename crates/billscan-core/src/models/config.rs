//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the billscan pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillscanConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Language model configuration.
    pub llm: LlmConfig,

    /// Heuristic extraction configuration.
    pub extraction: ExtractionConfig,

    /// Translation utility configuration.
    pub translation: TranslationConfig,

    /// Timeout for downloading receipt images, in seconds.
    pub download_timeout_secs: u64,
}

impl Default for BillscanConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            llm: LlmConfig::default(),
            extraction: ExtractionConfig::default(),
            translation: TranslationConfig::default(),
            download_timeout_secs: 30,
        }
    }
}

/// Which OCR engine to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// External `tesseract` binary.
    #[default]
    Tesseract,
    /// Pure Rust ONNX engine (requires the `onnx` feature).
    Onnx,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine used for recognition.
    pub engine: OcrEngineKind,

    /// Path or name of the tesseract executable.
    pub tesseract_binary: String,

    /// Tesseract language hint, `+`-separated.
    pub languages: String,

    /// Tesseract page segmentation mode.
    pub psm: u8,

    /// Override for `TESSDATA_PREFIX`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tessdata_path: Option<PathBuf>,

    /// Maximum image dimension (longer side) for processing.
    pub max_image_size: u32,

    /// Images with a longer side below this are upscaled.
    pub min_image_size: u32,

    /// Directory with ONNX models for the `onnx` engine.
    pub model_dir: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Tesseract,
            tesseract_binary: "tesseract".to_string(),
            languages: "hun+eng".to_string(),
            psm: 6,
            tessdata_path: None,
            max_image_size: 2500,
            min_image_size: 1000,
            model_dir: PathBuf::from("models"),
        }
    }
}

/// Chat-completion endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Allow the language model strategy at all.
    pub enabled: bool,

    /// OpenAI-compatible chat completions URL.
    pub endpoint: String,

    /// Model name.
    pub model: String,

    /// Explicit API key. Never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Resolve the API credential from the config or the environment.
    ///
    /// Empty values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// Heuristic extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Currency assumed when none is detected.
    pub default_currency: String,

    /// Maximum number of items kept per receipt.
    pub max_items: usize,

    /// Item prices at or above this are rejected as misreads.
    pub max_item_price: u32,

    /// Known retail chain names.
    pub merchants: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_currency: "HUF".to_string(),
            max_items: 20,
            max_item_price: 50_000,
            merchants: crate::receipt::rules::merchants::DEFAULT_MERCHANTS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Translation utility configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// MyMemory-compatible endpoint.
    pub endpoint: String,

    /// Language of the source texts.
    pub source_language: String,

    /// Maximum number of cached translations.
    pub cache_capacity: usize,

    /// Texts translated per group in batch mode.
    pub batch_size: usize,

    /// Pause between groups, in milliseconds.
    pub batch_delay_ms: u64,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mymemory.translated.net/get".to_string(),
            source_language: "hu".to_string(),
            cache_capacity: 512,
            batch_size: 5,
            batch_delay_ms: 1000,
            timeout_secs: 30,
        }
    }
}

impl BillscanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: BillscanConfig =
            serde_json::from_str(r#"{"ocr": {"languages": "eng"}}"#).unwrap();

        assert_eq!(config.ocr.languages, "eng");
        assert_eq!(config.ocr.psm, 6);
        assert_eq!(config.extraction.default_currency, "HUF");
        assert_eq!(config.extraction.max_items, 20);
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = BillscanConfig::default();
        config.llm.api_key = Some("sk-secret".to_string());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = LlmConfig {
            api_key: Some("   ".to_string()),
            api_key_env: "BILLSCAN_TEST_UNSET_VARIABLE".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(config.resolve_api_key(), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = BillscanConfig::default();
        config.translation.batch_size = 3;
        config.save(&path).unwrap();

        let loaded = BillscanConfig::from_file(&path).unwrap();
        assert_eq!(loaded.translation.batch_size, 3);
    }
}
