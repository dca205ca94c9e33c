//! Text translation through a rate-limited public API.
//!
//! [`CachedTranslator`] wraps any [`Translator`] with a bounded cache and
//! batch pacing. Failures never surface to the caller: the original text is
//! returned instead.

mod cache;
mod client;

pub use cache::TranslationCache;
pub use client::MyMemoryClient;

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::TranslateError;
use crate::models::config::TranslationConfig;

/// A translation backend.
pub trait Translator {
    /// Translate `text` from `source` to `target` (ISO 639-1 codes).
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send;
}

/// Translator with an owned cache and paced batch mode.
pub struct CachedTranslator<T> {
    inner: T,
    cache: TranslationCache,
    source_language: String,
    batch_size: usize,
    batch_delay: Duration,
}

impl CachedTranslator<MyMemoryClient> {
    pub fn from_config(config: &TranslationConfig) -> Result<Self, TranslateError> {
        Ok(Self::new(MyMemoryClient::from_config(config)?, config))
    }
}

impl<T: Translator> CachedTranslator<T> {
    pub fn new(inner: T, config: &TranslationConfig) -> Self {
        Self {
            inner,
            cache: TranslationCache::new(config.cache_capacity),
            source_language: config.source_language.clone(),
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// Override the source language.
    pub fn with_source_language(mut self, source: impl Into<String>) -> Self {
        self.source_language = source.into();
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Translate one text. Blank text is returned as is; on failure the
    /// original text is returned and nothing is cached.
    pub async fn translate(&mut self, text: &str, target: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        if let Some(hit) = self.cache.get(text, target) {
            debug!("Translation cache hit");
            return hit.to_string();
        }

        match self
            .inner
            .translate(text, &self.source_language, target)
            .await
        {
            Ok(translated) => {
                self.cache.insert(text, target, translated.clone());
                translated
            }
            Err(e) => {
                warn!("Translation to {} failed, keeping original: {}", target, e);
                text.to_string()
            }
        }
    }

    /// Translate many texts in groups, pausing between groups.
    /// The output has the same order as the input.
    pub async fn translate_batch<S: AsRef<str>>(&mut self, texts: &[S], target: &str) -> Vec<String> {
        let mut results = Vec::with_capacity(texts.len());

        for (index, group) in texts.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                debug!("Waiting {:?} before next translation group", self.batch_delay);
                tokio::time::sleep(self.batch_delay).await;
            }
            for text in group {
                results.push(self.translate(text.as_ref(), target).await);
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct UpperTranslator {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Translator for UpperTranslator {
        async fn translate(
            &self,
            text: &str,
            source: &str,
            target: &str,
        ) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TranslateError::Status(429));
            }
            Ok(format!("{}>{}:{}", source, target, text.to_uppercase()))
        }
    }

    fn config(batch_size: usize, batch_delay_ms: u64) -> TranslationConfig {
        TranslationConfig {
            batch_size,
            batch_delay_ms,
            ..TranslationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_translate_uses_cache() {
        let inner = UpperTranslator::default();
        let mut translator = CachedTranslator::new(inner.clone(), &config(5, 0));

        assert_eq!(translator.translate("tej", "en").await, "hu>en:TEJ");
        assert_eq!(translator.translate("tej", "en").await, "hu>en:TEJ");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        translator.translate("tej", "de").await;
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(translator.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_text_not_sent() {
        let inner = UpperTranslator::default();
        let mut translator = CachedTranslator::new(inner.clone(), &config(5, 0));

        assert_eq!(translator.translate("  ", "en").await, "  ");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_returns_original_uncached() {
        let inner = UpperTranslator {
            fail: true,
            ..UpperTranslator::default()
        };
        let mut translator = CachedTranslator::new(inner.clone(), &config(5, 0));

        assert_eq!(translator.translate("kenyér", "en").await, "kenyér");
        assert_eq!(translator.translate("kenyér", "en").await, "kenyér");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(translator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_custom_source_language() {
        let mut translator =
            CachedTranslator::new(UpperTranslator::default(), &config(5, 0)).with_source_language("de");
        assert_eq!(translator.translate("milch", "en").await, "de>en:MILCH");
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_keeps_order_and_paces_groups() {
        let inner = UpperTranslator::default();
        let mut translator = CachedTranslator::new(inner.clone(), &config(2, 1000));
        let texts = ["a", "b", "c", "d", "e"];

        let start = tokio::time::Instant::now();
        let results = translator.translate_batch(&texts, "en").await;

        assert_eq!(
            results,
            vec!["hu>en:A", "hu>en:B", "hu>en:C", "hu>en:D", "hu>en:E"]
        );
        assert_eq!(inner.calls.load(Ordering::SeqCst), 5);
        // three groups, two pauses
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_batch_of_nothing() {
        let mut translator = CachedTranslator::new(UpperTranslator::default(), &config(5, 1000));
        let texts: Vec<String> = Vec::new();
        assert!(translator.translate_batch(&texts, "en").await.is_empty());
    }
}
