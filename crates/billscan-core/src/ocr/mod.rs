//! OCR stage: turns a receipt image into [`ReceiptText`].

mod preprocessing;
#[cfg(feature = "onnx")]
mod pure_engine;
mod tesseract;

pub use preprocessing::ImagePreprocessor;
#[cfg(feature = "onnx")]
pub use pure_engine::PureOcrEngine;
pub use tesseract::{tesseract_version, TesseractEngine};

use image::DynamicImage;

use crate::error::OcrError;
use crate::models::config::{OcrConfig, OcrEngineKind};
use crate::models::receipt::ReceiptText;

/// An OCR engine producing text lines and a 0 - 100 confidence.
pub trait TextRecognizer {
    /// Recognize the text of a receipt image.
    fn recognize(&self, image: &DynamicImage) -> Result<ReceiptText, OcrError>;

    /// Engine name for logs and reports.
    fn name(&self) -> &'static str;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn recognize(&self, image: &DynamicImage) -> Result<ReceiptText, OcrError> {
        (**self).recognize(image)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Build the engine selected in the configuration.
pub fn create_recognizer(config: &OcrConfig) -> Result<Box<dyn TextRecognizer>, OcrError> {
    match config.engine {
        OcrEngineKind::Tesseract => Ok(Box::new(TesseractEngine::new(config)?)),
        #[cfg(feature = "onnx")]
        OcrEngineKind::Onnx => Ok(Box::new(PureOcrEngine::from_dir(&config.model_dir, config)?)),
        #[cfg(not(feature = "onnx"))]
        OcrEngineKind::Onnx => Err(OcrError::EngineUnavailable(
            "built without the `onnx` feature".to_string(),
        )),
    }
}
