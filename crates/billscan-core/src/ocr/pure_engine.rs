//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::models::receipt::ReceiptText;

use super::preprocessing::ImagePreprocessor;
use super::TextRecognizer;

/// Height of a text row when ordering regions, in pixels.
const ROW_HEIGHT: f64 = 20.0;

/// OCR engine backed by `pure-onnx-ocr` (no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    preprocessor: ImagePreprocessor,
}

impl PureOcrEngine {
    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path, config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine,
            // Binarized input suits the detection model better than raw photos
            preprocessor: ImagePreprocessor::from_config(config).with_binarization(true),
        })
    }
}

impl TextRecognizer for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<ReceiptText, OcrError> {
        let start = Instant::now();
        let prepared = DynamicImage::ImageRgb8(self.preprocessor.prepare(image).to_rgb8());
        let (width, height) = prepared.dimensions();

        debug!("Running pure-onnx-ocr on {}x{}", width, height);

        let results = self
            .engine
            .run_from_image(&prepared)
            .map_err(|e| OcrError::Execution(format!("pure-onnx-ocr: {}", e)))?;

        let mut regions: Vec<(f64, f64, String, f32)> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                (x, y, r.text.replace("[UNK]", " ").trim().to_string(), r.confidence)
            })
            .filter(|(_, _, text, _)| !text.is_empty())
            .collect();

        // Reading order: rows top to bottom, then left to right
        regions.sort_by(|a, b| {
            let row_a = (a.1 / ROW_HEIGHT) as i64;
            let row_b = (b.1 / ROW_HEIGHT) as i64;
            row_a
                .cmp(&row_b)
                .then(a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines: Vec<(i64, Vec<&str>)> = Vec::new();
        for (_, y, text, _) in &regions {
            let row = (*y / ROW_HEIGHT) as i64;
            match lines.last_mut() {
                Some((last_row, words)) if *last_row == row => words.push(text.as_str()),
                _ => lines.push((row, vec![text.as_str()])),
            }
        }

        let text = lines
            .iter()
            .map(|(_, words)| words.join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        let confidence = if regions.is_empty() {
            0.0
        } else {
            regions.iter().map(|r| r.3).sum::<f32>() / regions.len() as f32 * 100.0
        };

        info!(
            "OCR complete: {} text regions in {}ms",
            regions.len(),
            start.elapsed().as_millis()
        );

        Ok(ReceiptText::new(text, confidence))
    }

    fn name(&self) -> &'static str {
        "pure-onnx-ocr"
    }
}

/// Smallest x and y of a region polygon.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| (x.min(c.x), y.min(c.y)))
}
