//! Tesseract OCR engine (CLI wrapper).

use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::models::receipt::ReceiptText;

use super::preprocessing::ImagePreprocessor;
use super::TextRecognizer;

/// Tesseract word rows have this level in TSV output.
const WORD_LEVEL: i32 = 5;

/// Runs the `tesseract` executable and reads its TSV output.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: String,
    languages: String,
    psm: u8,
    tessdata_path: Option<PathBuf>,
    preprocessor: ImagePreprocessor,
    version: String,
}

impl TesseractEngine {
    /// Create an engine, checking that the binary can be executed.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let version = tesseract_version(&config.tesseract_binary)?;
        info!("Using tesseract {} ({})", version, config.languages);

        Ok(Self {
            binary: config.tesseract_binary.clone(),
            languages: config.languages.clone(),
            psm: config.psm,
            tessdata_path: config.tessdata_path.clone(),
            preprocessor: ImagePreprocessor::from_config(config),
            version,
        })
    }

    /// Reported tesseract version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<ReceiptText, OcrError> {
        let start = Instant::now();
        let prepared = self.preprocessor.prepare(image);

        let input = tempfile::Builder::new()
            .prefix("billscan-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Preprocessing(format!("failed to create temp file: {}", e)))?;
        prepared
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::Preprocessing(format!("failed to write image: {}", e)))?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv");
        if let Some(tessdata) = &self.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata);
        }

        debug!(
            "Running {} {} stdout -l {} --psm {} tsv",
            self.binary,
            input.path().display(),
            self.languages,
            self.psm
        );

        let output = cmd
            .output()
            .map_err(|e| OcrError::EngineUnavailable(format!("{}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Execution(stderr.trim().to_string()));
        }

        let result = parse_tsv(&String::from_utf8_lossy(&output.stdout))?;

        info!(
            "OCR complete: {} lines, confidence {:.1}, {}ms",
            result.lines().count(),
            result.confidence(),
            start.elapsed().as_millis()
        );

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

/// Rebuild text lines and mean word confidence from tesseract TSV.
fn parse_tsv(tsv: &str) -> Result<ReceiptText, OcrError> {
    let mut rows = tsv.lines();
    match rows.next() {
        Some(header) if header.starts_with("level") => {}
        Some(_) => return Err(OcrError::Output("missing TSV header".to_string())),
        None => return Ok(ReceiptText::new("", 0.0)),
    }

    let mut lines: Vec<((u32, u32, u32, u32), Vec<&str>)> = Vec::new();
    let mut confidence_sum = 0.0f32;
    let mut word_count = 0usize;

    for row in rows {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let level: i32 = cols[0].parse().unwrap_or(-1);
        let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols[11].trim();

        if level != WORD_LEVEL || conf < 0.0 || text.is_empty() {
            continue;
        }

        let key = (
            cols[1].parse().unwrap_or(0),
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );

        match lines.last_mut() {
            Some((last_key, words)) if *last_key == key => words.push(text),
            _ => lines.push((key, vec![text])),
        }

        confidence_sum += conf;
        word_count += 1;
    }

    let text = lines
        .iter()
        .map(|(_, words)| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n");
    let confidence = if word_count == 0 {
        0.0
    } else {
        confidence_sum / word_count as f32
    };

    Ok(ReceiptText::new(text, confidence))
}

/// Query the tesseract version, failing if the binary cannot run.
pub fn tesseract_version(binary: &str) -> Result<String, OcrError> {
    let output = Command::new(binary)
        .arg("--version")
        .output()
        .map_err(|e| OcrError::EngineUnavailable(format!("{}: {}", binary, e)))?;

    if !output.status.success() {
        return Err(OcrError::EngineUnavailable(format!(
            "{} --version exited with {}",
            binary, output.status
        )));
    }

    // Older releases print the version on stderr
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let version = stdout
        .lines()
        .chain(stderr.lines())
        .find(|line| line.to_lowercase().contains("tesseract"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(version)
}
