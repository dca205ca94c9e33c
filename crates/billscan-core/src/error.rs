//! Error types for the billscan-core library.

use thiserror::Error;

/// Main error type for the billscan library.
#[derive(Error, Debug)]
pub enum BillscanError {
    /// Image acquisition error.
    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Language model parsing error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Translation error.
    #[error("translation error: {0}")]
    Translate(#[from] TranslateError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while fetching or decoding the receipt image.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("download failed with status {0}")]
    Status(u16),

    /// Reading a local file failed.
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a supported image.
    #[error("failed to decode image: {0}")]
    Decode(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine is not installed or cannot be started.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine ran but reported failure.
    #[error("OCR execution failed: {0}")]
    Execution(String),

    /// The engine output could not be interpreted.
    #[error("unexpected OCR output: {0}")]
    Output(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),
}

/// Errors from the language model strategy. None of these abort a request.
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API credential is configured.
    #[error("no API credential configured")]
    MissingCredential,

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The provider rejected the credential.
    #[error("provider rejected the API credential")]
    Auth,

    /// The provider throttled the request.
    #[error("provider rate limit reached")]
    RateLimited,

    /// The response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from the translation service.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("translation service returned status {0}")]
    Status(u16),

    /// The response did not contain a translation.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for the billscan library.
pub type Result<T> = std::result::Result<T, BillscanError>;
