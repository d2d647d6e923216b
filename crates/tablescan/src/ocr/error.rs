use std::fmt;

/// Errors raised by OCR backends before they reach the pipeline.
#[derive(Debug, Clone)]
pub enum OcrError {
    TesseractInitializationFailed(String),
    TesseractNotFound(String),
    InvalidConfiguration(String),
    InvalidLanguageCode(String),
    ImageProcessingFailed(String),
    ProcessingFailed(String),
    Timeout(u64),
}

impl fmt::Display for OcrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TesseractInitializationFailed(msg) => {
                write!(f, "Tesseract initialization failed: {}", msg)
            }
            Self::TesseractNotFound(msg) => write!(f, "Tesseract executable not found: {}", msg),
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::InvalidLanguageCode(msg) => write!(f, "Invalid language code: {}", msg),
            Self::ImageProcessingFailed(msg) => write!(f, "Image processing failed: {}", msg),
            Self::ProcessingFailed(msg) => write!(f, "OCR processing failed: {}", msg),
            Self::Timeout(secs) => write!(f, "OCR timed out after {}s", secs),
        }
    }
}

impl std::error::Error for OcrError {}

// No From<std::io::Error>: IO errors bubble up as TablescanError::Io.
