//! The text-recognition seam.
//!
//! The pipeline never talks to an OCR engine directly. Everything goes
//! through [`TextRecognizer`], so the Tesseract backends, and the fakes the
//! tests use, are interchangeable.

use std::sync::Arc;

use image::GrayImage;

use super::types::PSMMode;
use crate::core::config::OcrConfig;
use crate::error::{Result, TablescanError};

/// Recognizes the text in a grayscale image.
///
/// Implementations are shared across threads and called concurrently for
/// different documents, so they must not keep per-call state.
pub trait TextRecognizer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Raw recognized text; callers trim and clean it.
    fn recognize(&self, image: &GrayImage, mode: PSMMode) -> Result<String>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image: &GrayImage, mode: PSMMode) -> Result<String> {
        (**self).recognize(image, mode)
    }
}

/// Builds the backend named in `config.backend`.
pub fn recognizer_from_config(config: &OcrConfig) -> Result<Arc<dyn TextRecognizer>> {
    match config.backend.as_str() {
        #[cfg(feature = "tokio-runtime")]
        "tesseract-cli" => Ok(Arc::new(super::tesseract_cli::TesseractCommand::from_config(config)?)),
        #[cfg(not(feature = "tokio-runtime"))]
        "tesseract-cli" => Err(TablescanError::MissingDependency(
            "Tesseract subprocess backend requires the 'tokio-runtime' feature".to_string(),
        )),
        #[cfg(feature = "tesseract")]
        "tesseract" => Ok(Arc::new(super::tesseract_backend::TesseractBackend::from_config(config)?)),
        #[cfg(not(feature = "tesseract"))]
        "tesseract" => Err(TablescanError::MissingDependency(
            "Native Tesseract backend requires the 'tesseract' feature".to_string(),
        )),
        other => Err(TablescanError::validation(format!(
            "Unknown OCR backend '{}'. Expected 'tesseract-cli' or 'tesseract'",
            other
        ))),
    }
}
