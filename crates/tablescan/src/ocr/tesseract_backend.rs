//! Native Tesseract backend through `kreuzberg-tesseract`.
//!
//! A fresh `TesseractAPI` handle is initialized per call, so the backend is
//! `Send + Sync` without any locking and documents never share engine state.

use std::env;
use std::path::{Path, PathBuf};

use image::GrayImage;
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};

use super::error::OcrError;
use super::recognizer::TextRecognizer;
use super::types::PSMMode;
use super::utils::is_valid_language;
use crate::Result;
use crate::core::config::OcrConfig;

const FALLBACK_TESSDATA_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    r#"C:\Program Files\Tesseract-OCR\tessdata"#,
    r#"C:\ProgramData\Tesseract-OCR\tessdata"#,
];

#[derive(Debug, Clone)]
pub struct TesseractBackend {
    language: String,
    tessdata: String,
}

impl TesseractBackend {
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        if !is_valid_language(&config.language) {
            return Err(OcrError::InvalidLanguageCode(config.language.clone()).into());
        }

        let tessdata = resolve_tessdata(config.tessdata_dir.as_deref());

        // A missing traineddata file crashes the engine instead of failing init.
        if !tessdata.is_empty() {
            for lang in config.language.split('+') {
                let traineddata = Path::new(&tessdata).join(format!("{}.traineddata", lang));
                if !traineddata.exists() {
                    return Err(OcrError::TesseractInitializationFailed(format!(
                        "Language '{}' not found. Traineddata file does not exist: {}",
                        lang,
                        traineddata.display()
                    ))
                    .into());
                }
            }
        }

        tracing::debug!(tessdata = %tessdata, language = %config.language, "Native Tesseract backend ready");

        Ok(Self {
            language: config.language.clone(),
            tessdata,
        })
    }
}

/// Explicit directory, then `TESSDATA_PREFIX`, then the first well-known
/// install path that exists. Empty when nothing is found, which lets the
/// engine use its compiled-in default.
fn resolve_tessdata(explicit: Option<&Path>) -> String {
    explicit
        .map(|p| p.display().to_string())
        .or_else(|| env::var("TESSDATA_PREFIX").ok())
        .or_else(|| {
            FALLBACK_TESSDATA_PATHS
                .iter()
                .find(|p| PathBuf::from(p).exists())
                .map(|p| (*p).to_string())
        })
        .unwrap_or_default()
}

impl TextRecognizer for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage, mode: PSMMode) -> Result<String> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(
                OcrError::ImageProcessingFailed(format!("Cannot recognize a {}x{} image", width, height)).into(),
            );
        }

        let api = TesseractAPI::new();
        api.init(&self.tessdata, &self.language).map_err(|e| {
            OcrError::TesseractInitializationFailed(format!(
                "Failed to initialize language '{}': {}",
                self.language, e
            ))
        })?;

        api.set_page_seg_mode(TessPageSegMode::from_int(mode.as_u8() as i32))
            .map_err(|e| OcrError::InvalidConfiguration(format!("Failed to set PSM mode: {}", e)))?;

        api.set_image(image.as_raw(), width as i32, height as i32, 1, width as i32)
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to set image: {}", e)))?;

        api.recognize()
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to recognize text: {}", e)))?;

        let text = api
            .get_utf8_text()
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to extract text: {}", e)))?;
        Ok(text)
    }
}
