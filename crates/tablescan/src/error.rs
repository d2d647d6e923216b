//! Error types for tablescan.
//!
//! Every fallible operation in the library returns [`TablescanError`]:
//!
//! - Use `thiserror` for automatic `Error` trait implementation
//! - Preserve error chains with `#[source]` attributes
//! - Include context in error messages (stage, sizes, config values)
//!
//! # Error Handling Philosophy
//!
//! **System errors MUST always bubble up unchanged:**
//! - `TablescanError::Io` (from `std::io::Error`) - file system and subprocess pipe errors
//!
//! **Application errors are wrapped with context:**
//! - `Decode` - input bytes are not a usable image
//! - `ImageProcessing` - thresholding, morphology, line transform or contour faults
//! - `Ocr` - text recognition failures
//! - `Serialization` - spreadsheet assembly or encoding failures
//! - `Validation` - invalid configuration or parameters
//!
//! Only the orchestrator decides which of these are fatal for a document; the
//! grid detector and the cell OCR engine recover from theirs locally.
use thiserror::Error;

/// Result type alias using `TablescanError`.
pub type Result<T> = std::result::Result<T, TablescanError>;

/// Main error type for all tablescan operations.
#[derive(Debug, Error)]
pub enum TablescanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Image processing error: {message}")]
    ImageProcessing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for TablescanError {
    fn from(err: image::ImageError) -> Self {
        TablescanError::Decode {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for TablescanError {
    fn from(err: serde_json::Error) -> Self {
        TablescanError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for TablescanError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        TablescanError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for TablescanError {
    fn from(err: toml::de::Error) -> Self {
        TablescanError::Validation {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<crate::ocr::OcrError> for TablescanError {
    fn from(err: crate::ocr::OcrError) -> Self {
        TablescanError::Ocr {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl TablescanError {
    error_constructor!(decode, Decode);
    error_constructor!(image_processing, ImageProcessing);
    error_constructor!(ocr, Ocr);
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);
    error_constructor!(cache, Cache);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TablescanError = io_err.into();
        assert!(matches!(err, TablescanError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_decode_error() {
        let err = TablescanError::decode("not an image");
        assert_eq!(err.to_string(), "Decode error: not an image");
    }

    #[test]
    fn test_decode_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad header");
        let err = TablescanError::decode_with_source("not an image", source);
        assert_eq!(err.to_string(), "Decode error: not an image");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_ocr_error() {
        let err = TablescanError::ocr("tesseract exited with status 1");
        assert_eq!(err.to_string(), "OCR error: tesseract exited with status 1");
    }

    #[test]
    fn test_serialization_error() {
        let err = TablescanError::serialization("workbook write failed");
        assert_eq!(err.to_string(), "Serialization error: workbook write failed");
    }

    #[test]
    fn test_image_processing_error() {
        let err = TablescanError::image_processing("empty mask");
        assert_eq!(err.to_string(), "Image processing error: empty mask");
    }

    #[test]
    fn test_image_error_converts_to_decode() {
        let img_err = image::load_from_memory(&[0u8, 1, 2, 3]).unwrap_err();
        let err: TablescanError = img_err.into();
        assert!(matches!(err, TablescanError::Decode { .. }));
    }

    #[test]
    fn test_ocr_subsystem_error_conversion() {
        let err: TablescanError = crate::ocr::OcrError::ProcessingFailed("no output".to_string()).into();
        assert!(matches!(err, TablescanError::Ocr { .. }));
        assert!(err.to_string().contains("no output"));
    }

    #[test]
    fn test_xlsx_error_converts_to_serialization() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let xlsx_err = workbook.add_worksheet().set_name("a/b").err().unwrap();
        let err: TablescanError = xlsx_err.into();
        assert!(matches!(err, TablescanError::Serialization { .. }));
    }

    #[test]
    fn test_toml_error_converts_to_validation() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: TablescanError = toml_err.into();
        assert!(matches!(err, TablescanError::Validation { .. }));
    }

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<Vec<u8>> {
            Ok(std::fs::read("/nonexistent/page.png")?)
        }

        assert!(matches!(read_file().unwrap_err(), TablescanError::Io(_)));
    }
}
