//! Text recognition.
//!
//! The pipeline depends only on the [`TextRecognizer`] trait. Two Tesseract
//! backends implement it:
//!
//! - `TesseractCommand`: spawns the `tesseract` executable, behind the
//!   `tokio-runtime` feature (on by default)
//! - `TesseractBackend`: native bindings, behind the `tesseract` feature
//!
//! [`CellOcrEngine`] layers cropping, trimming, failure recovery and the
//! optional [`RecognitionCache`] on top of a recognizer.

pub mod cache;
pub mod cell;
pub mod error;
pub mod recognizer;
#[cfg(feature = "tesseract")]
pub mod tesseract_backend;
#[cfg(feature = "tokio-runtime")]
pub mod tesseract_cli;
pub mod types;
pub mod utils;

pub use cache::{CacheKey, CacheStats, RecognitionCache};
pub use cell::{CellOcrEngine, CellTexts};
pub use error::OcrError;
pub use recognizer::{TextRecognizer, recognizer_from_config};
#[cfg(feature = "tesseract")]
pub use tesseract_backend::TesseractBackend;
#[cfg(feature = "tokio-runtime")]
pub use tesseract_cli::TesseractCommand;
pub use types::PSMMode;
pub use utils::strip_control_characters;
