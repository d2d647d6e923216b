//! Tablescan - scanned pages to spreadsheets
//!
//! Tablescan decides whether a page image contains a ruled table. If it does,
//! the table's cells are located and recognized one by one into a bordered
//! XLSX sheet; otherwise the whole page is recognized and written one text
//! line per row.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tablescan::{Orchestrator, Outcome, TablescanConfig};
//!
//! # fn main() -> tablescan::Result<()> {
//! let orchestrator = Orchestrator::from_config(TablescanConfig::default())?;
//! let bytes = std::fs::read("invoice.jpg")?;
//! if let Outcome::Success { filename, spreadsheet, has_grid, .. } = orchestrator.process(&bytes, "invoice") {
//!     println!("{} (table: {})", filename, has_grid);
//!     std::fs::write(filename, spreadsheet)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Vision** (`vision`): decoding, thresholding, morphology, line transform, contours
//! - **Grid** (`grid`): grid detection and cell segmentation
//! - **OCR** (`ocr`): the `TextRecognizer` seam, Tesseract backends, per-cell recognition
//! - **Spreadsheet** (`spreadsheet`): sheet assembly and XLSX serialization
//! - **Core** (`core`): orchestration, batch processing, configuration

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod grid;
pub mod ocr;
pub mod spreadsheet;
pub mod types;
pub mod vision;

pub use error::{Result, TablescanError};

pub use types::*;

pub use core::batch::DocumentInput;
#[cfg(feature = "tokio-runtime")]
pub use core::batch::batch_process;
pub use core::config::TablescanConfig;
pub use core::pipeline::{Orchestrator, PipelineStage};

pub use grid::{CellSegmenter, GridAnalysis, GridDetector};
pub use ocr::{CellOcrEngine, PSMMode, TextRecognizer};
pub use spreadsheet::{BorderStyle, SpreadsheetBuilder, SpreadsheetDocument, TextLineSpreadsheetBuilder};
pub use vision::ImageDecoder;
