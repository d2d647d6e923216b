//! Pipeline orchestration.
//!
//! - **Pipeline**: [`Orchestrator`] sequences decoding, grid detection, cell
//!   segmentation, OCR and spreadsheet building for one document
//! - **Batch**: parallel processing of many documents (rayon, and tokio with
//!   the `tokio-runtime` feature)
//! - **Configuration**: [`TablescanConfig`] loading, discovery and validation
//!
//! # Example
//!
//! ```rust,no_run
//! use tablescan::core::config::TablescanConfig;
//! use tablescan::core::pipeline::Orchestrator;
//! use tablescan::Outcome;
//!
//! # fn example() -> tablescan::Result<()> {
//! let orchestrator = Orchestrator::from_config(TablescanConfig::default())?;
//! let bytes = std::fs::read("scan.png")?;
//! match orchestrator.process(&bytes, "scan") {
//!     Outcome::Success { filename, spreadsheet, .. } => std::fs::write(filename, spreadsheet)?,
//!     Outcome::NoTextExtracted => println!("nothing found"),
//!     Outcome::Error { message } => eprintln!("{}", message),
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod pipeline;

#[cfg(feature = "tokio-runtime")]
pub use batch::batch_process;
pub use batch::DocumentInput;
pub use config::{GridDetectionConfig, OcrConfig, OutputConfig, SegmentationConfig, TablescanConfig};
pub use pipeline::{Orchestrator, PipelineStage, StageTracker};
