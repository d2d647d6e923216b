//! Per-document orchestration.
//!
//! One call to [`Orchestrator::process`] walks a document through a fixed
//! sequence of stages:
//!
//! ```text
//! Idle -> Decoding -> Detecting -> GridExtraction -> Building -> Done
//!                              \-> TextFallback  -/
//! ```
//!
//! `Detecting` covers the full-page OCR pass and the grid decision. A page
//! with no grid and no text stops at `Detecting -> Done` with
//! [`Outcome::NoTextExtracted`]. Any stage may end in `Failed`; no stage is
//! entered twice.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::config::TablescanConfig;
use crate::error::{Result, TablescanError};
use crate::grid::{CellSegmenter, GridDetector};
use crate::ocr::{CacheStats, CellOcrEngine, PSMMode, RecognitionCache, TextRecognizer, recognizer_from_config};
use crate::spreadsheet::{SpreadsheetBuilder, TextLineSpreadsheetBuilder};
use crate::types::{ExtractionResult, Outcome, RasterImage, output_filename};
use crate::vision::ImageDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Decoding,
    Detecting,
    GridExtraction,
    TextFallback,
    Building,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Decoding)
            | (Decoding, Detecting)
            | (Detecting, GridExtraction)
            | (Detecting, TextFallback)
            | (Detecting, Done)
            | (GridExtraction, Building)
            | (TextFallback, Building)
            | (Building, Done) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Decoding => "decoding",
            PipelineStage::Detecting => "detecting",
            PipelineStage::GridExtraction => "grid extraction",
            PipelineStage::TextFallback => "text fallback",
            PipelineStage::Building => "building",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage history of one document run.
#[derive(Debug, Clone)]
pub struct StageTracker {
    document: String,
    history: Vec<PipelineStage>,
}

impl StageTracker {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            history: vec![PipelineStage::Idle],
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.history.last().copied().unwrap_or(PipelineStage::Idle)
    }

    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: PipelineStage) -> Result<()> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(TablescanError::Other(format!(
                "Illegal pipeline transition {} -> {} for '{}'",
                current, next, self.document
            )));
        }
        tracing::debug!(document = %self.document, from = %current, to = %next, "Pipeline stage");
        self.history.push(next);
        Ok(())
    }

    /// Records a failure in the current stage and returns that stage.
    pub fn fail(&mut self) -> PipelineStage {
        let stage = self.current();
        if !stage.is_terminal() {
            self.history.push(PipelineStage::Failed);
        }
        stage
    }
}

/// Runs documents through decode, detection, OCR and spreadsheet building.
///
/// Holds only read-only state (configuration, stage components, an optional
/// thread-safe recognition cache), so one instance can serve any number of
/// documents concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<TablescanConfig>,
    detector: GridDetector,
    segmenter: CellSegmenter,
    ocr: CellOcrEngine,
    cache: Option<Arc<RecognitionCache>>,
    table_builder: SpreadsheetBuilder,
    text_builder: TextLineSpreadsheetBuilder,
}

impl Orchestrator {
    pub fn new(config: TablescanConfig, recognizer: Arc<dyn TextRecognizer>) -> Result<Self> {
        config.validate()?;

        let cell_mode = PSMMode::from_u8(config.ocr.cell_psm).map_err(TablescanError::validation)?;
        let page_mode = PSMMode::from_u8(config.ocr.page_psm).map_err(TablescanError::validation)?;
        let cache = config
            .ocr
            .use_cache
            .then(|| Arc::new(RecognitionCache::with_capacity(config.ocr.cache_capacity)));

        let mut ocr = CellOcrEngine::new(recognizer).with_modes(cell_mode, page_mode);
        if let Some(cache) = &cache {
            ocr = ocr.with_cache(Arc::clone(cache));
        }

        Ok(Self {
            detector: GridDetector::new(config.grid.clone()),
            segmenter: CellSegmenter::new(config.grid.clone(), config.segmentation.clone()),
            ocr,
            cache,
            table_builder: SpreadsheetBuilder::new(
                config.output.table_sheet_title.as_str(),
                config.output.border_style,
            ),
            text_builder: TextLineSpreadsheetBuilder::new(config.output.text_sheet_title.as_str()),
            config: Arc::new(config),
        })
    }

    /// Uses the OCR backend named in the configuration.
    pub fn from_config(config: TablescanConfig) -> Result<Self> {
        let recognizer = recognizer_from_config(&config.ocr)?;
        Self::new(config, recognizer)
    }

    pub fn config(&self) -> &TablescanConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Processes one document. Never fails and never panics: every fault
    /// becomes [`Outcome::Error`] naming the stage it happened in.
    #[cfg_attr(feature = "otel", tracing::instrument(
        skip(self, image_bytes),
        fields(
            document.name = document_name,
            document.size_bytes = image_bytes.len(),
        )
    ))]
    pub fn process(&self, image_bytes: &[u8], document_name: &str) -> Outcome {
        let mut tracker = StageTracker::new(document_name);
        let result = catch_unwind(AssertUnwindSafe(|| self.run(image_bytes, document_name, &mut tracker)));

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                let stage = tracker.fail();
                tracing::warn!(document = document_name, stage = %stage, error = %e, "Document failed");
                Outcome::error(format!("{} failed: {}", stage, e))
            }
            Err(panic) => {
                let stage = tracker.fail();
                let detail = panic_message(panic.as_ref());
                tracing::warn!(document = document_name, stage = %stage, panic = %detail, "Document stage panicked");
                Outcome::error(format!("{} panicked: {}", stage, detail))
            }
        }
    }

    /// Like [`process`](Self::process) for base64 or data-URL encoded images.
    pub fn process_base64(&self, encoded: &str, document_name: &str) -> Outcome {
        let mut tracker = StageTracker::new(document_name);
        let decoded = tracker
            .advance(PipelineStage::Decoding)
            .and_then(|_| ImageDecoder::decode_base64(encoded));
        match decoded {
            Ok(image) => self.process_image(image, document_name),
            Err(e) => {
                tracker.fail();
                Outcome::error(format!("{} failed: {}", PipelineStage::Decoding, e))
            }
        }
    }

    /// Processes an already decoded page under `document_name`.
    pub fn process_image(&self, image: RasterImage, document_name: &str) -> Outcome {
        let mut tracker = StageTracker::new(document_name);
        let result = catch_unwind(AssertUnwindSafe(|| {
            tracker.advance(PipelineStage::Decoding)?;
            self.run_decoded(&image, document_name, &mut tracker)
        }));
        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => Outcome::error(format!("{} failed: {}", tracker.fail(), e)),
            Err(panic) => Outcome::error(format!(
                "{} panicked: {}",
                tracker.fail(),
                panic_message(panic.as_ref())
            )),
        }
    }

    /// Reads `path` and processes it under its file stem.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Outcome {
        let path = path.as_ref();
        let name = document_name_for(path);
        match std::fs::read(path) {
            Ok(bytes) => self.process(&bytes, &name),
            Err(e) => Outcome::error(format!("Failed to read {}: {}", path.display(), e)),
        }
    }

    /// Full-page OCR plus the grid decision and, for gridded pages, the cell
    /// geometry. Building the spreadsheet is left to the caller.
    ///
    /// A grid that yields no cells is reported as `has_grid = false`.
    pub fn extract(&self, image: &RasterImage) -> Result<ExtractionResult> {
        let raw_text = self.ocr.recognize_page(image)?;

        if !self.detector.detect(image) {
            return Ok(ExtractionResult {
                has_grid: false,
                grid: None,
                raw_text,
            });
        }

        let grid = self.segmenter.segment(image)?;
        if grid.is_empty() {
            tracing::debug!("Grid detected but no cells survived filtering, using text path");
            return Ok(ExtractionResult {
                has_grid: false,
                grid: None,
                raw_text,
            });
        }

        Ok(ExtractionResult {
            has_grid: true,
            grid: Some(grid),
            raw_text,
        })
    }

    fn run(&self, image_bytes: &[u8], document_name: &str, tracker: &mut StageTracker) -> Result<Outcome> {
        tracker.advance(PipelineStage::Decoding)?;
        let image = ImageDecoder::decode(image_bytes)?;
        self.run_decoded(&image, document_name, tracker)
    }

    fn run_decoded(&self, image: &RasterImage, document_name: &str, tracker: &mut StageTracker) -> Result<Outcome> {
        tracker.advance(PipelineStage::Detecting)?;
        let extraction = self.extract(image)?;

        let spreadsheet = match &extraction.grid {
            Some(grid) if extraction.has_grid => {
                tracker.advance(PipelineStage::GridExtraction)?;
                let texts = self.ocr.recognize_grid(image, grid);

                tracker.advance(PipelineStage::Building)?;
                self.table_builder.build(grid, &texts)?
            }
            _ => {
                if extraction.raw_text.is_empty() {
                    tracker.advance(PipelineStage::Done)?;
                    tracing::debug!(document = document_name, "No grid and no text");
                    return Ok(Outcome::NoTextExtracted);
                }

                tracker.advance(PipelineStage::TextFallback)?;
                tracker.advance(PipelineStage::Building)?;
                self.text_builder.build(&extraction.raw_text)?
            }
        };

        tracker.advance(PipelineStage::Done)?;
        tracing::debug!(
            document = document_name,
            has_grid = extraction.has_grid,
            bytes = spreadsheet.len(),
            "Document processed"
        );

        Ok(Outcome::Success {
            filename: output_filename(document_name),
            spreadsheet,
            has_grid: extraction.has_grid,
            raw_text: extraction.raw_text,
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("ocr", &self.ocr)
            .finish_non_exhaustive()
    }
}

/// File stem, or `"document"` when the path has none.
pub fn document_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
