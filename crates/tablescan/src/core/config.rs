//! Configuration loading and management.
//!
//! Every threshold the pipeline uses lives here with its default value, so a
//! deployment can tune the detector for its scanners without recompiling.
//! Configuration can be loaded from TOML, YAML or JSON files, discovered from
//! a `tablescan.toml` in the working directory or any parent, or built in code.

use crate::ocr::cache::DEFAULT_CACHE_CAPACITY;
use crate::spreadsheet::BorderStyle;
use crate::spreadsheet::document::sheet_title_problem;
use crate::vision::HoughParams;
use crate::vision::morphology::MAX_ELEMENT_SIDE;
use crate::{Result, TablescanError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest sheet title SpreadsheetML accepts.
pub const MAX_SHEET_TITLE_LEN: usize = 31;

/// Main pipeline configuration.
///
/// # Example
///
/// ```rust
/// use tablescan::core::config::TablescanConfig;
///
/// let config = TablescanConfig::default();
/// assert_eq!(config.grid.binary_threshold, 150);
///
/// // let config = TablescanConfig::from_toml_file("tablescan.toml")?;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablescanConfig {
    /// Grid detection thresholds
    #[serde(default)]
    pub grid: GridDetectionConfig,

    /// Cell filtering and row clustering
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Text recognition backend and modes
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Spreadsheet output
    #[serde(default)]
    pub output: OutputConfig,

    /// Maximum documents processed at once in batch operations (None = num_cpus * 2).
    #[serde(default)]
    pub max_concurrent_documents: Option<usize>,

    /// Per-document timeout in batch operations (None = no timeout).
    #[serde(default)]
    pub document_timeout_secs: Option<u64>,
}

/// Thresholding, opening and line-transform settings shared by detection and
/// segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDetectionConfig {
    /// Pixels at or below this gray level count as ink
    #[serde(default = "default_binary_threshold")]
    pub binary_threshold: u8,

    /// Length of the horizontal (N x 1) and vertical (1 x N) structuring elements
    #[serde(default = "default_kernel_length")]
    pub kernel_length: u32,

    #[serde(default = "default_open_iterations")]
    pub open_iterations: u32,

    #[serde(default = "default_min_lines")]
    pub min_horizontal_lines: usize,

    #[serde(default = "default_min_lines")]
    pub min_vertical_lines: usize,

    #[serde(default)]
    pub hough: HoughParams,
}

/// Cell size filter and row clustering tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Cells must be strictly wider than this
    #[serde(default = "default_min_cell_size")]
    pub min_cell_width: u32,

    /// Cells must be strictly taller than this
    #[serde(default = "default_min_cell_size")]
    pub min_cell_height: u32,

    /// Cells must be strictly smaller than this fraction of the page in each dimension
    #[serde(default = "default_max_cell_ratio")]
    pub max_cell_ratio: f64,

    /// A rectangle whose y differs from the row's reference y by at least this
    /// many pixels starts a new row
    #[serde(default = "default_row_tolerance")]
    pub row_tolerance: u32,
}

/// OCR backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// OCR backend: "tesseract-cli" (subprocess) or "tesseract" (native bindings)
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Language code (e.g., "eng", "deu")
    #[serde(default = "default_eng")]
    pub language: String,

    /// Page segmentation mode for the full-page pass
    #[serde(default = "default_page_psm")]
    pub page_psm: u8,

    /// Page segmentation mode for individual cells (6 = single uniform block)
    #[serde(default = "default_cell_psm")]
    pub cell_psm: u8,

    /// Explicit path to the `tesseract` executable (None = search PATH)
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,

    /// Explicit tessdata directory (None = TESSDATA_PREFIX, then well-known paths)
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,

    /// Enable the shared recognition cache
    #[serde(default = "default_true")]
    pub use_cache: bool,

    /// Most recognition results the cache keeps before evicting the oldest
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Subprocess timeout per recognition call
    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,
}

/// Spreadsheet output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_table_sheet_title")]
    pub table_sheet_title: String,

    #[serde(default = "default_text_sheet_title")]
    pub text_sheet_title: String,

    /// Border drawn around every grid cell
    #[serde(default)]
    pub border_style: BorderStyle,
}

fn default_true() -> bool {
    true
}
fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}
fn default_binary_threshold() -> u8 {
    150
}
fn default_kernel_length() -> u32 {
    25
}
fn default_open_iterations() -> u32 {
    2
}
fn default_min_lines() -> usize {
    3
}
fn default_min_cell_size() -> u32 {
    20
}
fn default_max_cell_ratio() -> f64 {
    0.9
}
fn default_row_tolerance() -> u32 {
    10
}
fn default_backend() -> String {
    "tesseract-cli".to_string()
}
fn default_eng() -> String {
    "eng".to_string()
}
fn default_page_psm() -> u8 {
    3
}
fn default_cell_psm() -> u8 {
    6
}
fn default_ocr_timeout() -> u64 {
    120
}
fn default_table_sheet_title() -> String {
    "Extracted Table".to_string()
}
fn default_text_sheet_title() -> String {
    "Extracted Text".to_string()
}

impl Default for GridDetectionConfig {
    fn default() -> Self {
        Self {
            binary_threshold: default_binary_threshold(),
            kernel_length: default_kernel_length(),
            open_iterations: default_open_iterations(),
            min_horizontal_lines: default_min_lines(),
            min_vertical_lines: default_min_lines(),
            hough: HoughParams::default(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_cell_width: default_min_cell_size(),
            min_cell_height: default_min_cell_size(),
            max_cell_ratio: default_max_cell_ratio(),
            row_tolerance: default_row_tolerance(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            language: default_eng(),
            page_psm: default_page_psm(),
            cell_psm: default_cell_psm(),
            tesseract_path: None,
            tessdata_dir: None,
            use_cache: default_true(),
            cache_capacity: default_cache_capacity(),
            timeout_secs: default_ocr_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table_sheet_title: default_table_sheet_title(),
            text_sheet_title: default_text_sheet_title(),
            border_style: BorderStyle::default(),
        }
    }
}

impl TablescanConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| TablescanError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| TablescanError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| TablescanError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, picking the format from its extension
    /// (`.toml`, `.yaml`/`.yml`, `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("toml") => Self::from_toml_file(path),
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(TablescanError::validation(format!(
                "Unsupported config file extension: {}",
                path.display()
            ))),
        }
    }

    /// Discover configuration file in parent directories.
    ///
    /// Searches for `tablescan.toml` in current directory and parent directories.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(TablescanError::Io)?;

        loop {
            let tablescan_toml = current.join("tablescan.toml");
            if tablescan_toml.exists() {
                return Ok(Some(Self::from_toml_file(tablescan_toml)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        if grid.kernel_length == 0 || grid.kernel_length > MAX_ELEMENT_SIDE {
            return Err(TablescanError::validation(format!(
                "grid.kernel_length must be between 1 and {}, got {}",
                MAX_ELEMENT_SIDE, grid.kernel_length
            )));
        }
        if grid.open_iterations == 0 {
            return Err(TablescanError::validation("grid.open_iterations must be at least 1"));
        }
        if grid.min_horizontal_lines == 0 || grid.min_vertical_lines == 0 {
            return Err(TablescanError::validation("grid line minimums must be at least 1"));
        }
        grid.hough.validate()?;

        let seg = &self.segmentation;
        if !(seg.max_cell_ratio > 0.0 && seg.max_cell_ratio <= 1.0) {
            return Err(TablescanError::validation(format!(
                "segmentation.max_cell_ratio must be in (0, 1], got {}",
                seg.max_cell_ratio
            )));
        }

        let ocr = &self.ocr;
        if ocr.backend != "tesseract-cli" && ocr.backend != "tesseract" {
            return Err(TablescanError::validation(format!(
                "Unknown OCR backend '{}'. Expected 'tesseract-cli' or 'tesseract'",
                ocr.backend
            )));
        }
        if ocr.language.trim().is_empty() {
            return Err(TablescanError::validation("ocr.language must not be empty"));
        }
        for (name, psm) in [("ocr.page_psm", ocr.page_psm), ("ocr.cell_psm", ocr.cell_psm)] {
            if psm > 13 {
                return Err(TablescanError::validation(format!(
                    "{} must be between 0 and 13, got {}",
                    name, psm
                )));
            }
        }
        if ocr.timeout_secs == 0 {
            return Err(TablescanError::validation("ocr.timeout_secs must be at least 1"));
        }
        if ocr.use_cache && ocr.cache_capacity == 0 {
            return Err(TablescanError::validation("ocr.cache_capacity must be at least 1"));
        }

        for (name, title) in [
            ("output.table_sheet_title", &self.output.table_sheet_title),
            ("output.text_sheet_title", &self.output.text_sheet_title),
        ] {
            if let Some(problem) = sheet_title_problem(title) {
                return Err(TablescanError::validation(format!("{} {}", name, problem)));
            }
        }

        if self.max_concurrent_documents == Some(0) {
            return Err(TablescanError::validation("max_concurrent_documents must be at least 1"));
        }
        if self.document_timeout_secs == Some(0) {
            return Err(TablescanError::validation("document_timeout_secs must be at least 1"));
        }

        Ok(())
    }

    /// Effective batch concurrency limit.
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent_documents.unwrap_or_else(|| num_cpus::get() * 2)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| TablescanError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}
