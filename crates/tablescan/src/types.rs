//! Data model shared by every pipeline stage.
//!
//! All values here are created and consumed within one document run and are
//! immutable once built; nothing is shared mutably between documents.

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

pub use crate::vision::mask::BinaryMask;

/// Whether the decoded source carried color channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorDepth {
    Grayscale,
    Color,
}

/// A decoded page.
///
/// Keeps the decoded pixels as they came out of the container together with
/// the 8-bit grayscale rendition every analysis stage works on.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: DynamicImage,
    gray: GrayImage,
    depth: ColorDepth,
    content_hash: OnceLock<u64>,
}

impl RasterImage {
    pub fn from_dynamic(pixels: DynamicImage) -> Self {
        let depth = if pixels.color().has_color() {
            ColorDepth::Color
        } else {
            ColorDepth::Grayscale
        };
        let gray = pixels.to_luma8();
        Self {
            pixels,
            gray,
            depth,
            content_hash: OnceLock::new(),
        }
    }

    pub fn from_gray(gray: GrayImage) -> Self {
        Self::from_dynamic(DynamicImage::ImageLuma8(gray))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn depth(&self) -> ColorDepth {
        self.depth
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Hash of the grayscale content, used to key recognition results.
    ///
    /// Computed on first use and kept; the pixels never change afterwards.
    pub fn content_hash(&self) -> u64 {
        *self.content_hash.get_or_init(|| {
            let mut hasher = ahash::AHasher::default();
            self.gray.width().hash(&mut hasher);
            self.gray.height().hash(&mut hasher);
            self.gray.as_raw().hash(&mut hasher);
            hasher.finish()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A finite line segment found by the probabilistic line transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
    pub orientation: Orientation,
}

impl LineSegment {
    pub fn length(&self) -> f64 {
        let dx = f64::from(self.end.x - self.start.x);
        let dy = f64::from(self.end.y - self.start.y);
        dx.hypot(dy)
    }
}

/// Segments in the order the line transform reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSet {
    pub segments: Vec<LineSegment>,
}

impl LineSet {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn count(&self, orientation: Orientation) -> usize {
        self.segments.iter().filter(|s| s.orientation == orientation).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineSegment> {
        self.segments.iter()
    }
}

/// Axis-aligned box in pixel coordinates; `width`/`height` count pixels inclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// One table cell: its box plus 1-based row and column indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRegion {
    pub bbox: BoundingBox,
    pub row: u32,
    pub column: u32,
}

/// Cells in row-major order.
///
/// Within a row, column indices increase with x; across rows, row indices
/// increase with each row's reference y.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<CellRegion>>,
}

impl Grid {
    /// Rows are taken as given; callers keep the row-major ordering.
    pub fn from_rows(rows: Vec<Vec<CellRegion>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<CellRegion>] {
        &self.rows
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellRegion> {
        self.rows.iter().flatten()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row; rows may differ in length when rules are broken.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }
}

/// The analysis of one document, before any spreadsheet is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub has_grid: bool,
    pub grid: Option<Grid>,
    pub raw_text: String,
}

/// Terminal result of processing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        filename: String,
        spreadsheet: Vec<u8>,
        has_grid: bool,
        raw_text: String,
    },
    NoTextExtracted,
    Error {
        message: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Outcome::Error {
            message: message.into(),
        }
    }
}

/// Artifact name for a document: always `{document_name}_output.xlsx`.
pub fn output_filename(document_name: &str) -> String {
    format!("{}_output.xlsx", document_name)
}
