//! Cell geometry recovery for pages with a detected grid.
//!
//! Rebuilds the grid skeleton from the same line masks the detector uses,
//! turns the bounding rectangle of every contour into a candidate cell,
//! filters candidates by size and clusters them into rows:
//!
//! 1. Sort candidates by `(y, x)`.
//! 2. Walk them once; a candidate whose `y` differs from the current row's
//!    reference `y` (the `y` of the candidate that opened the row) by at least
//!    `row_tolerance` opens a new row.
//! 3. Sort each row by `x` and number rows and columns from 1.
//!
//! Outer borders are not treated specially. The outline of a table that
//! fills the page fails the `max_cell_ratio` rule; a small table on a large
//! page keeps its outline as one more cell.

use super::masks::LineMasks;
use crate::core::config::{GridDetectionConfig, SegmentationConfig};
use crate::error::{Result, TablescanError};
use crate::types::{BoundingBox, CellRegion, Grid, RasterImage};
use crate::vision::contours::{BorderKind, find_regions};

#[derive(Debug, Clone, Default)]
pub struct CellSegmenter {
    grid: GridDetectionConfig,
    segmentation: SegmentationConfig,
}

impl CellSegmenter {
    pub fn new(grid: GridDetectionConfig, segmentation: SegmentationConfig) -> Self {
        Self { grid, segmentation }
    }

    #[cfg_attr(feature = "otel", tracing::instrument(
        skip(self, image),
        fields(
            image.width = image.width(),
            image.height = image.height(),
        )
    ))]
    pub fn segment(&self, image: &RasterImage) -> Result<Grid> {
        if image.is_empty() {
            return Err(TablescanError::image_processing("Cannot segment an empty image"));
        }

        let masks = LineMasks::compute(image.gray(), &self.grid)?;
        let skeleton = masks.combined()?;
        let regions = find_regions(&skeleton);

        let candidates: Vec<BoundingBox> = regions
            .iter()
            .map(|region| region.bbox)
            .filter(|bbox| self.is_cell_sized(bbox, image.width(), image.height()))
            .collect();

        tracing::debug!(
            contours = regions.len(),
            outer = regions.iter().filter(|r| r.kind == BorderKind::Outer).count(),
            cells = candidates.len(),
            "Filtered cell candidates"
        );

        Ok(self.cluster(candidates))
    }

    /// Strictly larger than the minimum and strictly smaller than
    /// `max_cell_ratio` of the page, in both dimensions.
    pub fn is_cell_sized(&self, bbox: &BoundingBox, page_width: u32, page_height: u32) -> bool {
        let cfg = &self.segmentation;
        bbox.width > cfg.min_cell_width
            && bbox.height > cfg.min_cell_height
            && f64::from(bbox.width) < cfg.max_cell_ratio * f64::from(page_width)
            && f64::from(bbox.height) < cfg.max_cell_ratio * f64::from(page_height)
    }

    /// Groups boxes into rows and assigns 1-based indices.
    pub fn cluster(&self, mut boxes: Vec<BoundingBox>) -> Grid {
        boxes.sort_by_key(|b| (b.y, b.x));

        let tolerance = self.segmentation.row_tolerance;
        let mut rows: Vec<Vec<BoundingBox>> = Vec::new();
        let mut reference_y = None;

        for bbox in boxes {
            match reference_y {
                Some(ref_y) if bbox.y.abs_diff(ref_y) < tolerance => {
                    if let Some(row) = rows.last_mut() {
                        row.push(bbox);
                    }
                }
                _ => {
                    reference_y = Some(bbox.y);
                    rows.push(vec![bbox]);
                }
            }
        }

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(r, mut row)| {
                row.sort_by_key(|b| b.x);
                row.into_iter()
                    .enumerate()
                    .map(|(c, bbox)| CellRegion {
                        bbox,
                        row: r as u32 + 1,
                        column: c as u32 + 1,
                    })
                    .collect()
            })
            .collect();

        Grid::from_rows(rows)
    }
}
