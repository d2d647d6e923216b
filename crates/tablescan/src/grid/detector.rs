//! Ruled-grid detection.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;

use super::masks::LineMasks;
use crate::core::config::GridDetectionConfig;
use crate::error::{Result, TablescanError};
use crate::types::{LineSet, Orientation, RasterImage};
use crate::vision::hough::detect_segments;

/// Line counts behind a grid decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridAnalysis {
    pub horizontal: LineSet,
    pub vertical: LineSet,
    pub has_grid: bool,
}

impl GridAnalysis {
    pub fn horizontal_count(&self) -> usize {
        self.horizontal.len()
    }

    pub fn vertical_count(&self) -> usize {
        self.vertical.len()
    }
}

/// Decides whether a page carries a ruled table.
///
/// A page has a grid when the line transform finds at least
/// `min_horizontal_lines` horizontal and `min_vertical_lines` vertical rules,
/// i.e. enough for a 2x2 cell structure with the defaults.
#[derive(Debug, Clone, Default)]
pub struct GridDetector {
    config: GridDetectionConfig,
}

impl GridDetector {
    pub fn new(config: GridDetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GridDetectionConfig {
        &self.config
    }

    /// `true` if the page has a grid.
    ///
    /// Never fails: any error or panic while analyzing is logged and read as
    /// "no grid", sending the document down the text path.
    #[cfg_attr(feature = "otel", tracing::instrument(
        skip(self, image),
        fields(
            image.width = image.width(),
            image.height = image.height(),
        )
    ))]
    pub fn detect(&self, image: &RasterImage) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.analyze(image))) {
            Ok(Ok(analysis)) => analysis.has_grid,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Grid detection failed, treating page as having no grid");
                false
            }
            Err(_) => {
                tracing::warn!("Grid detection panicked, treating page as having no grid");
                false
            }
        }
    }

    /// Runs the full detection and reports the segments found in each direction.
    pub fn analyze(&self, image: &RasterImage) -> Result<GridAnalysis> {
        if image.is_empty() {
            return Err(TablescanError::image_processing("Cannot detect a grid on an empty image"));
        }

        let masks = LineMasks::compute(image.gray(), &self.config)?;
        let horizontal = detect_segments(&masks.horizontal, &self.config.hough, Orientation::Horizontal)?;
        let vertical = detect_segments(&masks.vertical, &self.config.hough, Orientation::Vertical)?;

        let has_grid =
            horizontal.len() >= self.config.min_horizontal_lines && vertical.len() >= self.config.min_vertical_lines;

        tracing::debug!(
            horizontal = horizontal.len(),
            vertical = vertical.len(),
            has_grid,
            "Grid detection finished"
        );

        Ok(GridAnalysis {
            horizontal,
            vertical,
            has_grid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn ruled_page(rules: usize) -> RasterImage {
        let gray = GrayImage::from_fn(500, 400, |x, y| {
            let on_h = (0..rules).any(|i| y == 50 + i as u32 * 80) && (40..460).contains(&x);
            let on_v = (0..rules).any(|i| x == 40 + i as u32 * 140) && (50..=50 + (rules as u32 - 1) * 80).contains(&y);
            if on_h || on_v { Luma([0]) } else { Luma([255]) }
        });
        RasterImage::from_gray(gray)
    }

    #[test]
    fn test_detects_three_by_three_rules() {
        let detector = GridDetector::default();
        let analysis = detector.analyze(&ruled_page(4)).unwrap();
        assert!(analysis.horizontal_count() >= 3);
        assert!(analysis.vertical_count() >= 3);
        assert!(analysis.has_grid);
        assert!(detector.detect(&ruled_page(4)));
    }

    #[test]
    fn test_two_rules_each_way_is_not_a_grid() {
        assert!(!GridDetector::default().detect(&ruled_page(2)));
    }

    #[test]
    fn test_blank_page_is_not_a_grid() {
        let page = RasterImage::from_gray(GrayImage::from_pixel(300, 300, Luma([255])));
        let analysis = GridDetector::default().analyze(&page).unwrap();
        assert_eq!(analysis.horizontal_count(), 0);
        assert_eq!(analysis.vertical_count(), 0);
        assert!(!analysis.has_grid);
    }

    #[test]
    fn test_empty_image_degrades_to_false() {
        let page = RasterImage::from_gray(GrayImage::new(0, 0));
        assert!(GridDetector::default().analyze(&page).is_err());
        assert!(!GridDetector::default().detect(&page));
    }

    #[test]
    fn test_invalid_parameters_degrade_to_false() {
        let mut config = GridDetectionConfig::default();
        config.kernel_length = 0;
        assert!(!GridDetector::new(config).detect(&ruled_page(4)));
    }
}
