//! Horizontal and vertical rule masks.
//!
//! Detection and segmentation both start from the same two masks, so they
//! are computed in one place with one set of parameters.

use image::GrayImage;

use crate::core::config::GridDetectionConfig;
use crate::error::{Result, TablescanError};
use crate::vision::mask::{BinaryMask, threshold_inverse};
use crate::vision::morphology::{StructuringElement, open};

/// Long straight rules of a page, split by direction.
#[derive(Debug, Clone)]
pub struct LineMasks {
    pub horizontal: BinaryMask,
    pub vertical: BinaryMask,
}

impl LineMasks {
    /// Inverse-thresholds `gray` and opens the result with an `N x 1` and a
    /// `1 x N` element, which drops glyphs and keeps rules.
    pub fn compute(gray: &GrayImage, config: &GridDetectionConfig) -> Result<Self> {
        if gray.width() == 0 || gray.height() == 0 {
            return Err(TablescanError::image_processing(format!(
                "Cannot build line masks for a {}x{} image",
                gray.width(),
                gray.height()
            )));
        }

        let ink = threshold_inverse(gray, config.binary_threshold);
        let horizontal = open(
            &ink,
            &StructuringElement::horizontal(config.kernel_length)?,
            config.open_iterations,
        )?;
        let vertical = open(
            &ink,
            &StructuringElement::vertical(config.kernel_length)?,
            config.open_iterations,
        )?;

        tracing::debug!(
            ink = ink.pixels().filter(|p| p[0] != 0).count(),
            horizontal = horizontal.count_foreground(),
            vertical = vertical.count_foreground(),
            "Computed line masks"
        );

        Ok(Self { horizontal, vertical })
    }

    /// Grid skeleton: union of both masks.
    pub fn combined(&self) -> Result<BinaryMask> {
        self.horizontal.union(&self.vertical)
    }
}
