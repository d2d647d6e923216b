//! Opening with rectangular structuring elements.
//!
//! Works on 0/255 ink images and hands back a [`BinaryMask`]. The element
//! anchor sits at `size / 2`; pixels outside the image take no part in
//! either erosion or dilation.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

use super::mask::BinaryMask;
use crate::error::{Result, TablescanError};

/// Largest side imageproc accepts for a mask image.
pub const MAX_ELEMENT_SIDE: u32 = 511;

/// A `width` x `height` rectangle of ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    mask: Mask,
}

impl StructuringElement {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TablescanError::image_processing(format!(
                "Structuring element must be non-empty, got {}x{}",
                width, height
            )));
        }
        if width > MAX_ELEMENT_SIDE || height > MAX_ELEMENT_SIDE {
            return Err(TablescanError::image_processing(format!(
                "Structuring element sides must be at most {}, got {}x{}",
                MAX_ELEMENT_SIDE, width, height
            )));
        }

        // Both sides are at most 511, so the anchors fit in a u8.
        let ones = GrayImage::from_pixel(width, height, Luma([255]));
        let mask = Mask::from_image(&ones, (width / 2) as u8, (height / 2) as u8);
        Ok(Self { width, height, mask })
    }

    /// `length` x 1: keeps horizontal runs.
    pub fn horizontal(length: u32) -> Result<Self> {
        Self::new(length, 1)
    }

    /// 1 x `length`: keeps vertical runs.
    pub fn vertical(length: u32) -> Result<Self> {
        Self::new(1, length)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Morphological opening: `iterations` erosions followed by as many dilations.
///
/// Removes ink that cannot contain the element, which is how text glyphs are
/// dropped while long straight rules survive.
pub fn open(ink: &GrayImage, element: &StructuringElement, iterations: u32) -> Result<BinaryMask> {
    if iterations == 0 {
        return Err(TablescanError::image_processing("Opening needs at least one iteration"));
    }
    if ink.width() == 0 || ink.height() == 0 {
        return Err(TablescanError::image_processing(format!(
            "Cannot open an empty {}x{} image",
            ink.width(),
            ink.height()
        )));
    }

    let mut out = grayscale_erode(ink, &element.mask);
    for _ in 1..iterations {
        out = grayscale_erode(&out, &element.mask);
    }
    for _ in 0..iterations {
        out = grayscale_dilate(&out, &element.mask);
    }
    Ok(BinaryMask::from_gray(&out))
}
