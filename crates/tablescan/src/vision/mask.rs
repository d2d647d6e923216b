//! Binary foreground/background masks.

use bitvec::prelude::*;
use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold};

use crate::error::{Result, TablescanError};

/// One bit per pixel, row-major; `true` is foreground (ink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: BitVec,
}

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: bitvec![0; width as usize * height as usize],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    /// Non-zero pixels of `image` become foreground.
    pub fn from_gray(image: &GrayImage) -> Self {
        let mut mask = Self::new(image.width(), image.height());
        for (idx, pixel) in image.pixels().enumerate() {
            if pixel[0] != 0 {
                mask.bits.set(idx, true);
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = self.index(x, y);
        self.bits.set(idx, value);
    }

    pub fn count_foreground(&self) -> usize {
        self.bits.count_ones()
    }

    /// Iterates foreground pixels in row-major order.
    pub fn foreground(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width as usize;
        self.bits
            .iter_ones()
            .map(move |idx| ((idx % width) as u32, (idx / width) as u32))
    }

    /// Pixel-wise union of two masks of the same size.
    pub fn union(&self, other: &BinaryMask) -> Result<BinaryMask> {
        if self.dimensions() != other.dimensions() {
            return Err(TablescanError::image_processing(format!(
                "Cannot combine masks of different sizes: {}x{} and {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }

        let mut combined = self.clone();
        for idx in other.bits.iter_ones() {
            combined.bits.set(idx, true);
        }
        Ok(combined)
    }

    /// 255 for foreground, 0 for background.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) { Luma([255]) } else { Luma([0]) }
        })
    }
}

/// Inverse binary threshold: pixels at or below `cutoff` become 255, the
/// rest 0, so dark ink and ruling lines on a light page end up set.
pub fn threshold_inverse(gray: &GrayImage, cutoff: u8) -> GrayImage {
    threshold(gray, cutoff, ThresholdType::BinaryInverted)
}
