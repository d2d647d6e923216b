//! Per-cell and full-page recognition on top of a [`TextRecognizer`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use ahash::AHashMap;
use image::GrayImage;
use image::imageops::crop_imm;

use super::cache::{CacheKey, RecognitionCache};
use super::recognizer::TextRecognizer;
use super::types::PSMMode;
use super::utils::clean_recognized_text;
use crate::error::{Result, TablescanError};
use crate::types::{BoundingBox, CellRegion, Grid, RasterImage};

/// Recognized text per cell.
pub type CellTexts = AHashMap<CellRegion, String>;

/// Runs recognition on cell crops and on whole pages.
#[derive(Clone)]
pub struct CellOcrEngine {
    recognizer: Arc<dyn TextRecognizer>,
    cell_mode: PSMMode,
    page_mode: PSMMode,
    cache: Option<Arc<RecognitionCache>>,
}

impl CellOcrEngine {
    /// Cells use single-uniform-block mode, pages fully automatic layout.
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            cell_mode: PSMMode::SingleBlock,
            page_mode: PSMMode::Auto,
            cache: None,
        }
    }

    pub fn with_modes(mut self, cell_mode: PSMMode, page_mode: PSMMode) -> Self {
        self.cell_mode = cell_mode;
        self.page_mode = page_mode;
        self
    }

    pub fn with_cache(mut self, cache: Arc<RecognitionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Text of one cell, trimmed; `""` when recognition fails.
    pub fn recognize(&self, image: &RasterImage, cell: &CellRegion) -> String {
        match self.try_recognize(image, cell) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    row = cell.row,
                    column = cell.column,
                    error = %e,
                    "Cell recognition failed, writing empty cell"
                );
                String::new()
            }
        }
    }

    /// Text of one cell, trimmed, surfacing recognizer errors and panics.
    pub fn try_recognize(&self, image: &RasterImage, cell: &CellRegion) -> Result<String> {
        let region = clamp_to_image(&cell.bbox, image.width(), image.height()).ok_or_else(|| {
            TablescanError::ocr(format!(
                "Cell ({}, {}) at {:?} lies outside the {}x{} page",
                cell.row,
                cell.column,
                cell.bbox,
                image.width(),
                image.height()
            ))
        })?;

        self.cached(image, region, self.cell_mode, || {
            let crop = crop_imm(image.gray(), region.x, region.y, region.width, region.height).to_image();
            self.call_recognizer(&crop, self.cell_mode)
        })
    }

    /// Every cell of `grid`; failed cells map to `""`.
    pub fn recognize_grid(&self, image: &RasterImage, grid: &Grid) -> CellTexts {
        let texts: CellTexts = grid
            .cells()
            .map(|cell| (*cell, self.recognize(image, cell)))
            .collect();

        tracing::debug!(
            cells = texts.len(),
            non_empty = texts.values().filter(|t| !t.is_empty()).count(),
            "Recognized grid cells"
        );
        texts
    }

    /// Full-page text, trimmed. Errors propagate.
    pub fn recognize_page(&self, image: &RasterImage) -> Result<String> {
        let region = BoundingBox::new(0, 0, image.width(), image.height());
        self.cached(image, region, self.page_mode, || {
            self.call_recognizer(image.gray(), self.page_mode)
        })
    }

    fn cached<F>(&self, image: &RasterImage, region: BoundingBox, mode: PSMMode, recognize: F) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        match &self.cache {
            Some(cache) => cache.get_or_recognize(CacheKey::new(image.content_hash(), region, mode), recognize),
            None => recognize(),
        }
    }

    fn call_recognizer(&self, image: &GrayImage, mode: PSMMode) -> Result<String> {
        let raw = catch_unwind(AssertUnwindSafe(|| self.recognizer.recognize(image, mode))).map_err(|_| {
            TablescanError::ocr(format!("Recognizer '{}' panicked", self.recognizer.name()))
        })??;
        Ok(clean_recognized_text(&raw))
    }
}

impl std::fmt::Debug for CellOcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellOcrEngine")
            .field("recognizer", &self.recognizer.name())
            .field("cell_mode", &self.cell_mode)
            .field("page_mode", &self.page_mode)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

fn clamp_to_image(bbox: &BoundingBox, width: u32, height: u32) -> Option<BoundingBox> {
    if bbox.x >= width || bbox.y >= height || bbox.width == 0 || bbox.height == 0 {
        return None;
    }
    Some(BoundingBox::new(
        bbox.x,
        bbox.y,
        bbox.width.min(width - bbox.x),
        bbox.height.min(height - bbox.y),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::sync::Mutex;

    /// Reports the crop size and mode it was called with.
    struct Echo {
        calls: Mutex<Vec<(u32, u32, PSMMode)>>,
    }

    impl TextRecognizer for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn recognize(&self, image: &GrayImage, mode: PSMMode) -> Result<String> {
            self.calls.lock().unwrap().push((image.width(), image.height(), mode));
            Ok(format!("  {}x{}\x0c\n", image.width(), image.height()))
        }
    }

    struct Failing;

    impl TextRecognizer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(&self, _image: &GrayImage, _mode: PSMMode) -> Result<String> {
            Err(TablescanError::ocr("engine unavailable"))
        }
    }

    struct Panicking;

    impl TextRecognizer for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn recognize(&self, _image: &GrayImage, _mode: PSMMode) -> Result<String> {
            panic!("engine exploded")
        }
    }

    fn page() -> RasterImage {
        RasterImage::from_gray(GrayImage::from_pixel(200, 100, Luma([255])))
    }

    fn cell(x: u32, y: u32, w: u32, h: u32) -> CellRegion {
        CellRegion {
            bbox: BoundingBox::new(x, y, w, h),
            row: 1,
            column: 1,
        }
    }

    #[test]
    fn test_crops_and_trims() {
        let echo = Arc::new(Echo {
            calls: Mutex::new(Vec::new()),
        });
        let engine = CellOcrEngine::new(echo.clone());
        assert_eq!(engine.recognize(&page(), &cell(10, 20, 40, 30)), "40x30");
        assert_eq!(echo.calls.lock().unwrap()[0], (40, 30, PSMMode::SingleBlock));
    }

    #[test]
    fn test_cell_is_clamped_to_page() {
        let engine = CellOcrEngine::new(Arc::new(Echo {
            calls: Mutex::new(Vec::new()),
        }));
        assert_eq!(engine.recognize(&page(), &cell(180, 90, 50, 50)), "20x10");
        assert_eq!(engine.recognize(&page(), &cell(300, 10, 5, 5)), "");
    }

    #[test]
    fn test_failure_becomes_empty_string() {
        let engine = CellOcrEngine::new(Arc::new(Failing));
        assert_eq!(engine.recognize(&page(), &cell(0, 0, 30, 30)), "");
        assert!(engine.try_recognize(&page(), &cell(0, 0, 30, 30)).is_err());
        assert!(engine.recognize_page(&page()).is_err());
    }

    #[test]
    fn test_panic_becomes_empty_string() {
        let engine = CellOcrEngine::new(Arc::new(Panicking));
        assert_eq!(engine.recognize(&page(), &cell(0, 0, 30, 30)), "");
    }

    #[test]
    fn test_page_mode_and_cache() {
        let echo = Arc::new(Echo {
            calls: Mutex::new(Vec::new()),
        });
        let cache = Arc::new(RecognitionCache::new());
        let engine = CellOcrEngine::new(echo.clone()).with_cache(cache.clone());

        assert_eq!(engine.recognize_page(&page()).unwrap(), "200x100");
        assert_eq!(engine.recognize_page(&page()).unwrap(), "200x100");
        assert_eq!(echo.calls.lock().unwrap().len(), 1);
        assert_eq!(echo.calls.lock().unwrap()[0].2, PSMMode::Auto);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_recognize_grid_covers_every_cell() {
        let engine = CellOcrEngine::new(Arc::new(Echo {
            calls: Mutex::new(Vec::new()),
        }));
        let a = cell(0, 0, 30, 30);
        let b = CellRegion { column: 2, ..cell(30, 0, 40, 30) };
        let grid = Grid::from_rows(vec![vec![a, b]]);

        let texts = engine.recognize_grid(&page(), &grid);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[&a], "30x30");
        assert_eq!(texts[&b], "40x30");
    }
}
