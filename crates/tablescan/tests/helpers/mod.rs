//! Shared fixtures for integration tests.
//!
//! Pages are synthesized rather than loaded from disk. Cell "text" is a row of
//! small ink squares; [`DotReader`] reads a cell back as the number of squares
//! it contains, which keeps the tests independent of a Tesseract install.

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{GrayImage, ImageFormat, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tablescan::{Orchestrator, PSMMode, Result, TablescanConfig, TablescanError, TextRecognizer};

/// Narrow side margin: the table spans over 90% of the page width, so its
/// outline is too large to pass for a cell.
pub const TABLE_LEFT: u32 = 4;
pub const TABLE_TOP: u32 = 50;
pub const CELL_WIDTH: u32 = 100;
pub const CELL_HEIGHT: u32 = 60;

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);
const DOT_SIZE: u32 = 4;
const DOT_AREA: usize = (DOT_SIZE * DOT_SIZE) as usize;
/// Crop margin ignored by [`DotReader`], wide enough to skip the rules.
const RULE_MARGIN: u32 = 6;

/// A page filled edge to edge by a ruled table; `dots[r][c]` squares are
/// drawn in cell `(r, c)`.
pub fn ruled_table(dots: &[Vec<u32>]) -> GrayImage {
    let rows = dots.len() as u32;
    let cols = dots.iter().map(Vec::len).max().unwrap_or(0) as u32;
    let width = TABLE_LEFT * 2 + cols * CELL_WIDTH + 1;
    let height = TABLE_TOP * 2 + rows * CELL_HEIGHT + 1;
    let mut page = GrayImage::from_pixel(width, height, PAPER);

    let table_width = cols * CELL_WIDTH + 1;
    let table_height = rows * CELL_HEIGHT + 1;
    for r in 0..=rows {
        let y = (TABLE_TOP + r * CELL_HEIGHT) as i32;
        draw_filled_rect_mut(&mut page, Rect::at(TABLE_LEFT as i32, y).of_size(table_width, 1), INK);
    }
    for c in 0..=cols {
        let x = (TABLE_LEFT + c * CELL_WIDTH) as i32;
        draw_filled_rect_mut(&mut page, Rect::at(x, TABLE_TOP as i32).of_size(1, table_height), INK);
    }

    for (r, row) in dots.iter().enumerate() {
        for (c, &count) in row.iter().enumerate() {
            draw_dots(&mut page, r as u32, c as u32, count);
        }
    }
    page
}

fn draw_dots(page: &mut GrayImage, row: u32, col: u32, count: u32) {
    let left = TABLE_LEFT + col * CELL_WIDTH + 15;
    let top = TABLE_TOP + row * CELL_HEIGHT + 25;
    for k in 0..count {
        let x = (left + k * 8) as i32;
        draw_filled_rect_mut(page, Rect::at(x, top as i32).of_size(DOT_SIZE, DOT_SIZE), INK);
    }
}

/// A rows x cols table whose cell `(r, c)` (0-based) holds `r * cols + c + 1` dots.
pub fn numbered_table(rows: usize, cols: usize) -> GrayImage {
    let dots: Vec<Vec<u32>> = (0..rows)
        .map(|r| (0..cols).map(|c| (r * cols + c + 1) as u32).collect())
        .collect();
    ruled_table(&dots)
}

/// `table` pasted at `(x, y)` on a blank `width` x `height` page.
pub fn on_page(table: &GrayImage, width: u32, height: u32, x: i64, y: i64) -> GrayImage {
    let mut page = blank_page(width, height);
    image::imageops::overlay(&mut page, table, x, y);
    page
}

/// A page with a few short strokes and no ruling.
pub fn text_page() -> GrayImage {
    let mut page = GrayImage::from_pixel(400, 300, PAPER);
    for line in 0..4 {
        for word in 0..5 {
            let rect = Rect::at(40 + word * 60, 40 + line * 40).of_size(40, 8);
            draw_filled_rect_mut(&mut page, rect, INK);
        }
    }
    page
}

pub fn blank_page(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, PAPER)
}

pub fn encode(page: &GrayImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    page.write_to(&mut out, format).expect("encode test page");
    out.into_inner()
}

pub fn png(page: &GrayImage) -> Vec<u8> {
    encode(page, ImageFormat::Png)
}

fn count_dots(image: &GrayImage) -> usize {
    let (w, h) = image.dimensions();
    if w <= RULE_MARGIN * 2 || h <= RULE_MARGIN * 2 {
        return 0;
    }
    let ink = (RULE_MARGIN..h - RULE_MARGIN)
        .flat_map(|y| (RULE_MARGIN..w - RULE_MARGIN).map(move |x| (x, y)))
        .filter(|&(x, y)| image.get_pixel(x, y)[0] < 128)
        .count();
    ink / DOT_AREA
}

/// Reads cells as `"<n> dots"` (empty for none) and pages as `page_text`.
pub struct DotReader {
    pub page_text: String,
    pub cell_calls: AtomicUsize,
}

impl DotReader {
    pub fn new(page_text: impl Into<String>) -> Self {
        Self {
            page_text: page_text.into(),
            cell_calls: AtomicUsize::new(0),
        }
    }

    pub fn cell_calls(&self) -> usize {
        self.cell_calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for DotReader {
    fn name(&self) -> &str {
        "dots"
    }

    fn recognize(&self, image: &GrayImage, mode: PSMMode) -> Result<String> {
        if mode != PSMMode::SingleBlock {
            return Ok(self.page_text.clone());
        }
        self.cell_calls.fetch_add(1, Ordering::SeqCst);
        match count_dots(image) {
            0 => Ok(String::new()),
            n => Ok(format!("  {} dots \n", n)),
        }
    }
}

/// Like [`DotReader`], but any cell with exactly `fail_on` dots errors and
/// any cell with exactly `panic_on` dots panics.
pub struct FlakyDotReader {
    pub fail_on: usize,
    pub panic_on: usize,
}

impl TextRecognizer for FlakyDotReader {
    fn name(&self) -> &str {
        "flaky-dots"
    }

    fn recognize(&self, image: &GrayImage, mode: PSMMode) -> Result<String> {
        if mode != PSMMode::SingleBlock {
            return Ok("page".to_string());
        }
        match count_dots(image) {
            n if n == self.fail_on => Err(TablescanError::ocr("engine rejected the crop")),
            n if n == self.panic_on => panic!("engine crashed on {} dots", n),
            0 => Ok(String::new()),
            n => Ok(format!("{} dots", n)),
        }
    }
}

/// Returns the same text for every call.
pub struct FixedText(pub String);

impl TextRecognizer for FixedText {
    fn name(&self) -> &str {
        "fixed"
    }

    fn recognize(&self, _image: &GrayImage, _mode: PSMMode) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub fn orchestrator_with(recognizer: Arc<dyn TextRecognizer>) -> Orchestrator {
    Orchestrator::new(TablescanConfig::default(), recognizer).expect("default config is valid")
}

/// One worksheet cell as stored in the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCell {
    pub reference: String,
    pub text: String,
    /// Left-edge border style of the cell's format, e.g. `"thin"`.
    pub border: Option<String>,
}

pub fn read_part(xlsx: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(xlsx)).expect("valid zip");
    let mut file = archive.by_name(name).expect("part present");
    let mut out = String::new();
    file.read_to_string(&mut out).expect("utf-8 part");
    out
}

fn try_read_part(xlsx: &[u8], name: &str) -> Option<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(xlsx)).ok()?;
    let mut file = archive.by_name(name).ok()?;
    let mut out = String::new();
    file.read_to_string(&mut out).ok()?;
    Some(out)
}

/// Name of the single sheet in the workbook.
pub fn sheet_name(xlsx: &[u8]) -> String {
    let xml = read_part(xlsx, "xl/workbook.xml");
    let doc = roxmltree::Document::parse(&xml).expect("workbook xml");
    let names: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name("sheet"))
        .filter_map(|n| n.attribute("name").map(str::to_string))
        .collect();
    assert_eq!(names.len(), 1, "expected exactly one sheet, got {:?}", names);
    names[0].clone()
}

fn text_of(node: roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.has_tag_name("t"))
        .filter_map(|n| n.text())
        .collect()
}

fn shared_strings(xlsx: &[u8]) -> Vec<String> {
    let Some(xml) = try_read_part(xlsx, "xl/sharedStrings.xml") else {
        return Vec::new();
    };
    let doc = roxmltree::Document::parse(&xml).expect("shared strings xml");
    doc.descendants().filter(|n| n.has_tag_name("si")).map(text_of).collect()
}

/// Left-edge border style per `cellXfs` index.
fn xf_borders(xlsx: &[u8]) -> Vec<Option<String>> {
    let xml = read_part(xlsx, "xl/styles.xml");
    let doc = roxmltree::Document::parse(&xml).expect("styles xml");
    let borders: Vec<Option<String>> = doc
        .descendants()
        .filter(|n| n.has_tag_name("borders"))
        .flat_map(|n| n.children().filter(|c| c.has_tag_name("border")))
        .map(|border| {
            border
                .children()
                .find(|e| e.has_tag_name("left"))
                .and_then(|left| left.attribute("style"))
                .map(str::to_string)
        })
        .collect();
    doc.descendants()
        .filter(|n| n.has_tag_name("cellXfs"))
        .flat_map(|n| n.children().filter(|c| c.has_tag_name("xf")))
        .map(|xf| {
            let id: usize = xf.attribute("borderId").unwrap_or("0").parse().expect("border id");
            borders.get(id).cloned().flatten()
        })
        .collect()
}

/// Every `<c>` of the first worksheet, in document order, with shared
/// strings and border styles resolved.
pub fn sheet_cells(xlsx: &[u8]) -> Vec<SheetCell> {
    let strings = shared_strings(xlsx);
    let borders = xf_borders(xlsx);
    let xml = read_part(xlsx, "xl/worksheets/sheet1.xml");
    let doc = roxmltree::Document::parse(&xml).expect("sheet xml");
    doc.descendants()
        .filter(|n| n.has_tag_name("c"))
        .map(|c| {
            let value = c.children().find(|n| n.has_tag_name("v")).and_then(|v| v.text());
            let text = match (c.attribute("t"), value) {
                (Some("s"), Some(index)) => strings[index.parse::<usize>().expect("string index")].clone(),
                (_, Some(value)) => value.to_string(),
                (_, None) => text_of(c),
            };
            let border = c
                .attribute("s")
                .and_then(|s| borders.get(s.parse::<usize>().expect("style index")).cloned())
                .flatten();
            SheetCell {
                reference: c.attribute("r").unwrap_or_default().to_string(),
                text,
                border,
            }
        })
        .collect()
}

/// The first sheet as a real spreadsheet reader sees it, one string per cell.
pub fn read_back(xlsx: &[u8]) -> Vec<Vec<String>> {
    use calamine::{Reader, Xlsx};

    let mut workbook = Xlsx::new(Cursor::new(xlsx.to_vec())).expect("calamine opens the workbook");
    let names = workbook.sheet_names();
    let range = workbook.worksheet_range(&names[0]).expect("first sheet");
    range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

pub fn cell_text<'a>(cells: &'a [SheetCell], reference: &str) -> Option<&'a str> {
    cells
        .iter()
        .find(|c| c.reference == reference)
        .map(|c| c.text.as_str())
}
