//! Spreadsheet assembly for the two pipeline paths.

use std::sync::Arc;

use super::document::SpreadsheetDocument;
use super::style::BorderStyle;
use super::xlsx::{SpreadsheetSerializer, XlsxSerializer};
use crate::error::Result;
use crate::ocr::CellTexts;
use crate::ocr::utils::strip_control_characters;
use crate::types::Grid;

/// Grid path: one bordered cell per segmented region.
#[derive(Clone)]
pub struct SpreadsheetBuilder {
    title: String,
    serializer: Arc<dyn SpreadsheetSerializer>,
}

impl SpreadsheetBuilder {
    pub fn new(title: impl Into<String>, border_style: BorderStyle) -> Self {
        Self::with_serializer(title, Arc::new(XlsxSerializer::new(border_style)))
    }

    pub fn with_serializer(title: impl Into<String>, serializer: Arc<dyn SpreadsheetSerializer>) -> Self {
        Self {
            title: title.into(),
            serializer,
        }
    }

    /// Writes exactly one cell per region at its `(row, column)`. A region
    /// without a recognition result is written empty.
    pub fn build_document(&self, grid: &Grid, texts: &CellTexts) -> Result<SpreadsheetDocument> {
        let mut document = SpreadsheetDocument::new(self.title.as_str())?;
        for cell in grid.cells() {
            let text = texts.get(cell).map(|t| t.trim()).unwrap_or_default();
            document.set_cell(cell.row, cell.column, strip_control_characters(text), true)?;
        }
        Ok(document)
    }

    pub fn build(&self, grid: &Grid, texts: &CellTexts) -> Result<Vec<u8>> {
        let document = self.build_document(grid, texts)?;
        self.serializer.serialize(&document)
    }
}

impl Default for SpreadsheetBuilder {
    fn default() -> Self {
        Self::new("Extracted Table", BorderStyle::Thin)
    }
}

/// Fallback path: one non-blank line per row in column A.
#[derive(Clone)]
pub struct TextLineSpreadsheetBuilder {
    title: String,
    serializer: Arc<dyn SpreadsheetSerializer>,
}

impl TextLineSpreadsheetBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_serializer(title, Arc::new(XlsxSerializer::default()))
    }

    pub fn with_serializer(title: impl Into<String>, serializer: Arc<dyn SpreadsheetSerializer>) -> Self {
        Self {
            title: title.into(),
            serializer,
        }
    }

    /// Lines are trimmed; blank lines are skipped and rows numbered densely.
    pub fn build_document(&self, raw_text: &str) -> Result<SpreadsheetDocument> {
        let mut document = SpreadsheetDocument::new(self.title.as_str())?;
        let lines = raw_text.lines().map(str::trim).filter(|line| !line.is_empty());
        for (row, line) in (1u32..).zip(lines) {
            document.set_cell(row, 1, strip_control_characters(line), false)?;
        }
        Ok(document)
    }

    pub fn build(&self, raw_text: &str) -> Result<Vec<u8>> {
        let document = self.build_document(raw_text)?;
        self.serializer.serialize(&document)
    }
}

impl Default for TextLineSpreadsheetBuilder {
    fn default() -> Self {
        Self::new("Extracted Text")
    }
}
