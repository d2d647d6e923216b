//! In-memory sheet model handed to a serializer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::config::MAX_SHEET_TITLE_LEN;
use crate::error::{Result, TablescanError};

const FORBIDDEN_TITLE_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Describes why `title` cannot name a worksheet, or `None` if it can.
pub(crate) fn sheet_title_problem(title: &str) -> Option<String> {
    let len = title.chars().count();
    if len == 0 || len > MAX_SHEET_TITLE_LEN {
        return Some(format!("must be 1 to {} characters, got {}", MAX_SHEET_TITLE_LEN, len));
    }
    if let Some(c) = title.chars().find(|c| FORBIDDEN_TITLE_CHARS.contains(c)) {
        return Some(format!("'{}' contains forbidden character '{}'", title, c));
    }
    if title.starts_with('\'') || title.ends_with('\'') {
        return Some(format!("'{}' must not start or end with an apostrophe", title));
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellValue {
    pub text: String,
    pub bordered: bool,
}

/// One titled sheet with a sparse `(row, column) -> value` map; both indices
/// are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadsheetDocument {
    title: String,
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl SpreadsheetDocument {
    pub fn new(title: impl Into<String>) -> Result<Self> {
        let title = title.into();
        if let Some(problem) = sheet_title_problem(&title) {
            return Err(TablescanError::serialization(format!("Sheet title {}", problem)));
        }

        Ok(Self {
            title,
            cells: BTreeMap::new(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Writes a cell. Each position may be written once; a second write is an
    /// error rather than a silent overwrite.
    pub fn set_cell(&mut self, row: u32, column: u32, text: impl Into<String>, bordered: bool) -> Result<()> {
        if row == 0 || column == 0 {
            return Err(TablescanError::serialization(format!(
                "Cell indices are 1-based, got ({}, {})",
                row, column
            )));
        }

        let value = CellValue {
            text: text.into(),
            bordered,
        };
        if self.cells.insert((row, column), value).is_some() {
            return Err(TablescanError::serialization(format!(
                "Cell ({}, {}) written twice",
                row, column
            )));
        }
        Ok(())
    }

    pub fn get(&self, row: u32, column: u32) -> Option<&CellValue> {
        self.cells.get(&(row, column))
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &CellValue)> {
        self.cells.iter().map(|(pos, value)| (*pos, value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Largest row and column index in use, `(0, 0)` when empty.
    pub fn extent(&self) -> (u32, u32) {
        self.cells
            .keys()
            .fold((0, 0), |(rows, cols), &(r, c)| (rows.max(r), cols.max(c)))
    }
}
