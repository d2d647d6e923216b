//! XLSX serialization through `rust_xlsxwriter`.
//!
//! One workbook with one worksheet named after the document title. Bordered
//! cells share a single format with all four edges in the configured style;
//! bordered cells without text are still written as blank formatted cells so
//! the grid stays visible.

use rust_xlsxwriter::{ColNum, Format, FormatBorder, RowNum, Workbook, Worksheet};

use super::document::{CellValue, SpreadsheetDocument};
use super::style::BorderStyle;
use crate::error::{Result, TablescanError};

/// Turns a [`SpreadsheetDocument`] into file bytes.
pub trait SpreadsheetSerializer: Send + Sync {
    fn serialize(&self, document: &SpreadsheetDocument) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSerializer {
    border_style: BorderStyle,
}

impl XlsxSerializer {
    pub fn new(border_style: BorderStyle) -> Self {
        Self { border_style }
    }

    pub fn border_style(&self) -> BorderStyle {
        self.border_style
    }

    fn bordered_format(&self) -> Format {
        Format::new().set_border(format_border(self.border_style))
    }
}

impl SpreadsheetSerializer for XlsxSerializer {
    fn serialize(&self, document: &SpreadsheetDocument) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let bordered = self.bordered_format();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(document.title())?;
        for ((row, column), value) in document.cells() {
            write_cell(worksheet, row, column, value, &bordered)?;
        }

        let bytes = workbook.save_to_buffer()?;
        tracing::debug!(
            sheet = document.title(),
            cells = document.len(),
            bytes = bytes.len(),
            "Serialized workbook"
        );
        Ok(bytes)
    }
}

fn write_cell(worksheet: &mut Worksheet, row: u32, column: u32, value: &CellValue, bordered: &Format) -> Result<()> {
    let (row, column) = zero_based(row, column)?;
    match (value.text.is_empty(), value.bordered) {
        (true, true) => worksheet.write_blank(row, column, bordered)?,
        (true, false) => return Ok(()),
        (false, true) => worksheet.write_string_with_format(row, column, &value.text, bordered)?,
        (false, false) => worksheet.write_string(row, column, &value.text)?,
    };
    Ok(())
}

fn zero_based(row: u32, column: u32) -> Result<(RowNum, ColNum)> {
    let col = column
        .checked_sub(1)
        .and_then(|c| ColNum::try_from(c).ok())
        .ok_or_else(|| TablescanError::serialization(format!("Column {} is out of range", column)))?;
    let row = row
        .checked_sub(1)
        .ok_or_else(|| TablescanError::serialization(format!("Row {} is out of range", row)))?;
    Ok((row, col))
}

fn format_border(style: BorderStyle) -> FormatBorder {
    match style {
        BorderStyle::Thin => FormatBorder::Thin,
        BorderStyle::Medium => FormatBorder::Medium,
        BorderStyle::Thick => FormatBorder::Thick,
        BorderStyle::Dashed => FormatBorder::Dashed,
        BorderStyle::Dotted => FormatBorder::Dotted,
        BorderStyle::Double => FormatBorder::Double,
        BorderStyle::Hair => FormatBorder::Hair,
    }
}

/// 1 -> `A`, 26 -> `Z`, 27 -> `AA`.
pub fn column_name(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// `A1`-style reference for a 1-based position.
pub fn cell_reference(row: u32, column: u32) -> String {
    format!("{}{}", column_name(column), row)
}
