//! Spreadsheet output.
//!
//! Builders turn a grid (or plain text) into a [`SpreadsheetDocument`]; a
//! [`SpreadsheetSerializer`] turns the document into file bytes.

pub mod builder;
pub mod document;
pub mod style;
pub mod xlsx;

pub use builder::{SpreadsheetBuilder, TextLineSpreadsheetBuilder};
pub use document::{CellValue, SpreadsheetDocument};
pub use style::BorderStyle;
pub use xlsx::{SpreadsheetSerializer, XlsxSerializer, cell_reference, column_name};
