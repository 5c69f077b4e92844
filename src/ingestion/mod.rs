//! Row readers.
//!
//! Readers turn an input file into a stream of [`RawRow`]s; they never interpret cell text.
//! Most callers should use [`open_reader`] (from [`unified`]), which picks the reader from the
//! file extension (or from [`IngestionOptions::format`]).
//!
//! Format-specific readers are also available under:
//! - [`csv`]
//! - [`excel`] (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod unified;

use crate::error::ConvertResult;
use crate::types::RawRow;

pub use unified::{open_reader, ExcelSheetSelection, IngestionFormat, IngestionOptions};

/// A source of raw rows.
pub trait RowReader {
    /// Read the next row, or `None` at end of input.
    fn next_row(&mut self) -> ConvertResult<Option<RawRow>>;
}

impl<T: RowReader + ?Sized> RowReader for Box<T> {
    fn next_row(&mut self) -> ConvertResult<Option<RawRow>> {
        (**self).next_row()
    }
}

/// A reader over rows already in memory.
#[derive(Debug, Clone, Default)]
pub struct VecReader {
    rows: std::collections::VecDeque<RawRow>,
}

impl VecReader {
    /// Create a reader yielding `rows` in order.
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows: rows.into() }
    }
}

impl RowReader for VecReader {
    fn next_row(&mut self) -> ConvertResult<Option<RawRow>> {
        Ok(self.rows.pop_front())
    }
}
