//! Reader selection.
//!
//! [`open_reader`] opens a row reader for a path:
//!
//! - If [`IngestionOptions::format`] is `None`, spreadsheet extensions (`xlsx`, `xls`, `xlsm`,
//!   `xlsb`, `ods`) select the spreadsheet reader and everything else is read as delimited text.
//! - Delimiter and skipped lines apply to delimited text; skipped lines also apply to the sheet.

use std::path::Path;

use crate::convert::DatePattern;
use crate::error::ConvertResult;

use super::csv::{DelimitedOptions, DelimitedReader};
use super::RowReader;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Delimited text (CSV, TSV, pipe-separated, ...).
    Delimited,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Infer the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Self::Excel,
            _ => Self::Delimited,
        }
    }

    /// Infer the format from a path; paths without an extension are delimited text.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|s| s.to_str())
            .map_or(Self::Delimited, Self::from_extension)
    }
}

/// Which sheet to read from a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExcelSheetSelection {
    /// Read the first sheet (default).
    #[default]
    First,
    /// Read a single named sheet.
    Sheet(String),
}

/// Options controlling reader selection and reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOptions {
    /// If `None`, infer the format from the file extension.
    pub format: Option<IngestionFormat>,
    /// Field delimiter for delimited text.
    pub delimiter: u8,
    /// Leading lines (or sheet rows) to discard.
    pub lines_to_skip: usize,
    /// Spreadsheet-specific sheet choice.
    pub excel_sheet_selection: ExcelSheetSelection,
    /// Pattern used to render spreadsheet date cells as text.
    pub date_pattern: DatePattern,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            delimiter: b',',
            lines_to_skip: 0,
            excel_sheet_selection: ExcelSheetSelection::default(),
            date_pattern: DatePattern::default(),
        }
    }
}

/// Open a row reader for `path`.
///
/// ```no_run
/// use text_to_avro::ingestion::{open_reader, IngestionOptions, RowReader};
///
/// # fn main() -> Result<(), text_to_avro::ConvertError> {
/// let opts = IngestionOptions {
///     lines_to_skip: 1,
///     ..Default::default()
/// };
/// let mut reader = open_reader("people.csv", &opts)?;
/// while let Some(row) = reader.next_row()? {
///     println!("row {} has {} cells", row.number, row.len());
/// }
/// # Ok(())
/// # }
/// ```
pub fn open_reader(
    path: impl AsRef<Path>,
    options: &IngestionOptions,
) -> ConvertResult<Box<dyn RowReader + Send>> {
    let path = path.as_ref();
    let format = options
        .format
        .unwrap_or_else(|| IngestionFormat::from_path(path));

    match format {
        IngestionFormat::Delimited => {
            let opts = DelimitedOptions {
                delimiter: options.delimiter,
                lines_to_skip: options.lines_to_skip,
            };
            Ok(Box::new(DelimitedReader::from_path(path, &opts)?))
        }
        IngestionFormat::Excel => open_excel(path, options),
    }
}

fn open_excel(path: &Path, options: &IngestionOptions) -> ConvertResult<Box<dyn RowReader + Send>> {
    // Avoid unused warnings when the feature is off.
    let _ = (path, options);

    #[cfg(feature = "excel")]
    {
        use super::excel::SheetReader;

        let sheet = match &options.excel_sheet_selection {
            ExcelSheetSelection::First => None,
            ExcelSheetSelection::Sheet(name) => Some(name.as_str()),
        };
        let reader = SheetReader::from_path(
            path,
            sheet,
            options.lines_to_skip,
            &options.date_pattern,
        )?;
        Ok(Box::new(reader))
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(crate::error::ConvertError::config(
            "spreadsheet input not enabled (enable cargo feature 'excel')",
        ))
    }
}
