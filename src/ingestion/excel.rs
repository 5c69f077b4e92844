#![cfg(feature = "excel")]

use std::collections::VecDeque;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;

use crate::convert::DatePattern;
use crate::error::{ConvertError, ConvertResult};
use crate::types::RawRow;

use super::RowReader;

/// `NaiveDate::num_days_from_ce` of 1899-12-30, day zero of spreadsheet date serials.
const SERIAL_EPOCH_DAYS_FROM_CE: i32 = 693_594;

/// Reads spreadsheet rows (`.xlsx`, `.xls`, `.ods`, etc.) into positional [`RawRow`]s.
///
/// Behavior:
/// - Reads one sheet: the named one, or the first sheet of the workbook
/// - Skips `lines_to_skip` rows at the top of the sheet
/// - Ignores rows with no non-empty cell
/// - Keeps column positions absolute: a sheet whose data starts in column C yields two absent
///   cells first
/// - Renders cells as text: empty cells are absent, integral numbers have no fraction, date
///   cells use `date_pattern`
pub struct SheetReader {
    rows: VecDeque<RawRow>,
}

impl SheetReader {
    /// Open a workbook and read `sheet_name`, or the first sheet when it is `None`.
    pub fn from_path(
        path: impl AsRef<Path>,
        sheet_name: Option<&str>,
        lines_to_skip: usize,
        date_pattern: &DatePattern,
    ) -> ConvertResult<Self> {
        let mut workbook = open_workbook_auto(path)?;

        let available = workbook.sheet_names().to_vec();
        let sheet = match sheet_name {
            Some(name) if available.iter().any(|s| s == name) => name.to_string(),
            Some(name) => {
                return Err(ConvertError::config(format!(
                    "sheet '{name}' not found. sheets={available:?}"
                )));
            }
            None => available
                .first()
                .cloned()
                .ok_or_else(|| ConvertError::config("workbook has no sheets"))?,
        };

        let range = workbook.worksheet_range(&sheet)?;
        let mut rows = VecDeque::new();
        read_sheet_range(&range, lines_to_skip, date_pattern, &mut rows);
        Ok(Self { rows })
    }
}

impl RowReader for SheetReader {
    fn next_row(&mut self) -> ConvertResult<Option<RawRow>> {
        Ok(self.rows.pop_front())
    }
}

fn read_sheet_range(
    range: &calamine::Range<Data>,
    lines_to_skip: usize,
    date_pattern: &DatePattern,
    out: &mut VecDeque<RawRow>,
) {
    let (first_row, first_col) = range.start().unwrap_or((0, 0));

    for (idx0, row) in range.rows().enumerate() {
        let sheet_row = first_row as usize + idx0;
        if sheet_row < lines_to_skip {
            continue;
        }
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let mut cells: Vec<Option<String>> = vec![None; first_col as usize];
        cells.extend(row.iter().map(|c| cell_text(c, date_pattern)));

        // Report 1-based row number (spreadsheet-like).
        out.push_back(RawRow::new(sheet_row + 1, cells));
    }
}

fn cell_text(c: &Data, date_pattern: &DatePattern) -> Option<String> {
    match c {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(float_text(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            let date = (serial.fract() == 0.0)
                .then(|| NaiveDate::from_num_days_from_ce_opt(SERIAL_EPOCH_DAYS_FROM_CE + serial as i32))
                .flatten();
            Some(match date {
                Some(d) => date_pattern.format(d),
                None => dt.to_string(),
            })
        }
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
        Data::Error(e) => Some(e.to_string()),
    }
}

fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(float_text(12.0), "12");
        assert_eq!(float_text(-3.0), "-3");
        assert_eq!(float_text(12.5), "12.5");
    }

    #[test]
    fn empty_cells_are_absent() {
        let p = DatePattern::default();
        assert_eq!(cell_text(&Data::Empty, &p), None);
        assert_eq!(cell_text(&Data::String(String::new()), &p), Some(String::new()));
        assert_eq!(cell_text(&Data::Bool(true), &p), Some("true".to_string()));
    }
}
