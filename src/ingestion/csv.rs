//! Delimited text reader.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::ConvertResult;
use crate::types::RawRow;

use super::RowReader;

/// Options for [`DelimitedReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Leading records to discard (e.g. a header line).
    pub lines_to_skip: usize,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            lines_to_skip: 0,
        }
    }
}

/// Reads delimited text into positional [`RawRow`]s.
///
/// Rules:
///
/// - There is no header handling beyond `lines_to_skip`; columns are positional.
/// - Quoted fields follow RFC 4180 (`"a,b"` is one cell, `""` escapes a quote).
/// - Every line is a row. A blank line is a row with one empty cell, and row numbers are
///   physical line numbers (a quoted field spanning lines numbers its row by the first line).
/// - Rows may have any number of cells; shape is checked by the assembler.
/// - Every cell is present (an empty field is `Some("")`).
pub struct DelimitedReader<R> {
    rdr: csv::Reader<BlankLinesAsRows<R>>,
    record: csv::StringRecord,
    to_skip: usize,
}

impl DelimitedReader<File> {
    /// Open a delimited file.
    pub fn from_path(path: impl AsRef<Path>, options: &DelimitedOptions) -> ConvertResult<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file, options))
    }
}

impl<R: Read> DelimitedReader<R> {
    /// Read delimited text from any reader.
    pub fn from_reader(reader: R, options: &DelimitedOptions) -> Self {
        let input = BlankLinesAsRows::new(reader, options.delimiter);
        Self {
            rdr: builder(options).from_reader(input),
            record: csv::StringRecord::new(),
            to_skip: options.lines_to_skip,
        }
    }
}

fn builder(options: &DelimitedOptions) -> csv::ReaderBuilder {
    let mut b = csv::ReaderBuilder::new();
    b.has_headers(false).flexible(true).delimiter(options.delimiter);
    b
}

/// Where the scanner stands relative to CSV syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    LineStart,
    AfterCr,
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Rewrites each blank line as `""`, a line holding one empty quoted field.
///
/// The `csv` parser drops empty lines without a trace, which would hide them from the shape
/// check and shift every later line number. Newlines inside quoted fields are left alone.
struct BlankLinesAsRows<R> {
    inner: R,
    delimiter: u8,
    state: Scan,
    pending: Vec<u8>,
    pos: usize,
}

impl<R> BlankLinesAsRows<R> {
    fn new(inner: R, delimiter: u8) -> Self {
        Self {
            inner,
            delimiter,
            state: Scan::LineStart,
            pending: Vec::new(),
            pos: 0,
        }
    }

    fn push(&mut self, b: u8) {
        let next = match (self.state, b) {
            (Scan::Quoted, b'"') => Scan::QuoteInQuoted,
            (Scan::Quoted, _) => Scan::Quoted,
            (Scan::QuoteInQuoted, b'"') => Scan::Quoted,
            (Scan::LineStart, b'\n' | b'\r') | (Scan::AfterCr, b'\r') => {
                self.pending.extend_from_slice(b"\"\"");
                if b == b'\r' { Scan::AfterCr } else { Scan::LineStart }
            }
            (Scan::AfterCr, b'\n') => Scan::LineStart,
            (Scan::LineStart | Scan::AfterCr | Scan::FieldStart, b'"') => Scan::Quoted,
            (_, b'\n') => Scan::LineStart,
            (_, b'\r') => Scan::AfterCr,
            (_, d) if d == self.delimiter => Scan::FieldStart,
            _ => Scan::Unquoted,
        };
        self.pending.push(b);
        self.state = next;
    }
}

impl<R: Read> Read for BlankLinesAsRows<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.pending.len() {
            let mut chunk = [0u8; 8 * 1024];
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                return Ok(0);
            }
            self.pending.clear();
            self.pos = 0;
            for &b in &chunk[..n] {
                self.push(b);
            }
        }
        let n = (self.pending.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl<R: Read> RowReader for DelimitedReader<R> {
    fn next_row(&mut self) -> ConvertResult<Option<RawRow>> {
        loop {
            if !self.rdr.read_record(&mut self.record)? {
                return Ok(None);
            }
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            let number = self
                .record
                .position()
                .map_or(0, |p| p.line() as usize);
            let cells = self.record.iter().map(|c| Some(c.to_string())).collect();
            return Ok(Some(RawRow::new(number, cells)));
        }
    }
}
