//! Job configuration.
//!
//! A [`JobConfig`] can be loaded from a JSON file; every field has a default so a file only needs
//! the values it changes:
//!
//! ```json
//! {
//!   "input_file": "members.csv",
//!   "schema_file": "member.avsc",
//!   "output_file": "members.avro",
//!   "delimiter": ";",
//!   "lines_to_skip": 1,
//!   "date_pattern": "dd/MM/yyyy"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::convert::{ConversionConfig, DatePattern, DEFAULT_DATE_PATTERN};
use crate::error::{ConvertError, ConvertResult};
use crate::execution::{JobOptions, DEFAULT_CHUNK_SIZE};
use crate::ingestion::{ExcelSheetSelection, IngestionOptions};

/// Default output path.
pub const DEFAULT_OUTPUT_FILE: &str = "out.avro";

/// Settings for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Delimited text or spreadsheet to read.
    pub input_file: Option<PathBuf>,
    /// Avro record schema (JSON).
    pub schema_file: Option<PathBuf>,
    /// Avro container to write.
    pub output_file: PathBuf,
    /// Field delimiter for delimited text. Must be a single ASCII character.
    pub delimiter: char,
    /// Leading lines (or sheet rows) to discard.
    pub lines_to_skip: usize,
    /// Letter pattern for date fields and spreadsheet date cells.
    pub date_pattern: String,
    /// Cell text treated as null.
    pub null_token: String,
    /// Rows per flushed chunk.
    pub chunk_size: usize,
    /// Worker threads used to assemble a chunk.
    pub threads: usize,
    /// Sheet to read from a workbook; the first sheet when unset.
    pub sheet: Option<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            input_file: None,
            schema_file: None,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            delimiter: ',',
            lines_to_skip: 0,
            date_pattern: DEFAULT_DATE_PATTERN.to_string(),
            null_token: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: 1,
            sheet: None,
        }
    }
}

impl JobConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> ConvertResult<Self> {
        match path {
            Some(path) => {
                debug!(path = %path.display(), "loading job config");
                Self::from_json_str(&std::fs::read_to_string(path)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse a config from JSON text.
    pub fn from_json_str(text: &str) -> ConvertResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check values that cannot be caught by deserialization.
    pub fn validate(&self) -> ConvertResult<()> {
        if self.chunk_size == 0 {
            return Err(ConvertError::config("chunk_size must be > 0"));
        }
        if self.threads == 0 {
            return Err(ConvertError::config("threads must be > 0"));
        }
        if !self.delimiter.is_ascii() {
            return Err(ConvertError::config(format!(
                "delimiter must be a single-byte character, got '{}'",
                self.delimiter
            )));
        }
        if matches!(&self.sheet, Some(s) if s.is_empty()) {
            return Err(ConvertError::config("sheet name is empty"));
        }
        DatePattern::compile(&self.date_pattern)?;
        Ok(())
    }

    /// Settings for the conversion rule set.
    pub fn conversion_config(&self) -> ConversionConfig {
        ConversionConfig {
            date_pattern: self.date_pattern.clone(),
            null_token: self.null_token.clone(),
        }
    }

    /// Settings for opening the input reader.
    pub fn ingestion_options(&self) -> ConvertResult<IngestionOptions> {
        self.validate()?;
        Ok(IngestionOptions {
            format: None,
            delimiter: self.delimiter as u8,
            lines_to_skip: self.lines_to_skip,
            excel_sheet_selection: self
                .sheet
                .clone()
                .map_or(ExcelSheetSelection::First, ExcelSheetSelection::Sheet),
            date_pattern: DatePattern::compile(&self.date_pattern)?,
        })
    }

    /// Settings for the chunked job.
    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            chunk_size: self.chunk_size,
            num_threads: self.threads,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = JobConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, JobConfig::default());
        assert_eq!(cfg.output_file, PathBuf::from("out.avro"));
        assert_eq!(cfg.chunk_size, 10);
        assert_eq!(cfg.date_pattern, "yyyy-MM-dd");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let cfg = JobConfig::from_json_str(
            r#"{"delimiter": "\t", "lines_to_skip": 2, "sheet": "Members", "threads": 4}"#,
        )
        .unwrap();
        assert_eq!(cfg.delimiter, '\t');
        assert_eq!(cfg.lines_to_skip, 2);
        assert_eq!(cfg.threads, 4);
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);

        let opts = cfg.ingestion_options().unwrap();
        assert_eq!(opts.delimiter, b'\t');
        assert_eq!(
            opts.excel_sheet_selection,
            ExcelSheetSelection::Sheet("Members".to_string())
        );
        assert_eq!(cfg.job_options().num_threads, 4);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cfg = JobConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConvertError::Config { .. })));

        let cfg = JobConfig {
            delimiter: '§',
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = JobConfig {
            date_pattern: "yyyy-QQ".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_ignored_but_bad_types_fail() {
        assert!(JobConfig::from_json_str(r#"{"extra": true}"#).is_ok());
        let err = JobConfig::from_json_str(r#"{"chunk_size": "ten"}"#).unwrap_err();
        assert!(matches!(err, ConvertError::Json(_)));
    }
}
