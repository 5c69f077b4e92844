use thiserror::Error;

/// Convenience result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Error type returned by schema loading, row conversion and the conversion job.
///
/// Every variant is fatal for the run: the job never skips a row or retries a value.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet reading error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Delimited text reading error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Avro container writing error.
    #[error("avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    /// Schema or configuration text is not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema definition is malformed or a field type cannot be resolved.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// Job configuration is invalid.
    #[error("config error: {message}")]
    Config { message: String },

    /// A raw row does not have one column per schema field.
    #[error("row {row} has {actual} columns, schema declares {expected} fields")]
    RowShape {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A value does not match the textual format of its declared type.
    #[error("failed to parse value at row {row} field '{column}': {message} (raw='{raw}')")]
    Parse {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// A value parses but cannot be represented exactly at the declared precision or scale.
    #[error("inexact value at row {row} field '{column}': {message} (raw='{raw}')")]
    Arithmetic {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

impl ConvertError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
