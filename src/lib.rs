//! `text-to-avro` converts delimited text and spreadsheet rows into Avro object container files,
//! driven by an Avro record schema.
//!
//! Every input row is read as ordered text cells ([`types::RawRow`]). Field *i* of the record
//! schema takes column *i*, and its declared type decides how the text is converted:
//!
//! - `["null", T]` unions resolve to `T`; an empty cell (or the configured null token) is null
//! - `decimal(p, s)` values are parsed exactly and encoded as big-endian two's-complement bytes
//! - `date` values are parsed with a configurable pattern and stored as days since 1970-01-01
//! - `int`, `long`, `float`, `double` and `boolean` are parsed from text
//! - everything else keeps the raw text
//!
//! ## What you can read
//!
//! - **Delimited text**: any extension except the spreadsheet ones, with a configurable
//!   single-byte delimiter and a number of leading lines to skip
//! - **Spreadsheets** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! ## Quick example: convert one row
//!
//! ```rust
//! use text_to_avro::assembler::RecordAssembler;
//! use text_to_avro::convert::ConversionConfig;
//! use text_to_avro::schema::RecordSchema;
//! use text_to_avro::types::{RawRow, TypedValue};
//!
//! # fn main() -> Result<(), text_to_avro::ConvertError> {
//! let schema = RecordSchema::parse_str(
//!     r#"{
//!         "type": "record",
//!         "name": "Payment",
//!         "fields": [
//!             {"name": "id", "type": "int"},
//!             {"name": "amount", "type": ["null", {"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2}]}
//!         ]
//!     }"#,
//! )?;
//! let assembler = RecordAssembler::new(schema, &ConversionConfig::default())?;
//!
//! let record = assembler.assemble(&RawRow::from_strings(1, ["7", "12.3"]))?;
//! assert_eq!(record.get("id"), Some(&TypedValue::Int(7)));
//! assert_eq!(
//!     record.get("amount").and_then(|v| v.decode_decimal()).map(|d| d.to_string()),
//!     Some("12.30".to_string())
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick example: convert a file
//!
//! ```no_run
//! use text_to_avro::config::JobConfig;
//! use text_to_avro::execution::convert_file;
//!
//! # fn main() -> Result<(), text_to_avro::ConvertError> {
//! let config = JobConfig {
//!     input_file: Some("members.csv".into()),
//!     schema_file: Some("member.avsc".into()),
//!     lines_to_skip: 1,
//!     ..Default::default()
//! };
//! let stats = convert_file(&config, None)?;
//! println!("rows={} chunks={}", stats.rows, stats.chunks);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: record schema parsing and field type resolution
//! - [`convert`]: per-value conversion rules
//! - [`assembler`]: one raw row into one typed record
//! - [`ingestion`]: delimited text and spreadsheet row readers
//! - [`output`]: Avro container output
//! - [`execution`]: chunked runs, observers and metrics
//! - [`config`]: job configuration
//! - [`error`]: error types used across the crate

pub mod assembler;
pub mod config;
pub mod convert;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod output;
pub mod schema;
pub mod types;

pub use error::{ConvertError, ConvertResult};
