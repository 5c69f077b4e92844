//! Row-level data model.
//!
//! Readers produce [`RawRow`]s (ordered text cells), the assembler turns each one into a
//! [`TypedRecord`] of [`TypedValue`]s matching the record schema.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;

/// One input row, as read from a delimited file or a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based position of the row in its source (line or sheet row).
    pub number: usize,
    /// Ordered cells. `None` marks an absent cell.
    pub cells: Vec<Option<String>>,
}

impl RawRow {
    /// Create a row from already-optional cells.
    pub fn new(number: usize, cells: Vec<Option<String>>) -> Self {
        Self { number, cells }
    }

    /// Create a row where every cell is present.
    pub fn from_strings<I, S>(number: usize, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            number,
            cells: cells.into_iter().map(|c| Some(c.into())).collect(),
        }
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell text at `idx`, or `None` when the cell is absent.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).and_then(|c| c.as_deref())
    }
}

/// A single converted value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Missing value.
    Null,
    Boolean(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    Float(f32),
    Double(f64),
    /// Text passed through unchanged.
    String(String),
    /// Decimal logical value: big-endian two's-complement unscaled integer at `scale`.
    Decimal { unscaled: Vec<u8>, scale: u32 },
    /// Date logical value: days since 1970-01-01.
    Date(i32),
}

impl TypedValue {
    /// Returns `true` for [`TypedValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Decode a [`TypedValue::Decimal`] back into a [`BigDecimal`].
    ///
    /// Returns `None` for other variants or an empty unscaled value.
    pub fn decode_decimal(&self) -> Option<BigDecimal> {
        let Self::Decimal { unscaled, scale } = self else {
            return None;
        };
        if unscaled.is_empty() {
            return None;
        }
        Some(BigDecimal::new(
            BigInt::from_signed_bytes_be(unscaled),
            i64::from(*scale),
        ))
    }
}

/// A converted row: `(field name, value)` pairs in schema field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedRecord {
    fields: Vec<(String, TypedValue)>,
}

impl TypedRecord {
    /// Create an empty record with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Set a field value. Fields are kept in insertion order.
    pub fn set(&mut self, name: impl Into<String>, value: TypedValue) {
        self.fields.push((name.into(), value));
    }

    /// Look up a value by field name.
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate `(name, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Consume the record into its `(name, value)` pairs.
    pub fn into_fields(self) -> Vec<(String, TypedValue)> {
        self.fields
    }
}
