//! Record assembly: one [`RawRow`] in, one [`TypedRecord`] out.
//!
//! Field *i* of the schema reads column *i* of the row. Assembly is all-or-nothing: the first
//! failing field aborts the row with its row number, field name and raw text attached.
//!
//! ```rust
//! use text_to_avro::assembler::RecordAssembler;
//! use text_to_avro::convert::ConversionConfig;
//! use text_to_avro::schema::{FieldSchema, LogicalType, PrimitiveType, RecordSchema};
//! use text_to_avro::types::{RawRow, TypedValue};
//!
//! # fn main() -> Result<(), text_to_avro::ConvertError> {
//! let schema = RecordSchema::new(
//!     "member",
//!     vec![
//!         ("name".to_string(), FieldSchema::Primitive(PrimitiveType::String)),
//!         ("amount".to_string(), FieldSchema::decimal(10, 2)?),
//!         ("joined".to_string(), FieldSchema::Logical(LogicalType::Date)),
//!     ],
//! )?;
//! let assembler = RecordAssembler::new(schema, &ConversionConfig::default())?;
//!
//! let record = assembler.assemble(&RawRow::from_strings(1, ["Alice", "12.30", "2023-01-02"]))?;
//! assert_eq!(record.get("name"), Some(&TypedValue::String("Alice".to_string())));
//! assert_eq!(record.get("joined"), Some(&TypedValue::Date(19_359)));
//! # Ok(())
//! # }
//! ```

use crate::convert::{ConversionConfig, RuleKind, RuleSet, ValueError};
use crate::error::{ConvertError, ConvertResult};
use crate::schema::{RecordSchema, resolve};
use crate::types::{RawRow, TypedRecord};

/// Converts raw rows against a fixed record schema.
///
/// Field resolution happens once, at construction; a schema whose fields cannot be resolved is
/// rejected before any row is read.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    schema: RecordSchema,
    rules: RuleSet,
    plan: Vec<RuleKind>,
}

impl RecordAssembler {
    /// Resolve every field of `schema` and compile `config`.
    pub fn new(schema: RecordSchema, config: &ConversionConfig) -> ConvertResult<Self> {
        let rules = RuleSet::new(config)?;
        Self::with_rules(schema, rules)
    }

    /// Build an assembler around an existing rule set.
    pub fn with_rules(schema: RecordSchema, rules: RuleSet) -> ConvertResult<Self> {
        let plan = schema
            .fields
            .iter()
            .map(|field| {
                resolve(&field.schema).map(RuleKind::for_schema).map_err(|e| match e {
                    ConvertError::Schema { message } => {
                        ConvertError::schema(format!("field '{}': {message}", field.name))
                    }
                    other => other,
                })
            })
            .collect::<ConvertResult<Vec<_>>>()?;
        Ok(Self {
            schema,
            rules,
            plan,
        })
    }

    /// The schema records are assembled against.
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// The rule set values are converted with.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Convert one raw row into a typed record.
    pub fn assemble(&self, row: &RawRow) -> ConvertResult<TypedRecord> {
        check_shape(&self.schema, row)?;
        let mut record = TypedRecord::with_capacity(self.schema.len());
        for (field, rule) in self.schema.fields.iter().zip(&self.plan) {
            let raw = row.get(field.position);
            let value = self
                .rules
                .convert_with(*rule, raw)
                .map_err(|e| with_context(e, row.number, &field.name, raw))?;
            record.set(field.name.clone(), value);
        }
        Ok(record)
    }
}

/// Convert one raw row without a prepared [`RecordAssembler`].
///
/// Resolves each field schema on every call.
pub fn assemble(schema: &RecordSchema, rules: &RuleSet, row: &RawRow) -> ConvertResult<TypedRecord> {
    check_shape(schema, row)?;
    let mut record = TypedRecord::with_capacity(schema.len());
    for field in &schema.fields {
        let raw = row.get(field.position);
        let resolved = resolve(&field.schema)?;
        let value = rules
            .convert(resolved, raw)
            .map_err(|e| with_context(e, row.number, &field.name, raw))?;
        record.set(field.name.clone(), value);
    }
    Ok(record)
}

fn check_shape(schema: &RecordSchema, row: &RawRow) -> ConvertResult<()> {
    if row.len() != schema.len() {
        return Err(ConvertError::RowShape {
            row: row.number,
            expected: schema.len(),
            actual: row.len(),
        });
    }
    Ok(())
}

fn with_context(err: ValueError, row: usize, column: &str, raw: Option<&str>) -> ConvertError {
    let raw = raw.unwrap_or_default().to_string();
    let column = column.to_string();
    match err {
        ValueError::Parse(message) => ConvertError::Parse {
            row,
            column,
            raw,
            message,
        },
        ValueError::Arithmetic(message) => ConvertError::Arithmetic {
            row,
            column,
            raw,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, PrimitiveType};
    use crate::types::TypedValue;

    fn schema_of(n: usize) -> RecordSchema {
        let fields = (0..n)
            .map(|i| (format!("c{i}"), FieldSchema::Primitive(PrimitiveType::Int)))
            .collect();
        RecordSchema::new("wide", fields).unwrap()
    }

    #[test]
    fn short_row_is_shape_error() {
        let assembler = RecordAssembler::new(schema_of(5), &ConversionConfig::default()).unwrap();
        let err = assembler
            .assemble(&RawRow::from_strings(3, ["1", "2", "3", "4"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::RowShape {
                row: 3,
                expected: 5,
                actual: 4
            }
        ));
    }

    #[test]
    fn long_row_is_shape_error() {
        let rules = RuleSet::new(&ConversionConfig::default()).unwrap();
        let err = assemble(&schema_of(1), &rules, &RawRow::from_strings(1, ["1", "2"])).unwrap_err();
        assert!(matches!(err, ConvertError::RowShape { .. }));
    }

    #[test]
    fn failure_carries_row_and_field_context() {
        let assembler = RecordAssembler::new(schema_of(2), &ConversionConfig::default()).unwrap();
        let err = assembler
            .assemble(&RawRow::from_strings(7, ["1", "2.5"]))
            .unwrap_err();
        match err {
            ConvertError::Arithmetic { row, column, raw, .. } => {
                assert_eq!(row, 7);
                assert_eq!(column, "c1");
                assert_eq!(raw, "2.5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unresolvable_field_fails_at_construction() {
        let schema = RecordSchema::new(
            "bad",
            vec![("nothing".to_string(), FieldSchema::Union(vec![FieldSchema::Null]))],
        )
        .unwrap();
        let err = RecordAssembler::new(schema, &ConversionConfig::default()).unwrap_err();
        assert!(err.to_string().contains("field 'nothing'"));
    }

    #[test]
    fn memoized_and_direct_assembly_agree() {
        let schema = schema_of(3);
        let assembler = RecordAssembler::new(schema.clone(), &ConversionConfig::default()).unwrap();
        let row = RawRow::new(1, vec![Some("1".to_string()), None, Some("3.0".to_string())]);
        let a = assembler.assemble(&row).unwrap();
        let b = assemble(&schema, assembler.rules(), &row).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get("c1"), Some(&TypedValue::Null));
        assert_eq!(a.get("c2"), Some(&TypedValue::Int(3)));
    }
}
