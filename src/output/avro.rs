//! Avro object container output.

use std::io::Write;

use apache_avro::types::Value;
use apache_avro::{Decimal, Schema, Writer};

use crate::error::{ConvertError, ConvertResult};
use crate::schema::RecordSchema;
use crate::types::{TypedRecord, TypedValue};

use super::RecordSink;

/// Parse the Avro writer schema for a record schema.
pub fn avro_schema(schema: &RecordSchema) -> ConvertResult<Schema> {
    Ok(Schema::parse(schema.definition())?)
}

/// Map a converted value onto its Avro datum.
///
/// Union branches are not chosen here; [`AvroContainerWriter`] resolves every record against
/// the writer schema before appending it.
pub fn to_avro_value(value: &TypedValue) -> Value {
    match value {
        TypedValue::Null => Value::Null,
        TypedValue::Boolean(b) => Value::Boolean(*b),
        TypedValue::Int(i) => Value::Int(*i),
        TypedValue::Long(l) => Value::Long(*l),
        TypedValue::Float(f) => Value::Float(*f),
        TypedValue::Double(d) => Value::Double(*d),
        TypedValue::String(s) => Value::String(s.clone()),
        TypedValue::Decimal { unscaled, .. } => Value::Decimal(Decimal::from(unscaled.clone())),
        TypedValue::Date(days) => Value::Date(*days),
    }
}

fn to_avro_record(record: &TypedRecord) -> Value {
    Value::Record(
        record
            .iter()
            .map(|(name, value)| (name.to_string(), to_avro_value(value)))
            .collect(),
    )
}

/// Writes records to an Avro object container (codec `null`).
///
/// Each chunk is flushed as one container block, so a failed run leaves a readable prefix of
/// whole chunks.
pub struct AvroContainerWriter<'a, W: Write> {
    schema: &'a Schema,
    writer: Option<Writer<'a, W>>,
    records_written: u64,
}

impl<'a, W: Write> AvroContainerWriter<'a, W> {
    /// Create a container writer over `out`.
    pub fn new(schema: &'a Schema, out: W) -> Self {
        Self {
            schema,
            writer: Some(Writer::new(schema, out)),
            records_written: 0,
        }
    }

    /// Number of records appended so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Finish the container and return the underlying writer.
    pub fn into_inner(mut self) -> ConvertResult<W> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| ConvertError::config("avro writer already finished"))?;
        Ok(writer.into_inner()?)
    }

    fn append(&mut self, record: &TypedRecord) -> ConvertResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ConvertError::config("avro writer already finished"))?;
        let value = to_avro_record(record).resolve(self.schema)?;
        writer.append(value)?;
        self.records_written += 1;
        Ok(())
    }
}

impl<W: Write> RecordSink for AvroContainerWriter<'_, W> {
    fn write_chunk(&mut self, records: &[TypedRecord]) -> ConvertResult<()> {
        for record in records {
            self.append(record)?;
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> ConvertResult<()> {
        if let Some(writer) = self.writer.take() {
            let mut out = writer.into_inner()?;
            out.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use apache_avro::Reader;

    use super::*;
    use crate::schema::{FieldSchema, PrimitiveType};

    fn schema() -> RecordSchema {
        RecordSchema::new(
            "row",
            vec![
                ("id".to_string(), FieldSchema::Primitive(PrimitiveType::Long)),
                (
                    "note".to_string(),
                    FieldSchema::nullable(FieldSchema::Primitive(PrimitiveType::String)),
                ),
            ],
        )
        .unwrap()
    }

    fn record(id: i64, note: Option<&str>) -> TypedRecord {
        let mut r = TypedRecord::with_capacity(2);
        r.set("id", TypedValue::Long(id));
        r.set(
            "note",
            note.map_or(TypedValue::Null, |n| TypedValue::String(n.to_string())),
        );
        r
    }

    #[test]
    fn writes_readable_container_with_union_branches() {
        let avro = avro_schema(&schema()).unwrap();
        let mut sink = AvroContainerWriter::new(&avro, Vec::new());
        sink.write_chunk(&[record(1, Some("a")), record(2, None)]).unwrap();
        assert_eq!(sink.records_written(), 2);
        let bytes = sink.into_inner().unwrap();

        let values: Vec<Value> = Reader::new(&bytes[..])
            .unwrap()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(
            values,
            vec![
                Value::Record(vec![
                    ("id".to_string(), Value::Long(1)),
                    (
                        "note".to_string(),
                        Value::Union(1, Box::new(Value::String("a".to_string())))
                    ),
                ]),
                Value::Record(vec![
                    ("id".to_string(), Value::Long(2)),
                    ("note".to_string(), Value::Union(0, Box::new(Value::Null))),
                ]),
            ]
        );
    }

    #[test]
    fn empty_output_is_still_a_container() {
        let avro = avro_schema(&schema()).unwrap();
        let sink = AvroContainerWriter::new(&avro, Vec::new());
        let bytes = sink.into_inner().unwrap();
        assert!(bytes.starts_with(b"Obj\x01"));
        assert_eq!(Reader::new(&bytes[..]).unwrap().count(), 0);
    }

    #[test]
    fn null_for_required_field_is_rejected() {
        let avro = avro_schema(&schema()).unwrap();
        let mut sink = AvroContainerWriter::new(&avro, Vec::new());
        let mut r = TypedRecord::with_capacity(2);
        r.set("id", TypedValue::Null);
        r.set("note", TypedValue::Null);
        assert!(matches!(sink.write_chunk(&[r]), Err(ConvertError::Avro(_))));
    }
}
