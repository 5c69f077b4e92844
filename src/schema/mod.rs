//! Record schemas and field type resolution.
//!
//! A [`RecordSchema`] is loaded once from an Avro schema definition (JSON) and is immutable for
//! the run. Each [`Field`] carries a [`FieldSchema`] tree; [`resolve`] collapses nullable unions
//! to the single schema values are converted against.

mod parse;

use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::{Value as Json, json};

use crate::error::{ConvertError, ConvertResult};

pub use parse::parse_field_schema;

/// Avro primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveType {
    /// Avro type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
        }
    }

    /// Parse an Avro primitive type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Boolean),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "bytes" => Some(Self::Bytes),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// Wire representation of a decimal logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalRepr {
    /// Variable-length `bytes`.
    Bytes,
    /// `fixed` of `size` bytes.
    Fixed { size: usize },
}

/// Parameters of a decimal logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalSpec {
    /// Maximum number of significant digits.
    pub precision: u32,
    /// Digits after the decimal point.
    pub scale: u32,
    pub repr: DecimalRepr,
}

impl DecimalSpec {
    /// Create a `bytes`-backed decimal, validating precision and scale.
    pub fn new(precision: u32, scale: u32) -> ConvertResult<Self> {
        Self::with_repr(precision, scale, DecimalRepr::Bytes)
    }

    /// Create a decimal with an explicit wire representation.
    pub fn with_repr(precision: u32, scale: u32, repr: DecimalRepr) -> ConvertResult<Self> {
        if precision == 0 {
            return Err(ConvertError::schema("decimal precision must be positive"));
        }
        if scale > precision {
            return Err(ConvertError::schema(format!(
                "decimal scale ({scale}) cannot exceed precision ({precision})"
            )));
        }
        if let DecimalRepr::Fixed { size } = repr {
            let max = max_precision_for_width(size);
            if max < precision {
                return Err(ConvertError::schema(format!(
                    "fixed({size}) holds at most {max} decimal digits, precision is {precision}"
                )));
            }
        }
        Ok(Self {
            precision,
            scale,
            repr,
        })
    }

    /// Number of bytes every encoded value of this decimal occupies.
    ///
    /// For `fixed` this is the declared size; for `bytes` it is the smallest two's-complement
    /// width able to hold `precision` digits.
    pub fn wire_width(&self) -> usize {
        match self.repr {
            DecimalRepr::Fixed { size } => size,
            DecimalRepr::Bytes => {
                // Start from the estimate and correct for float error in either direction.
                let bits = f64::from(self.precision) / std::f64::consts::LOG10_2 + 1.0;
                let mut width = ((bits / 8.0).ceil() as usize).max(1);
                while width > 1 && max_precision_for_width(width - 1) >= self.precision {
                    width -= 1;
                }
                while max_precision_for_width(width) < self.precision {
                    width += 1;
                }
                width
            }
        }
    }
}

/// Number of decimal digits always representable in a signed two's-complement integer of
/// `width` bytes.
pub fn max_precision_for_width(width: usize) -> u32 {
    if width == 0 {
        return 0;
    }
    let bits = (8 * width - 1) as f64;
    (bits * std::f64::consts::LOG10_2).floor() as u32
}

/// Logical refinements of a primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Decimal(DecimalSpec),
    /// Days since the Unix epoch, refined from `int`.
    Date,
}

/// A named or complex Avro type that values pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    /// Avro type name (`record`, `enum`, `array`, `map`, `fixed`) or a named type reference.
    pub type_name: String,
    /// The definition as it appeared in the schema.
    pub definition: Json,
}

/// Declared type of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSchema {
    Null,
    Primitive(PrimitiveType),
    /// Ordered union members, typically `[null, T]`.
    Union(Vec<FieldSchema>),
    Logical(LogicalType),
    Complex(ComplexType),
}

impl FieldSchema {
    /// Convenience for the common `["null", T]` union.
    pub fn nullable(inner: FieldSchema) -> Self {
        Self::Union(vec![Self::Null, inner])
    }

    /// A `bytes`-backed decimal.
    pub fn decimal(precision: u32, scale: u32) -> ConvertResult<Self> {
        DecimalSpec::new(precision, scale).map(|d| Self::Logical(LogicalType::Decimal(d)))
    }

    /// Avro JSON form of this schema.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => json!("null"),
            Self::Primitive(p) => json!(p.name()),
            Self::Union(members) => Json::Array(members.iter().map(Self::to_json).collect()),
            Self::Logical(LogicalType::Date) => json!({"type": "int", "logicalType": "date"}),
            Self::Logical(LogicalType::Decimal(spec)) => match spec.repr {
                DecimalRepr::Bytes => json!({
                    "type": "bytes",
                    "logicalType": "decimal",
                    "precision": spec.precision,
                    "scale": spec.scale,
                }),
                DecimalRepr::Fixed { size } => json!({
                    "type": "fixed",
                    "name": format!("decimal_{}_{}", spec.precision, spec.scale),
                    "size": size,
                    "logicalType": "decimal",
                    "precision": spec.precision,
                    "scale": spec.scale,
                }),
            },
            Self::Complex(c) => c.definition.clone(),
        }
    }
}

impl fmt::Display for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Union(members) => {
                f.write_str("[")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{m}")?;
                }
                f.write_str("]")
            }
            Self::Logical(LogicalType::Date) => f.write_str("date"),
            Self::Logical(LogicalType::Decimal(d)) => {
                write!(f, "decimal({},{})", d.precision, d.scale)
            }
            Self::Complex(c) => f.write_str(&c.type_name),
        }
    }
}

/// Result of resolving a [`FieldSchema`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    /// The field is declared as `null`.
    Null,
    /// The concrete, non-null, non-union schema to convert against.
    Proper(&'a FieldSchema),
}

/// Strip nullable union wrapping.
///
/// Unions resolve to their first member that resolves to a proper schema; a union without one
/// is a schema error. `null` resolves to [`Resolved::Null`]; anything else resolves to itself.
pub fn resolve(schema: &FieldSchema) -> ConvertResult<Resolved<'_>> {
    match schema {
        FieldSchema::Union(members) => {
            for member in members {
                if let Resolved::Proper(proper) = resolve(member)? {
                    return Ok(Resolved::Proper(proper));
                }
            }
            Err(ConvertError::schema(format!(
                "union {schema} has no non-null branch"
            )))
        }
        FieldSchema::Null => Ok(Resolved::Null),
        other => Ok(Resolved::Proper(other)),
    }
}

/// A single named field of a [`RecordSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: FieldSchema,
    /// Index of the raw column this field reads.
    pub position: usize,
}

/// Ordered, named fields of the records being produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub fields: Vec<Field>,
    definition: Json,
}

impl RecordSchema {
    /// Build a schema programmatically. Field positions follow the given order.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<(String, FieldSchema)>,
    ) -> ConvertResult<Self> {
        let name = name.into();
        let fields: Vec<Field> = fields
            .into_iter()
            .enumerate()
            .map(|(position, (name, schema))| Field {
                name,
                schema,
                position,
            })
            .collect();
        check_field_names(&fields)?;

        let definition = json!({
            "type": "record",
            "name": name,
            "fields": fields
                .iter()
                .map(|f| json!({"name": f.name, "type": f.schema.to_json()}))
                .collect::<Vec<_>>(),
        });

        Ok(Self {
            name,
            namespace: None,
            fields,
            definition,
        })
    }

    /// Parse an Avro record schema from JSON text.
    pub fn parse_str(text: &str) -> ConvertResult<Self> {
        let definition: Json = serde_json::from_str(text)?;
        let (name, namespace, fields) = parse::parse_record(&definition)?;
        check_field_names(&fields)?;
        Ok(Self {
            name,
            namespace,
            fields,
            definition,
        })
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// The Avro JSON definition this schema was built from.
    pub fn definition(&self) -> &Json {
        &self.definition
    }
}

/// Load a record schema from an Avro schema file (`.avsc`).
pub fn load_schema(path: impl AsRef<Path>) -> ConvertResult<RecordSchema> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    RecordSchema::parse_str(&text).map_err(|e| match e {
        ConvertError::Schema { message } => {
            ConvertError::schema(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

fn check_field_names(fields: &[Field]) -> ConvertResult<()> {
    if fields.is_empty() {
        return Err(ConvertError::schema("record declares no fields"));
    }
    for (i, f) in fields.iter().enumerate() {
        if f.name.is_empty() {
            return Err(ConvertError::schema(format!("field {i} has an empty name")));
        }
        if fields[..i].iter().any(|other| other.name == f.name) {
            return Err(ConvertError::schema(format!(
                "duplicate field name '{}'",
                f.name
            )));
        }
    }
    Ok(())
}
