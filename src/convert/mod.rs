//! Schema-directed value conversion.
//!
//! A [`RuleSet`] turns one raw text cell into a [`TypedValue`] according to the resolved field
//! schema. Rules are tried in a fixed order and the first one that applies wins:
//!
//! 1. null (absent cell or the configured null token), for every schema
//! 2. decimal logical type: exact parse, rescale without rounding, two's-complement bytes
//! 3. date logical type: parse with the configured pattern, days since 1970-01-01
//! 4. `int`, then `long`: value-exact (`"10.0"` is accepted, `"10.5"` is not)
//! 5. `float`, `double`, `boolean`
//! 6. fallback: the raw text unchanged
//!
//! ```rust
//! use text_to_avro::convert::{ConversionConfig, RuleSet};
//! use text_to_avro::schema::{resolve, FieldSchema, PrimitiveType};
//! use text_to_avro::types::TypedValue;
//!
//! let rules = RuleSet::new(&ConversionConfig::default()).unwrap();
//! let field = FieldSchema::nullable(FieldSchema::Primitive(PrimitiveType::Int));
//! let resolved = resolve(&field).unwrap();
//!
//! assert_eq!(rules.convert(resolved, Some("10.0")).unwrap(), TypedValue::Int(10));
//! assert_eq!(rules.convert(resolved, Some("")).unwrap(), TypedValue::Null);
//! assert!(rules.convert(resolved, Some("10.5")).is_err());
//! ```

pub mod date;
mod decimal;

use bigdecimal::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConvertResult;
use crate::schema::{DecimalSpec, FieldSchema, LogicalType, PrimitiveType, Resolved};
use crate::types::TypedValue;

pub use date::{DatePattern, DEFAULT_DATE_PATTERN};

/// Field-level conversion failure, before row and field context is attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The text does not match the format of the declared type.
    #[error("{0}")]
    Parse(String),
    /// The text parses but cannot be represented exactly.
    #[error("{0}")]
    Arithmetic(String),
}

/// Shared, read-only settings for the rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Letter pattern for date fields.
    pub date_pattern: String,
    /// Cell text treated as null (in addition to absent cells).
    pub null_token: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            date_pattern: DEFAULT_DATE_PATTERN.to_string(),
            null_token: String::new(),
        }
    }
}

/// Which rule applies to a resolved schema, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The field is declared `null`; only null values are accepted.
    Null,
    Decimal(DecimalSpec),
    Date,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    /// Raw text is kept as a string.
    Passthrough,
}

impl RuleKind {
    /// Select the rule for a resolved schema.
    pub fn for_schema(resolved: Resolved<'_>) -> Self {
        let schema = match resolved {
            Resolved::Null => return Self::Null,
            Resolved::Proper(schema) => schema,
        };
        match schema {
            FieldSchema::Logical(LogicalType::Decimal(spec)) => Self::Decimal(*spec),
            FieldSchema::Logical(LogicalType::Date) => Self::Date,
            FieldSchema::Primitive(PrimitiveType::Int) => Self::Int,
            FieldSchema::Primitive(PrimitiveType::Long) => Self::Long,
            FieldSchema::Primitive(PrimitiveType::Float) => Self::Float,
            FieldSchema::Primitive(PrimitiveType::Double) => Self::Double,
            FieldSchema::Primitive(PrimitiveType::Boolean) => Self::Boolean,
            _ => Self::Passthrough,
        }
    }
}

/// The ordered conversion rules, bound to one [`ConversionConfig`].
///
/// Immutable once built; safe to share across threads.
#[derive(Debug, Clone)]
pub struct RuleSet {
    date_pattern: DatePattern,
    null_token: String,
}

impl RuleSet {
    /// Build a rule set, compiling the date pattern.
    pub fn new(config: &ConversionConfig) -> ConvertResult<Self> {
        Ok(Self {
            date_pattern: DatePattern::compile(&config.date_pattern)?,
            null_token: config.null_token.clone(),
        })
    }

    /// The compiled date pattern.
    pub fn date_pattern(&self) -> &DatePattern {
        &self.date_pattern
    }

    /// Returns `true` if `raw` stands for a null value.
    pub fn is_null(&self, raw: Option<&str>) -> bool {
        match raw {
            None => true,
            Some(s) => s == self.null_token,
        }
    }

    /// Convert one raw value against a resolved schema.
    pub fn convert(&self, resolved: Resolved<'_>, raw: Option<&str>) -> Result<TypedValue, ValueError> {
        self.convert_with(RuleKind::for_schema(resolved), raw)
    }

    /// Convert one raw value with an already-selected rule.
    pub fn convert_with(&self, rule: RuleKind, raw: Option<&str>) -> Result<TypedValue, ValueError> {
        let text = match raw {
            Some(text) if !self.is_null(raw) => text,
            _ => return Ok(TypedValue::Null),
        };

        match rule {
            RuleKind::Null => Err(ValueError::Parse("field is declared null".to_string())),
            RuleKind::Decimal(spec) => Ok(TypedValue::Decimal {
                unscaled: decimal::encode(&spec, text)?,
                scale: spec.scale,
            }),
            RuleKind::Date => self.date_pattern.parse_days(text).map(TypedValue::Date),
            RuleKind::Int => {
                let v = decimal::parse_integral(text, 10)?;
                v.to_i32()
                    .map(TypedValue::Int)
                    .ok_or_else(|| ValueError::Arithmetic(format!("{v} is out of range for int")))
            }
            RuleKind::Long => {
                let v = decimal::parse_integral(text, 19)?;
                v.to_i64()
                    .map(TypedValue::Long)
                    .ok_or_else(|| ValueError::Arithmetic(format!("{v} is out of range for long")))
            }
            RuleKind::Float => parse_float::<f32>(text).map(TypedValue::Float),
            RuleKind::Double => parse_float::<f64>(text).map(TypedValue::Double),
            RuleKind::Boolean => parse_bool(text.trim())
                .map(TypedValue::Boolean)
                .map_err(ValueError::Parse),
            RuleKind::Passthrough => Ok(TypedValue::String(text.to_string())),
        }
    }
}

/// Parse straight into the target width, so `float` rounds once.
///
/// Finite text that overflows the type is an error; `inf` and `NaN` spelled out are accepted.
fn parse_float<F>(text: &str) -> Result<F, ValueError>
where
    F: std::str::FromStr<Err = std::num::ParseFloatError> + Into<f64> + Copy,
{
    let t = text.trim();
    let v = t
        .parse::<F>()
        .map_err(|e| ValueError::Parse(format!("expected a number: {e}")))?;
    let spelled_out = t.trim_start_matches(['+', '-']).starts_with(['i', 'I', 'n', 'N']);
    if !v.into().is_finite() && !spelled_out {
        return Err(ValueError::Arithmetic(format!("{t} is out of range")));
    }
    Ok(v)
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::schema::resolve;

    fn rules() -> RuleSet {
        RuleSet::new(&ConversionConfig::default()).unwrap()
    }

    fn convert(schema: &FieldSchema, raw: &str) -> Result<TypedValue, ValueError> {
        rules().convert(resolve(schema).unwrap(), Some(raw))
    }

    fn int() -> FieldSchema {
        FieldSchema::Primitive(PrimitiveType::Int)
    }

    #[test]
    fn null_rule_wins_for_every_schema() {
        let schemas = vec![
            int(),
            FieldSchema::decimal(10, 2).unwrap(),
            FieldSchema::Logical(LogicalType::Date),
            FieldSchema::Primitive(PrimitiveType::String),
            FieldSchema::Null,
            FieldSchema::nullable(int()),
        ];
        let r = rules();
        for s in &schemas {
            let resolved = resolve(s).unwrap();
            assert_eq!(r.convert(resolved, None).unwrap(), TypedValue::Null, "{s}");
            assert_eq!(r.convert(resolved, Some("")).unwrap(), TypedValue::Null, "{s}");
        }
    }

    #[test]
    fn custom_null_token() {
        let r = RuleSet::new(&ConversionConfig {
            null_token: "NULL".to_string(),
            ..Default::default()
        })
        .unwrap();
        let s = FieldSchema::Primitive(PrimitiveType::String);
        let resolved = resolve(&s).unwrap();
        assert_eq!(r.convert(resolved, Some("NULL")).unwrap(), TypedValue::Null);
        assert_eq!(
            r.convert(resolved, Some("")).unwrap(),
            TypedValue::String(String::new())
        );
    }

    #[test]
    fn decimal_round_trips_at_declared_scale() {
        let s = FieldSchema::nullable(FieldSchema::decimal(10, 2).unwrap());
        for text in ["12.30", "12.3", "-0.01", "99999999.99", "0"] {
            let v = convert(&s, text).unwrap();
            assert_eq!(v.decode_decimal(), Some(BigDecimal::from_str(text).unwrap()), "{text}");
            assert!(matches!(v, TypedValue::Decimal { scale: 2, .. }));
        }
    }

    #[test]
    fn decimal_never_rounds() {
        let s = FieldSchema::decimal(10, 2).unwrap();
        assert!(matches!(convert(&s, "1.005"), Err(ValueError::Arithmetic(_))));
        assert!(matches!(convert(&s, "abc"), Err(ValueError::Parse(_))));
    }

    #[test]
    fn date_rule_uses_configured_pattern() {
        let s = FieldSchema::Logical(LogicalType::Date);
        assert_eq!(convert(&s, "2023-06-15").unwrap(), TypedValue::Date(19_523));
        assert!(matches!(convert(&s, "15/06/2023"), Err(ValueError::Parse(_))));

        let r = RuleSet::new(&ConversionConfig {
            date_pattern: "dd/MM/yyyy".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            r.convert(resolve(&s).unwrap(), Some("15/06/2023")).unwrap(),
            TypedValue::Date(19_523)
        );
    }

    #[test]
    fn bad_date_pattern_fails_construction() {
        let err = RuleSet::new(&ConversionConfig {
            date_pattern: "yyyy-QQ".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("unsupported date pattern letter"));
    }

    #[test]
    fn int_rule_is_value_exact() {
        assert_eq!(convert(&int(), "10").unwrap(), TypedValue::Int(10));
        assert_eq!(convert(&int(), "10.0").unwrap(), TypedValue::Int(10));
        assert_eq!(convert(&int(), " -7 ").unwrap(), TypedValue::Int(-7));
        assert!(matches!(convert(&int(), "10.5"), Err(ValueError::Arithmetic(_))));
        assert!(matches!(convert(&int(), "3000000000"), Err(ValueError::Arithmetic(_))));
        assert!(matches!(convert(&int(), "ten"), Err(ValueError::Parse(_))));
        let padded = format!("10.{}", "0".repeat(35));
        assert_eq!(convert(&int(), &padded).unwrap(), TypedValue::Int(10));
        assert!(matches!(convert(&int(), "1e40"), Err(ValueError::Arithmetic(_))));
    }

    #[test]
    fn long_float_double_and_boolean() {
        let long = FieldSchema::Primitive(PrimitiveType::Long);
        assert_eq!(convert(&long, "3000000000").unwrap(), TypedValue::Long(3_000_000_000));
        assert!(matches!(convert(&long, "1.25"), Err(ValueError::Arithmetic(_))));

        let double = FieldSchema::Primitive(PrimitiveType::Double);
        assert_eq!(convert(&double, "98.5").unwrap(), TypedValue::Double(98.5));
        assert!(matches!(convert(&double, "x"), Err(ValueError::Parse(_))));

        let float = FieldSchema::Primitive(PrimitiveType::Float);
        assert_eq!(convert(&float, "0.5").unwrap(), TypedValue::Float(0.5));
        // just above the midpoint between 1.0 and the next f32
        assert_eq!(
            convert(&float, "1.000000059604644776").unwrap(),
            TypedValue::Float(f32::from_bits(1.0f32.to_bits() + 1))
        );
        assert!(matches!(convert(&float, "1e39"), Err(ValueError::Arithmetic(_))));
        assert!(matches!(convert(&double, "1e309"), Err(ValueError::Arithmetic(_))));
        assert_eq!(convert(&float, "-inf").unwrap(), TypedValue::Float(f32::NEG_INFINITY));

        let boolean = FieldSchema::Primitive(PrimitiveType::Boolean);
        assert_eq!(convert(&boolean, "Yes").unwrap(), TypedValue::Boolean(true));
        assert_eq!(convert(&boolean, "0").unwrap(), TypedValue::Boolean(false));
        assert!(convert(&boolean, "maybe").is_err());
    }

    #[test]
    fn fallback_passes_text_through_unchanged() {
        let s = FieldSchema::Primitive(PrimitiveType::String);
        assert_eq!(
            convert(&s, "hello").unwrap(),
            TypedValue::String("hello".to_string())
        );
        assert_eq!(
            convert(&s, "  padded ").unwrap(),
            TypedValue::String("  padded ".to_string())
        );
    }

    #[test]
    fn null_schema_rejects_values() {
        assert!(matches!(
            convert(&FieldSchema::Null, "x"),
            Err(ValueError::Parse(_))
        ));
    }

    #[test]
    fn rule_selection_follows_schema_kind() {
        let cases = [
            (FieldSchema::Null, RuleKind::Null),
            (FieldSchema::Logical(LogicalType::Date), RuleKind::Date),
            (int(), RuleKind::Int),
            (FieldSchema::Primitive(PrimitiveType::Bytes), RuleKind::Passthrough),
        ];
        for (schema, expected) in cases {
            assert_eq!(RuleKind::for_schema(resolve(&schema).unwrap()), expected);
        }
    }
}
