use serde_json::{Map, Value as Json};

use crate::error::{ConvertError, ConvertResult};

use super::{
    ComplexType, DecimalRepr, DecimalSpec, Field, FieldSchema, LogicalType, PrimitiveType,
};

pub(super) fn parse_record(json: &Json) -> ConvertResult<(String, Option<String>, Vec<Field>)> {
    let obj = json
        .as_object()
        .ok_or_else(|| ConvertError::schema("top-level schema must be a JSON object"))?;

    match obj.get("type").and_then(Json::as_str) {
        Some("record") => {}
        Some(other) => {
            return Err(ConvertError::schema(format!(
                "top-level schema must be a record, got '{other}'"
            )));
        }
        None => return Err(ConvertError::schema("top-level schema has no 'type'")),
    }

    let name = required_str(obj, "name", "record")?.to_string();
    let namespace = obj
        .get("namespace")
        .and_then(Json::as_str)
        .map(str::to_string);

    let raw_fields = obj
        .get("fields")
        .and_then(Json::as_array)
        .ok_or_else(|| ConvertError::schema(format!("record '{name}' has no 'fields' array")))?;

    let mut fields = Vec::with_capacity(raw_fields.len());
    for (position, raw) in raw_fields.iter().enumerate() {
        let field_obj = raw.as_object().ok_or_else(|| {
            ConvertError::schema(format!("field {position} of '{name}' is not an object"))
        })?;
        let field_name = required_str(field_obj, "name", "field")?;
        let ty = field_obj.get("type").ok_or_else(|| {
            ConvertError::schema(format!("field '{field_name}' has no 'type'"))
        })?;
        let schema = parse_field_schema(ty).map_err(|e| match e {
            ConvertError::Schema { message } => {
                ConvertError::schema(format!("field '{field_name}': {message}"))
            }
            other => other,
        })?;
        fields.push(Field {
            name: field_name.to_string(),
            schema,
            position,
        });
    }

    Ok((name, namespace, fields))
}

/// Parse one Avro type definition into a [`FieldSchema`].
pub fn parse_field_schema(json: &Json) -> ConvertResult<FieldSchema> {
    match json {
        Json::String(name) => Ok(named(name, json)),
        Json::Array(members) => parse_union(members),
        Json::Object(obj) => parse_object(obj, json),
        other => Err(ConvertError::schema(format!(
            "expected a type name, union or object, got {other}"
        ))),
    }
}

fn parse_union(members: &[Json]) -> ConvertResult<FieldSchema> {
    if members.is_empty() {
        return Err(ConvertError::schema("union has no members"));
    }
    let mut out = Vec::with_capacity(members.len());
    for m in members {
        let schema = parse_field_schema(m)?;
        if matches!(schema, FieldSchema::Union(_)) {
            return Err(ConvertError::schema("unions may not immediately contain unions"));
        }
        out.push(schema);
    }
    Ok(FieldSchema::Union(out))
}

fn parse_object(obj: &Map<String, Json>, json: &Json) -> ConvertResult<FieldSchema> {
    let ty = obj
        .get("type")
        .ok_or_else(|| ConvertError::schema(format!("type object has no 'type': {json}")))?;

    let base = match ty {
        Json::String(name) => match name.as_str() {
            "record" | "error" | "enum" | "array" | "map" | "fixed" => {
                FieldSchema::Complex(ComplexType {
                    type_name: name.clone(),
                    definition: json.clone(),
                })
            }
            other => named(other, ty),
        },
        nested => parse_field_schema(nested)?,
    };

    let Some(logical) = obj.get("logicalType").and_then(Json::as_str) else {
        return Ok(base);
    };

    match (logical, &base) {
        ("decimal", FieldSchema::Primitive(PrimitiveType::Bytes)) => {
            decimal(obj, DecimalRepr::Bytes)
        }
        ("decimal", FieldSchema::Complex(c)) if c.type_name == "fixed" => {
            let size = obj
                .get("size")
                .and_then(Json::as_u64)
                .ok_or_else(|| ConvertError::schema("fixed decimal has no 'size'"))?;
            decimal(obj, DecimalRepr::Fixed { size: size as usize })
        }
        ("date", FieldSchema::Primitive(PrimitiveType::Int)) => {
            Ok(FieldSchema::Logical(LogicalType::Date))
        }
        // Anything else, including decimal or date on another base, converts as the base.
        _ => Ok(base),
    }
}

fn decimal(obj: &Map<String, Json>, repr: DecimalRepr) -> ConvertResult<FieldSchema> {
    let precision = obj
        .get("precision")
        .and_then(Json::as_u64)
        .ok_or_else(|| ConvertError::schema("decimal requires an integer 'precision'"))?;
    let scale = match obj.get("scale") {
        None => 0,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| ConvertError::schema("decimal 'scale' must be an integer"))?,
    };
    let precision = u32::try_from(precision)
        .map_err(|_| ConvertError::schema(format!("decimal precision {precision} is too large")))?;
    let scale = u32::try_from(scale)
        .map_err(|_| ConvertError::schema(format!("decimal scale {scale} is too large")))?;
    DecimalSpec::with_repr(precision, scale, repr).map(|d| FieldSchema::Logical(LogicalType::Decimal(d)))
}

fn named(name: &str, json: &Json) -> FieldSchema {
    if name == "null" {
        return FieldSchema::Null;
    }
    match PrimitiveType::from_name(name) {
        Some(p) => FieldSchema::Primitive(p),
        None => FieldSchema::Complex(ComplexType {
            type_name: name.to_string(),
            definition: json.clone(),
        }),
    }
}

fn required_str<'a>(obj: &'a Map<String, Json>, key: &str, what: &str) -> ConvertResult<&'a str> {
    obj.get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| ConvertError::schema(format!("{what} has no '{key}'")))
}
