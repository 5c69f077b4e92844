use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use apache_avro::types::Value;
use apache_avro::Reader;
use text_to_avro::config::JobConfig;
use text_to_avro::execution::convert_file;
use text_to_avro::types::TypedValue;
use text_to_avro::ConvertError;

fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("text-to-avro-{name}-{nanos}.{ext}"))
}

fn member_config(input: impl Into<PathBuf>, output: &Path) -> JobConfig {
    JobConfig {
        input_file: Some(input.into()),
        schema_file: Some(PathBuf::from("tests/fixtures/member.avsc")),
        output_file: output.to_path_buf(),
        lines_to_skip: 1,
        ..Default::default()
    }
}

fn read_back(path: &Path) -> Vec<Value> {
    let reader = Reader::new(File::open(path).unwrap()).unwrap();
    reader.map(|v| v.unwrap()).collect()
}

fn field<'a>(record: &'a Value, name: &str) -> &'a Value {
    let Value::Record(fields) = record else {
        panic!("expected a record, got {record:?}");
    };
    let value = &fields.iter().find(|(n, _)| n == name).unwrap().1;
    match value {
        Value::Union(_, inner) => inner.as_ref(),
        other => other,
    }
}

fn decimal_text(value: &Value, scale: u32) -> String {
    let Value::Decimal(d) = value else {
        panic!("expected a decimal, got {value:?}");
    };
    let unscaled = Vec::<u8>::try_from(d).unwrap();
    TypedValue::Decimal { unscaled, scale }
        .decode_decimal()
        .unwrap()
        .to_string()
}

fn members_csv(rows: &[&str]) -> PathBuf {
    let path = tmp_file("members", "csv");
    let mut text = String::from("name,amount,joined,visits,active\n");
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn csv_fixture_converts_to_readable_container() {
    let out = tmp_file("fixture", "avro");
    let stats = convert_file(&member_config("tests/fixtures/members.csv", &out), None).unwrap();
    assert_eq!((stats.rows, stats.chunks), (3, 1));

    let records = read_back(&out);
    assert_eq!(records.len(), 3);

    let alice = &records[0];
    assert_eq!(field(alice, "name"), &Value::String("Alice".to_string()));
    assert_eq!(decimal_text(field(alice, "amount"), 2), "12.30");
    assert_eq!(field(alice, "joined"), &Value::Date(19_359));
    assert_eq!(field(alice, "visits"), &Value::Int(3));
    assert_eq!(field(alice, "active"), &Value::Boolean(true));

    let bob = &records[1];
    assert_eq!(field(bob, "amount"), &Value::Null);
    assert_eq!(field(bob, "visits"), &Value::Null);
    assert_eq!(field(bob, "active"), &Value::Boolean(false));

    let carol = &records[2];
    assert_eq!(field(carol, "name"), &Value::String("Smith, Carol".to_string()));
    assert_eq!(decimal_text(field(carol, "amount"), 2), "-0.50");
    assert_eq!(field(carol, "joined"), &Value::Date(19_357));
    assert_eq!(field(carol, "visits"), &Value::Int(10));

    std::fs::remove_file(&out).unwrap();
}

#[test]
fn delimiter_date_pattern_and_null_token_are_configurable() {
    let out = tmp_file("semicolon", "avro");
    let cfg = JobConfig {
        delimiter: ';',
        lines_to_skip: 2,
        date_pattern: "dd/MM/yyyy".to_string(),
        null_token: "NULL".to_string(),
        ..member_config("tests/fixtures/members_semicolon.txt", &out)
    };
    convert_file(&cfg, None).unwrap();

    let records = read_back(&out);
    assert_eq!(records.len(), 1);
    assert_eq!(field(&records[0], "name"), &Value::String("Dora".to_string()));
    assert_eq!(decimal_text(field(&records[0], "amount"), 2), "1.50");
    assert_eq!(field(&records[0], "joined"), &Value::Date(19_523));
    assert_eq!(field(&records[0], "visits"), &Value::Null);

    std::fs::remove_file(&out).unwrap();
}

#[test]
fn rows_are_flushed_in_chunks_and_keep_order() {
    let rows: Vec<String> = (0..25)
        .map(|i| format!("m{i},{i}.25,2023-01-02,{i},true"))
        .collect();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let input = members_csv(&refs);
    let out = tmp_file("chunks", "avro");

    let stats = convert_file(&member_config(&input, &out), None).unwrap();
    assert_eq!((stats.rows, stats.chunks), (25, 3));

    let records = read_back(&out);
    let names: Vec<&Value> = records.iter().map(|r| field(r, "name")).collect();
    let expected: Vec<Value> = (0..25).map(|i| Value::String(format!("m{i}"))).collect();
    assert_eq!(names, expected.iter().collect::<Vec<_>>());

    std::fs::remove_file(&input).unwrap();
    std::fs::remove_file(&out).unwrap();
}

#[test]
fn failing_row_aborts_and_earlier_chunks_stay_readable() {
    let input = members_csv(&[
        "a,1,2023-01-01,1,true",
        "b,2,2023-01-01,2,true",
        "c,3,2023-01-01,3,true",
        "d,4,2023-01-01,four,true",
        "e,5,2023-01-01,5,true",
    ]);
    let out = tmp_file("abort", "avro");
    let cfg = JobConfig {
        chunk_size: 2,
        ..member_config(&input, &out)
    };

    let err = convert_file(&cfg, None).unwrap_err();
    match err {
        ConvertError::Parse {
            row, column, raw, ..
        } => {
            assert_eq!(row, 5);
            assert_eq!(column, "visits");
            assert_eq!(raw, "four");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }

    let records = read_back(&out);
    assert_eq!(records.len(), 2);
    assert_eq!(field(&records[1], "name"), &Value::String("b".to_string()));

    std::fs::remove_file(&input).unwrap();
    std::fs::remove_file(&out).unwrap();
}

#[test]
fn inexact_decimal_is_an_arithmetic_error() {
    let input = members_csv(&["a,1.005,2023-01-01,1,true"]);
    let out = tmp_file("inexact", "avro");

    let err = convert_file(&member_config(&input, &out), None).unwrap_err();
    assert!(matches!(err, ConvertError::Arithmetic { row: 2, .. }));

    std::fs::remove_file(&input).unwrap();
    let _ = std::fs::remove_file(&out);
}

#[test]
fn short_row_is_a_shape_error() {
    let input = members_csv(&["a,1,2023-01-01,1"]);
    let out = tmp_file("shape", "avro");

    let err = convert_file(&member_config(&input, &out), None).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::RowShape {
            row: 2,
            expected: 5,
            actual: 4
        }
    ));

    std::fs::remove_file(&input).unwrap();
    let _ = std::fs::remove_file(&out);
}

#[test]
fn missing_input_does_not_create_output() {
    let out = tmp_file("missing", "avro");
    let err = convert_file(&member_config("tests/fixtures/does_not_exist.csv", &out), None)
        .unwrap_err();
    assert!(matches!(err, ConvertError::Io(_)));
    assert!(!out.exists());
}

#[test]
fn bad_schema_is_rejected_before_reading() {
    let schema = tmp_file("bad-schema", "avsc");
    std::fs::write(
        &schema,
        r#"{"type": "record", "name": "Bad", "fields": [{"name": "x", "type": ["null", ["int"]]}]}"#,
    )
    .unwrap();
    let out = tmp_file("bad-schema", "avro");
    let cfg = JobConfig {
        schema_file: Some(schema.clone()),
        ..member_config("tests/fixtures/members.csv", &out)
    };

    let err = convert_file(&cfg, None).unwrap_err();
    assert!(matches!(err, ConvertError::Schema { .. }));
    assert!(!out.exists());

    std::fs::remove_file(&schema).unwrap();
}
