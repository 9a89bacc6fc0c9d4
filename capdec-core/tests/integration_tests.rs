//! Integration tests decoding capture containers unpacked on disk.
//!
//! Run with: cargo test --test integration_tests

use capdec_core::{
    encode_records, parse_dir, Column, ColumnData, DecodedTable, Diagnostic, ParseError,
    ParseOptions, RecordError, StreamLayout, TypeTag,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str = r#"{
    "version": "2.1",
    "configurations": {
        "gpsConfiguration": {"channels": [
            {"name": "lat", "type": "double"},
            {"name": "lon", "type": "double"},
            {"name": "flag", "type": "uint8"}
        ]},
        "imuConfiguration": {"channels": [
            {"name": "ax", "type": "float32"},
            {"name": "quat", "type": "quaternion"},
            {"name": "gz", "type": "int16"}
        ]},
        "pathConfiguration": {"channels": [
            {"name": "x", "type": "float"},
            {"name": "y", "type": "float"}
        ]}
    },
    "recordCount": 2
}"#;

fn write_container(files: Vec<(&str, Vec<u8>)>) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, bytes) in files {
        fs::write(dir.path().join(name), bytes).unwrap();
    }
    dir
}

fn header() -> Vec<u8> {
    HEADER.as_bytes().to_vec()
}

fn gps_blob() -> Vec<u8> {
    let layout = StreamLayout::new(
        "gpsConfiguration",
        [
            ("lat", TypeTag::Double),
            ("lon", TypeTag::Double),
            ("flag", TypeTag::UChar),
        ],
    )
    .unwrap();
    let table = DecodedTable {
        columns: vec![
            Column::new("lat", ColumnData::Double(vec![1.0, 3.0])),
            Column::new("lon", ColumnData::Double(vec![2.0, 4.0])),
            Column::new("flag", ColumnData::UChar(vec![7, 9])),
        ],
        row_count: 2,
    };
    encode_records(&layout, &table).unwrap()
}

fn imu_blob() -> Vec<u8> {
    // Unknown "quat" channel takes no bytes: ax (4) + gz (2) per record
    let mut blob = Vec::new();
    for (ax, gz) in [(0.5f32, -3i16), (1.5, 12)] {
        blob.extend_from_slice(&ax.to_le_bytes());
        blob.extend_from_slice(&gz.to_le_bytes());
    }
    blob
}

fn decode(dir: &Path) -> capdec_core::ResultAggregate {
    parse_dir(dir, &ParseOptions::default()).expect("Failed to decode container")
}

/// The three-field GPS blob decodes into typed, named columns.
#[test]
fn test_decode_gps_blob() {
    let gps = gps_blob();
    assert_eq!(gps.len(), 34);
    let dir = write_container(vec![("header.json", header()), ("gps.bin", gps)]);

    let result = decode(dir.path());
    let table = result.table("gps").unwrap();
    assert_eq!(table.column_names(), vec!["lat", "lon", "flag"]);
    assert_eq!(table.column("lat").unwrap().data, ColumnData::Double(vec![1.0, 3.0]));
    assert_eq!(table.column("lon").unwrap().data, ColumnData::Double(vec![2.0, 4.0]));
    assert_eq!(table.column("flag").unwrap().data, ColumnData::UChar(vec![7, 9]));

    let array = &result.data()["gps"];
    assert_eq!((array.rows, array.cols), (2, 3));
    assert_eq!(array.values, vec![1.0, 2.0, 7.0, 3.0, 4.0, 9.0]);
}

/// A pre-shaped array is labeled with its configuration's field names.
#[test]
fn test_path_array_labeled() {
    let dir = write_container(vec![
        ("header.json", header()),
        ("path.json", b"[[0.0, 1.0], [2.5, 3.5], [4.0, 5.0]]".to_vec()),
    ]);

    let result = decode(dir.path());
    let table = result.table("path").unwrap();
    assert_eq!(table.column_names(), vec!["x", "y"]);
    assert_eq!(table.row_count, 3);
    assert_eq!(
        table.column("y").unwrap().data,
        ColumnData::Double(vec![1.0, 3.5, 5.0])
    );
    assert_eq!(result.data()["path"].rows, 3);
}

/// Entries without a configuration or a known shape are dropped, and the
/// parse still succeeds.
#[test]
fn test_unknown_sensor_is_skipped() {
    let dir = write_container(vec![
        ("header.json", header()),
        ("gps.bin", gps_blob()),
        ("unknownSensor.bin", vec![1, 2, 3]),
        ("camera.mp4", vec![0, 0, 0, 1]),
    ]);

    let result = decode(dir.path());
    assert!(!result.data().contains_key("unknownSensor"));
    assert!(!result.tables().contains_key("unknownSensor"));
    assert!(!result.data().contains_key("camera"));
    assert!(result.data().contains_key("gps"));

    assert!(result.diagnostics().contains(&Diagnostic::UnboundStream {
        stream: "unknownSensor".to_string()
    }));
    assert!(result.diagnostics().contains(&Diagnostic::UnrecognizedStreamType {
        stream: "camera".to_string(),
        kind: "mp4".to_string()
    }));
}

/// An unknown channel type takes no bytes and is absent from the output while
/// its siblings still decode.
#[test]
fn test_unknown_type_skipped_siblings_decode() {
    let dir = write_container(vec![("header.json", header()), ("imu.bin", imu_blob())]);

    let result = decode(dir.path());
    let table = result.table("imu").unwrap();
    assert_eq!(table.column_names(), vec!["ax", "gz"]);
    assert_eq!(table.column("ax").unwrap().data, ColumnData::Float32(vec![0.5, 1.5]));
    assert_eq!(table.column("gz").unwrap().data, ColumnData::Int16(vec![-3, 12]));

    assert!(result.diagnostics().contains(&Diagnostic::UnsupportedFieldType {
        key: "imuConfiguration".to_string(),
        field: "quat".to_string(),
        type_name: "quaternion".to_string(),
    }));
}

/// A wrong-sized blob fails only its own stream.
#[test]
fn test_record_count_mismatch_is_isolated() {
    let mut short = gps_blob();
    short.pop();
    let dir = write_container(vec![
        ("header.json", header()),
        ("gps.bin", short),
        ("imu.bin", imu_blob()),
    ]);

    let result = decode(dir.path());
    assert!(!result.data().contains_key("gps"));
    assert!(result.tables().contains_key("imu"));
    assert!(result.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::Record {
            stream,
            error: RecordError::RecordCountMismatch {
                expected: 34,
                actual: 33,
                ..
            },
        } if stream == "gps"
    )));
}

/// Header-level problems abort the whole parse.
#[test]
fn test_header_failures_are_fatal() {
    let no_header = write_container(vec![("gps.bin", gps_blob())]);
    assert!(matches!(
        parse_dir(no_header.path(), &ParseOptions::default()),
        Err(ParseError::MissingHeader(_))
    ));

    let no_config = write_container(vec![("header.json", br#"{"recordCount": 2}"#.to_vec())]);
    assert!(matches!(
        parse_dir(no_config.path(), &ParseOptions::default()),
        Err(ParseError::Header(
            capdec_core::HeaderError::MissingConfigurationSection
        ))
    ));

    let no_channels = write_container(vec![(
        "header.json",
        br#"{"configurations": {"gpsConfiguration": {}}, "recordCount": 2}"#.to_vec(),
    )]);
    let err = parse_dir(no_channels.path(), &ParseOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ParseError::Layout(capdec_core::LayoutError::MissingChannelList { .. })
    ));
    assert!(err.to_string().contains("gpsConfiguration"));
}

/// Decoding the same container twice yields identical output.
#[test]
fn test_decoding_is_deterministic() {
    let dir = write_container(vec![
        ("header.json", header()),
        ("gps.bin", gps_blob()),
        ("imu.bin", imu_blob()),
    ]);

    let first = decode(dir.path());
    let second = decode(dir.path());
    assert_eq!(first.data(), second.data());
    assert_eq!(first.tables(), second.tables());
}

/// A malformed array file is reported and skipped without aborting the parse.
#[test]
fn test_malformed_array_entry_is_skipped() {
    let dir = write_container(vec![
        ("header.json", header()),
        ("path.json", b"{\"x\": [1, 2]}".to_vec()),
        ("gps.bin", gps_blob()),
    ]);

    let result = decode(dir.path());
    assert!(!result.data().contains_key("path"));
    assert!(result.data().contains_key("gps"));
    assert!(result
        .diagnostics()
        .iter()
        .any(|d| matches!(d, Diagnostic::UnreadableEntry { stream, .. } if stream == "path")));
}
