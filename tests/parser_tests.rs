mod common;

use common::*;
use cpu_trace_studio::parser::{encode_trace, load_trace, parse_trace, TraceStore, NO_INDEX};
use cpu_trace_studio::utils::TraceError;
use pretty_assertions::assert_eq;

/// Byte offset of the threads table entry inside the file header
const THREADS_ENTRY: usize = 8 + 4 * 12;

#[test]
fn test_write_then_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path());

    let loaded = TraceStore::load(&path).unwrap();

    assert_eq!(loaded, fixture_trace());
    assert_eq!(loaded.thread_sample_counts(), vec![7, 2]);
    assert_eq!(loaded.thread_name(1), Some("worker"));
    assert_eq!(loaded.thread_name(2), None);
    assert_eq!(loaded.function_name(PARSE), "parse_document");
    assert_eq!(loaded.function_name(NO_INDEX), "<unknown>");
    assert_eq!(loaded.modules()[2].file_path, "C:\\tools\\Instrument.dll");
    loaded.dispose();
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.bin");

    match load_trace(&missing) {
        Err(TraceError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn test_empty_file_is_malformed() {
    assert!(matches!(parse_trace(&[]), Err(TraceError::Malformed(_))));
}

#[test]
fn test_truncated_file_is_malformed() {
    let bytes = encode_trace(&fixture_trace()).unwrap();

    let result = parse_trace(&bytes[..bytes.len() - 10]);

    assert!(matches!(result, Err(TraceError::Malformed(_))));
}

#[test]
fn test_future_version_rejected() {
    let mut bytes = encode_trace(&fixture_trace()).unwrap();
    bytes[0..4].copy_from_slice(&2i32.to_le_bytes());

    match parse_trace(&bytes) {
        Err(TraceError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, 2);
            assert_eq!(expected, 1);
        }
        other => panic!("expected UnsupportedVersion, got {:?}", other),
    }
}

#[test]
fn test_negative_table_count_is_malformed() {
    let mut bytes = encode_trace(&fixture_trace()).unwrap();
    bytes[8..12].copy_from_slice(&(-1i32).to_le_bytes());

    assert!(matches!(parse_trace(&bytes), Err(TraceError::Malformed(_))));
}

#[test]
fn test_table_overlapping_header_is_malformed() {
    let mut bytes = encode_trace(&fixture_trace()).unwrap();
    bytes[THREADS_ENTRY + 4..THREADS_ENTRY + 12].copy_from_slice(&0i64.to_le_bytes());

    assert!(matches!(parse_trace(&bytes), Err(TraceError::Malformed(_))));
}

#[test]
fn test_trailing_bytes_after_declared_length_are_ignored() {
    let mut bytes = encode_trace(&fixture_trace()).unwrap();
    bytes.extend_from_slice(&[0xAB; 32]);

    assert_eq!(parse_trace(&bytes).unwrap(), fixture_trace());
}

#[test]
fn test_invalid_utf8_name_decoded_lossily() {
    let mut bytes = encode_trace(&fixture_trace()).unwrap();
    let offset = i64::from_le_bytes(
        bytes[THREADS_ENTRY + 4..THREADS_ENTRY + 12]
            .try_into()
            .unwrap(),
    ) as usize;
    bytes[offset] = 0xFF;

    let store = parse_trace(&bytes).unwrap();

    assert_eq!(store.threads()[0].name, "\u{FFFD}ain");
}

#[test]
fn test_sample_with_unknown_thread_rejected() {
    let trace = fixture_trace();
    let mut samples = trace.samples().to_vec();
    samples[0].thread_index = 5;

    let result = TraceStore::from_parts(
        *trace.header(),
        samples,
        trace.stack_frames().to_vec(),
        trace.functions().to_vec(),
        trace.modules().to_vec(),
        trace.threads().to_vec(),
    );

    assert!(matches!(
        result,
        Err(TraceError::InvalidIndex { table: "thread", index: 5, .. })
    ));
}

#[test]
fn test_function_with_unknown_module_rejected() {
    let trace = fixture_trace();
    let mut functions = trace.functions().to_vec();
    functions[0].module_id = 3;

    let result = TraceStore::from_parts(
        *trace.header(),
        trace.samples().to_vec(),
        trace.stack_frames().to_vec(),
        functions,
        trace.modules().to_vec(),
        trace.threads().to_vec(),
    );

    assert!(matches!(result, Err(TraceError::InvalidIndex { .. })));
}

#[test]
fn test_frame_with_zero_depth_rejected() {
    let trace = fixture_trace();
    let mut frames = trace.stack_frames().to_vec();
    frames[0].depth = 0;

    let result = TraceStore::from_parts(
        *trace.header(),
        trace.samples().to_vec(),
        frames,
        trace.functions().to_vec(),
        trace.modules().to_vec(),
        trace.threads().to_vec(),
    );

    assert!(matches!(result, Err(TraceError::DataCorruption(_))));
}
