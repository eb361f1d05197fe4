//! Shared trace fixtures for integration tests.

#![allow(dead_code)]

use cpu_trace_studio::parser::{
    write_trace, FunctionData, ModuleData, Sample, StackFrame, ThreadData, TraceHeader, TraceStore,
    NO_INDEX,
};
use std::path::{Path, PathBuf};

pub const MAIN: i32 = 0;
pub const PARSE: i32 = 1;
pub const ALLOC: i32 = 2;
pub const HASH: i32 = 3;
pub const STUB: i32 = 4;

pub fn frame(address: i64, function_id: i32, caller_frame_id: i32, depth: i32) -> StackFrame {
    StackFrame {
        address,
        function_id,
        caller_frame_id,
        depth,
    }
}

pub fn sample(stack_trace_id: i32, function_id: i32, thread_index: i32) -> Sample {
    Sample {
        stack_trace_id,
        function_id,
        address: 0,
        timestamp: 0.0,
        thread_index,
    }
}

fn function(module_id: i32, name: &str, base_address: i64) -> FunctionData {
    FunctionData {
        module_id,
        name: name.to_string(),
        base_address,
        length: 0x100,
    }
}

fn module(file_path: &str, image_base: u64) -> ModuleData {
    ModuleData {
        file_path: file_path.to_string(),
        pdb_name: String::new(),
        image_base,
        image_end: image_base + 0x1000,
        is_managed: false,
        checksum: 0,
        pdb_age: 1,
        pdb_guid: [0; 16],
    }
}

/// Frames of the fixture trace
///
/// ```text
/// 0 main ── 1 parse ─┬─ 2 alloc
///                    └─ 7 parse ── 8 hash
/// 3 main ── 4 parse ─── 5 hash ── 6 stub
/// ```
pub fn fixture_frames() -> Vec<StackFrame> {
    vec![
        frame(0x1000, MAIN, NO_INDEX, 1),
        frame(0x1100, PARSE, 0, 2),
        frame(0x2000, ALLOC, 1, 3),
        frame(0x1000, MAIN, NO_INDEX, 1),
        frame(0x1100, PARSE, 3, 2),
        frame(0x1300, HASH, 4, 3),
        frame(0x3000, STUB, 5, 4),
        frame(0x1180, PARSE, 1, 3),
        frame(0x1300, HASH, 7, 4),
    ]
}

/// Thread 0 has seven samples (one without a stack), thread 1 has two
pub fn fixture_samples() -> Vec<Sample> {
    vec![
        sample(2, ALLOC, 0),
        sample(2, ALLOC, 0),
        sample(5, HASH, 0),
        sample(6, STUB, 0),
        sample(8, HASH, 0),
        sample(1, PARSE, 0),
        sample(NO_INDEX, NO_INDEX, 0),
        sample(0, MAIN, 1),
        sample(5, HASH, 1),
    ]
}

pub fn fixture_trace() -> TraceStore {
    TraceStore::from_parts(
        TraceHeader {
            sampling_interval_ms: 1.0,
            session_start_ticks: 1_000,
            session_end_ticks: 9_000,
        },
        fixture_samples(),
        fixture_frames(),
        vec![
            function(0, "main", 0x1000),
            function(0, "parse_document", 0x1100),
            function(1, "heap_alloc", 0x2000),
            function(0, "hash_bytes", 0x1300),
            function(2, "hook_stub", 0x3000),
        ],
        vec![
            module("C:\\app\\app.exe", 0x1000),
            module("C:\\Windows\\System32\\ntdll.dll", 0x2000),
            module("C:\\tools\\Instrument.dll", 0x3000),
        ],
        vec![
            ThreadData {
                name: "main".to_string(),
            },
            ThreadData {
                name: "worker".to_string(),
            },
        ],
    )
    .expect("fixture trace is valid")
}

/// Write the fixture trace into `dir` and return its path
pub fn write_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("capture.bin");
    write_trace(&fixture_trace(), &path).expect("fixture trace writes");
    path
}
