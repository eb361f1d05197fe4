//! Configuration and constants for the trace format and the CLI.

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Only trace file version this build understands
pub const TRACE_FORMAT_VERSION: i32 = 1;

// File header: version + total length, then (count, byte offset) per table
pub const FILE_HEADER_SIZE: usize = 4 + 4 + TABLE_COUNT * TABLE_ENTRY_SIZE;
pub const TABLE_COUNT: usize = 5;
pub const TABLE_ENTRY_SIZE: usize = 4 + 8;

// Trace header directly follows the file header
pub const TRACE_HEADER_OFFSET: usize = FILE_HEADER_SIZE;
pub const TRACE_HEADER_SIZE: usize = 8 + 8 + 8;

// Fixed-capacity inline string buffers
pub const FUNCTION_NAME_CAPACITY: usize = 256;
pub const MODULE_PATH_CAPACITY: usize = 260;
pub const THREAD_NAME_CAPACITY: usize = 64;
pub const PDB_GUID_SIZE: usize = 16;

// Packed record sizes
pub const SAMPLE_RECORD_SIZE: usize = 4 + 4 + 8 + 8 + 4;
pub const STACK_FRAME_RECORD_SIZE: usize = 8 + 4 + 4 + 4;
pub const FUNCTION_RECORD_SIZE: usize = 4 + FUNCTION_NAME_CAPACITY + 8 + 4;
pub const MODULE_RECORD_SIZE: usize =
    MODULE_PATH_CAPACITY * 2 + 8 + 8 + 4 + 4 + 4 + PDB_GUID_SIZE;
pub const THREAD_RECORD_SIZE: usize = THREAD_NAME_CAPACITY;

/// Display name for samples/frames without a resolved function
pub const UNKNOWN_FUNCTION_NAME: &str = "<unknown>";

// CLI defaults and limits
pub const DEFAULT_TOP_PATHS: usize = 20;
pub const MAX_TOP_PATHS: usize = 1000;
pub const DEFAULT_TREE_DEPTH: usize = 16;

/// Call tree nodes below this share of the thread's samples are pruned
pub const DEFAULT_TREE_MIN_PERCENTAGE: f64 = 0.5;
