//! In-memory records of a captured CPU trace.
//!
//! Every table is a dense array; records refer to each other by index.
//! `-1` is the "none" value for every index field.

/// Index value meaning "no frame", "no caller" or "unknown function"
pub const NO_INDEX: i32 = -1;

/// Session-level information stored right after the file header
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TraceHeader {
    /// Interval between two samples of the same CPU, in milliseconds
    pub sampling_interval_ms: f64,

    /// Session start, in raw clock ticks
    pub session_start_ticks: i64,

    /// Session end, in raw clock ticks
    pub session_end_ticks: i64,
}

/// One observed (program counter, call stack) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Leaf frame of the sampled stack, `-1` when no stack was captured.
    /// Only meaningful relative to the frame array it was produced with.
    pub stack_trace_id: i32,

    /// Function containing `address`, `-1` when unresolved
    pub function_id: i32,

    /// Sampled instruction pointer
    pub address: i64,

    /// Sample time in milliseconds since session start
    pub timestamp: f64,

    /// Index into the thread table
    pub thread_index: i32,
}

/// One call-stack entry, linked to its caller by index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackFrame {
    pub address: i64,
    pub function_id: i32,

    /// `-1` for a root frame
    pub caller_frame_id: i32,

    /// 1-based; roots have depth 1 and every other frame is one deeper than its caller
    pub depth: i32,
}

impl StackFrame {
    pub fn is_root(&self) -> bool {
        self.caller_frame_id == NO_INDEX
    }
}

/// Resolved function metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionData {
    /// Index into the module table, `-1` when the owning module is unknown
    pub module_id: i32,
    pub name: String,
    pub base_address: i64,
    pub length: i32,
}

/// Loaded image metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleData {
    pub file_path: String,
    pub pdb_name: String,
    pub image_base: u64,
    pub image_end: u64,
    pub is_managed: bool,
    pub checksum: u32,
    pub pdb_age: u32,
    pub pdb_guid: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThreadData {
    pub name: String,
}
