//! Trace file loading and the trace data model.
//!
//! This module handles:
//! - Decoding the little-endian binary trace layout
//! - Validating table bounds and cross-table references
//! - Writing traces back to disk in the same layout

pub mod schema;
pub mod trace_file;

// Re-export main types
pub use schema::{
    FunctionData, ModuleData, Sample, StackFrame, ThreadData, TraceHeader, NO_INDEX,
};
pub use trace_file::{encode_trace, load_trace, parse_trace, write_trace, TraceStore};
