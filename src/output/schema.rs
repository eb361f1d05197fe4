//! Output JSON schema definitions for analysis reports.
//!
//! This module defines the structure of JSON files we write to disk.
//! Schema is versioned to allow future evolution.

use serde::{Deserialize, Serialize};

/// Top-level per-thread report written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Schema version for compatibility checking
    pub version: String,

    /// Trace file that was analyzed
    pub trace_path: String,

    pub thread_index: i32,
    pub thread_name: String,

    /// "address", "function" or "none"
    pub merge_mode: String,

    pub sampling_interval_ms: f64,

    /// Samples in the whole trace
    pub total_samples: u64,

    /// Samples on the analyzed thread
    pub thread_samples: u64,

    /// Flat per-function profile (hottest first)
    pub heat_map: Vec<HeatMapRow>,

    /// Top call paths (ranked by self samples)
    pub hot_paths: Vec<HotPath>,

    /// Top-down call tree, pruned for size
    pub call_tree: Vec<CallTreeNode>,

    /// Timestamp when profile was generated
    pub generated_at: String,
}

/// One line of the flat profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatMapRow {
    pub function_id: i32,
    pub function: String,
    pub samples: u64,

    /// Percentage of the thread's samples
    pub percentage: f64,
}

/// A hot path in the execution (stack trace with samples)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotPath {
    /// Collapsed stack representation (e.g., "main;parse;alloc")
    pub stack: String,

    /// Samples whose leaf is the last frame of this path
    pub samples: u64,

    /// Percentage of the thread's samples
    pub percentage: f64,
}

/// A node of the top-down call tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallTreeNode {
    pub function_id: i32,
    pub function: String,
    pub address: i64,
    pub self_samples: u64,
    pub total_samples: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CallTreeNode>,
}

/// Report of a hot-subtree search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotSubtreeReport {
    pub version: String,
    pub trace_path: String,
    pub thread_index: i32,

    /// Search term used to resolve markers
    pub search: String,

    /// Names of the matched marker functions
    pub marker_functions: Vec<String>,

    /// Functions inside marker subtrees (hottest first)
    pub functions: Vec<FunctionRow>,

    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionRow {
    pub function_id: i32,
    pub function: String,
    pub self_samples: u64,
    pub total_samples: u64,
}
