//! Analysis passes over a loaded trace.
//!
//! This module transforms the flat frame forest into:
//! - Per-thread call trees with self/total counts
//! - Deduplicated call stacks (by address or by function)
//! - Flat per-function heat maps
//! - Marker-scoped hot-subtree aggregations
//! - Collapsed stacks and hot paths for reports and flamegraphs

pub mod call_tree;
pub mod heat_map;
pub mod hot_subtree;
pub mod merge;
pub mod metrics;
pub mod reattribution;
pub mod remap;
pub mod stack_builder;
pub mod thread_stacks;
pub mod tree_index;

// Re-export main types and functions
pub use call_tree::{build_call_tree, CallTreeOptions};
pub use heat_map::{build_function_heat_map, HeatMapEntry};
pub use hot_subtree::{
    aggregate_hot_subtree, filter_samples_by_marker, find_functions_by_name, FunctionSampleData,
};
pub use merge::{merge_call_stacks, MergeMode, MergedStacks};
pub use metrics::{
    calculate_hot_paths, calculate_sample_distribution, heat_map_rows, SampleDistribution,
};
pub use reattribution::{reattribute_samples, ReattributionFilter};
pub use remap::IndexRemap;
pub use stack_builder::{build_collapsed_stacks, CollapsedStack};
pub use thread_stacks::{collect_thread_stack_frames, StackFrameSamples, ThreadStacks};
pub use tree_index::{build_tree_index, build_tree_index_by, ChildRange, TreeIndex, TreeNode};
