//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod analyze;
pub mod hot_subtree;
pub mod models;
pub mod utils;

// Re-export main command functions
pub use analyze::{execute_analyze, validate_args};
pub use hot_subtree::{execute_hot_subtree, validate_hot_subtree_args};
pub use models::{AnalyzeArgs, HotSubtreeArgs};
pub use utils::{display_schema, display_trace_info, display_version, validate_profile_file};
