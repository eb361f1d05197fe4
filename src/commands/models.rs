use crate::aggregator::{CallTreeOptions, MergeMode};
use crate::flamegraph::FlamegraphConfig;
use crate::utils::config::DEFAULT_TOP_PATHS;
use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Trace file to load
    pub trace_path: PathBuf,

    /// Thread to build the call tree for
    pub thread_index: i32,

    /// Deduplicate call stacks before building the tree (None = keep raw frames)
    pub merge_mode: Option<MergeMode>,

    /// Module path substrings whose functions are never blamed
    pub filter_modules: Vec<String>,

    /// Output path for JSON profile
    pub output_json: PathBuf,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Number of hot paths and heat map rows to include
    pub top_paths: usize,

    /// Call tree pruning
    pub tree_options: CallTreeOptions,

    /// Flamegraph configuration
    pub flamegraph_config: Option<FlamegraphConfig>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::new(),
            thread_index: 0,
            merge_mode: Some(MergeMode::ByFunction),
            filter_modules: Vec::new(),
            output_json: PathBuf::from("artifacts/profile.json"),
            output_svg: None,
            top_paths: DEFAULT_TOP_PATHS,
            tree_options: CallTreeOptions::default(),
            flamegraph_config: None,
            print_summary: false,
        }
    }
}

/// Arguments for the hot-subtree command
#[derive(Debug, Clone)]
pub struct HotSubtreeArgs {
    pub trace_path: PathBuf,
    pub thread_index: i32,

    /// Case-insensitive substring selecting the marker functions
    pub search: String,

    /// Optional JSON report path
    pub output_json: Option<PathBuf>,

    /// Rows printed to stdout
    pub top: usize,
}

impl Default for HotSubtreeArgs {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::new(),
            thread_index: 0,
            search: String::new(),
            output_json: None,
            top: DEFAULT_TOP_PATHS,
        }
    }
}
