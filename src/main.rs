//! CPU Trace Studio CLI
//!
//! Offline analysis of sampled CPU call stacks.
//! Builds call trees, heat maps and flamegraphs from binary trace files.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use std::path::PathBuf;

use cpu_trace_studio::aggregator::{CallTreeOptions, MergeMode};
use cpu_trace_studio::commands::{
    display_schema, display_trace_info, display_version, execute_analyze, execute_hot_subtree,
    validate_args, validate_hot_subtree_args, validate_profile_file, AnalyzeArgs, HotSubtreeArgs,
};
use cpu_trace_studio::flamegraph::FlamegraphConfig;

/// CPU Trace Studio - Call stack analysis for sampled CPU traces
#[derive(Parser, Debug)]
#[command(name = "cpu-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// How call stacks are deduplicated before building the tree
#[derive(ValueEnum, Clone, Copy, Debug)]
enum MergeArg {
    /// Merge frames with the same caller and address
    Address,
    /// Merge frames with the same caller and function
    Function,
    /// Keep raw frames
    None,
}

impl MergeArg {
    fn mode(self) -> Option<MergeMode> {
        match self {
            MergeArg::Address => Some(MergeMode::ByAddress),
            MergeArg::Function => Some(MergeMode::ByFunction),
            MergeArg::None => None,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a per-thread profile from a trace file
    Analyze {
        /// Binary trace file
        #[arg(short, long, env = "CPU_TRACE_FILE")]
        trace: PathBuf,

        /// Thread index to analyze
        #[arg(long, default_value = "0")]
        thread: i32,

        /// Call stack merge mode
        #[arg(long, value_enum, default_value = "function")]
        merge: MergeArg,

        /// Module path substring whose functions pass blame to their callers (repeatable)
        #[arg(long = "filter-module")]
        filter_module: Vec<String>,

        /// Output path for JSON profile
        #[arg(short, long, default_value = "profile.json")]
        output: PathBuf,

        /// Output path for SVG flamegraph (optional)
        #[arg(short, long)]
        flamegraph: Option<PathBuf>,

        /// Number of top hot paths to include
        #[arg(long, default_value = "20")]
        top_paths: usize,

        /// Maximum call tree depth written to JSON
        #[arg(long, default_value = "16")]
        max_depth: usize,

        /// Drop call tree nodes below this percentage of the thread's samples
        #[arg(long, default_value = "0.5")]
        min_percentage: f64,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200")]
        width: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Aggregate cost under the functions matching a name
    HotSubtree {
        /// Binary trace file
        #[arg(short, long, env = "CPU_TRACE_FILE")]
        trace: PathBuf,

        /// Thread index to analyze
        #[arg(long, default_value = "0")]
        thread: i32,

        /// Case-insensitive substring of the marker function names
        #[arg(short, long)]
        search: String,

        /// Output path for the JSON report (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of rows printed
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Display header and table sizes of a trace file
    Info {
        /// Binary trace file
        #[arg(short, long, env = "CPU_TRACE_FILE")]
        trace: PathBuf,
    },

    /// Validate a profile JSON file
    Validate {
        /// Path to profile JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            trace,
            thread,
            merge,
            filter_module,
            output,
            flamegraph,
            top_paths,
            max_depth,
            min_percentage,
            title,
            width,
            summary,
        } => {
            // Create flamegraph config
            let fg_config = if flamegraph.is_some() {
                let mut config = FlamegraphConfig::new().with_width(width);
                if let Some(title_str) = title {
                    config = config.with_title(title_str);
                }
                Some(config)
            } else {
                None
            };

            let args = AnalyzeArgs {
                trace_path: trace,
                thread_index: thread,
                merge_mode: merge.mode(),
                filter_modules: filter_module,
                output_json: output,
                output_svg: flamegraph,
                top_paths,
                tree_options: CallTreeOptions {
                    max_depth,
                    min_percentage,
                },
                flamegraph_config: fg_config,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;
            execute_analyze(&args)?;
        }

        Commands::HotSubtree {
            trace,
            thread,
            search,
            output,
            top,
        } => {
            let args = HotSubtreeArgs {
                trace_path: trace,
                thread_index: thread,
                search,
                output_json: output,
                top,
            };

            validate_hot_subtree_args(&args)?;
            execute_hot_subtree(&args)?;
        }

        Commands::Info { trace } => {
            display_trace_info(trace)?;
        }

        Commands::Validate { file } => {
            validate_profile_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
