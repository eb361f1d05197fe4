use crate::output::read_profile;
use crate::parser::TraceStore;
use crate::utils::config::{SCHEMA_VERSION, TRACE_FORMAT_VERSION};
use anyhow::{Context, Result};
use std::path::Path;

/// Validate a profile JSON file
pub fn validate_profile_file(file_path: impl AsRef<Path>) -> Result<()> {
    let file_path = file_path.as_ref();
    println!("Validating profile: {}", file_path.display());

    let profile = read_profile(file_path)?;

    println!("✓ Valid profile JSON");
    println!("  Version: {}", profile.version);
    println!("  Trace: {}", profile.trace_path);
    println!("  Thread: {} ({})", profile.thread_index, profile.thread_name);
    println!("  Thread Samples: {}", profile.thread_samples);
    println!("  Hot Paths: {}", profile.hot_paths.len());

    Ok(())
}

/// Print the header and table sizes of a trace file
pub fn display_trace_info(trace_path: impl AsRef<Path>) -> Result<()> {
    let trace_path = trace_path.as_ref();
    let trace = TraceStore::load(trace_path)
        .with_context(|| format!("Failed to load trace {}", trace_path.display()))?;

    let header = trace.header();
    println!("Trace: {}", trace_path.display());
    println!("  Sampling Interval: {:.3} ms", header.sampling_interval_ms);
    println!(
        "  Session Ticks: {} .. {}",
        header.session_start_ticks, header.session_end_ticks
    );
    println!("  Samples: {}", trace.samples().len());
    println!("  Stack Frames: {}", trace.stack_frames().len());
    println!("  Functions: {}", trace.functions().len());
    println!("  Modules: {}", trace.modules().len());

    let counts = trace.thread_sample_counts();
    println!("  Threads: {}", trace.threads().len());
    for (index, thread) in trace.threads().iter().enumerate() {
        let name = if thread.name.is_empty() { "<unnamed>" } else { thread.name.as_str() };
        println!(
            "    [{}] {:<32} {} samples",
            index,
            name,
            counts.get(index).copied().unwrap_or(0)
        );
    }

    trace.dispose();
    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("CPU Trace Studio Profile Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!("Trace Format: v{}", TRACE_FORMAT_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string              - Schema version (e.g., '1.0.0')");
        println!("  trace_path: string           - Analyzed trace file");
        println!("  thread_index: number         - Analyzed thread");
        println!("  thread_name: string          - Thread name from the trace");
        println!("  merge_mode: string           - 'address', 'function' or 'none'");
        println!("  sampling_interval_ms: number - Sampling interval");
        println!("  total_samples: number        - Samples in the trace");
        println!("  thread_samples: number       - Samples on the thread");
        println!("  heat_map: array              - Flat per-function profile");
        println!("    function: string           - Function name");
        println!("    samples: number            - Samples blamed on the function");
        println!("    percentage: number         - Share of the thread's samples");
        println!("  hot_paths: array             - Heaviest call paths");
        println!("    stack: string              - Collapsed stack (root first)");
        println!("    samples: number            - Self samples of the leaf");
        println!("    percentage: number         - Share of the thread's samples");
        println!("  call_tree: array             - Top-down call tree");
        println!("    self_samples: number       - Samples ending at the node");
        println!("    total_samples: number      - Samples under the node");
        println!("    children: array?           - Callees (omitted when empty)");
        println!("  generated_at: string         - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("CPU Trace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Profile Schema: v{}", SCHEMA_VERSION);
    println!("Trace Format: v{}", TRACE_FORMAT_VERSION);
    println!();
    println!("Offline analysis of sampled CPU call stacks.");
}
