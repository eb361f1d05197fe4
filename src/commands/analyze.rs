//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Loads the trace file
//! 2. Reattributes samples out of filtered modules (optional)
//! 3. Builds the flat heat map
//! 4. Merges call stacks (optional)
//! 5. Collects the thread's call tree
//! 6. Generates flamegraph (optional, skipped when no sample has a stack)
//! 7. Writes output files

use super::models::AnalyzeArgs;
use crate::aggregator::{
    build_call_tree, build_collapsed_stacks, build_function_heat_map, calculate_hot_paths,
    calculate_sample_distribution, collect_thread_stack_frames, heat_map_rows, merge_call_stacks,
    reattribute_samples, ReattributionFilter,
};
use crate::flamegraph::{generate_flamegraph, generate_text_summary};
use crate::output::schema::Profile;
use crate::output::{write_profile, write_svg};
use crate::parser::{Sample, StackFrame, TraceStore};
use crate::utils::config::{MAX_TOP_PATHS, SCHEMA_VERSION};
use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use std::borrow::Cow;
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The profile that was written to `args.output_json`
///
/// # Errors
/// * Trace load or validation failures
/// * Corrupted caller chains
/// * File write errors
pub fn execute_analyze(args: &AnalyzeArgs) -> Result<Profile> {
    let start_time = Instant::now();

    info!("Starting analysis of: {}", args.trace_path.display());

    info!("Step 1/7: Loading trace...");
    let trace = TraceStore::load(&args.trace_path).context("Failed to load trace")?;
    check_thread(&trace, args.thread_index)?;

    info!("Step 2/7: Reattributing samples...");
    let samples: Cow<'_, [Sample]> = if args.filter_modules.is_empty() {
        debug!("No filtered modules, keeping sample attribution");
        Cow::Borrowed(trace.samples())
    } else {
        let filter = ReattributionFilter::from_module_patterns(&trace, &args.filter_modules, false);
        info!("{} functions filtered", filter.filtered_count());
        Cow::Owned(
            reattribute_samples(trace.samples(), trace.stack_frames(), &filter)
                .context("Failed to reattribute samples")?,
        )
    };

    info!("Step 3/7: Building function heat map...");
    let heat_map = build_function_heat_map(&samples, args.thread_index);

    info!("Step 4/7: Merging call stacks...");
    let (samples, frames): (Cow<'_, [Sample]>, Cow<'_, [StackFrame]>) = match args.merge_mode {
        Some(mode) => {
            let merged = merge_call_stacks(&samples, trace.stack_frames(), mode)
                .context("Failed to merge call stacks")?;
            (Cow::Owned(merged.samples), Cow::Owned(merged.frames))
        }
        None => (samples, Cow::Borrowed(trace.stack_frames())),
    };

    info!("Step 5/7: Collecting thread {} call tree...", args.thread_index);
    let stacks = collect_thread_stack_frames(&samples, &frames, args.thread_index)
        .context("Failed to collect thread stack frames")?;
    let thread_samples = stacks.samples.len() as u64;

    let call_tree = build_call_tree(&trace, &stacks, &args.tree_options)
        .context("Failed to build call tree")?;
    let collapsed = build_collapsed_stacks(&trace, &stacks);

    let distribution = calculate_sample_distribution(&collapsed, thread_samples);
    info!("Sample distribution: {}", distribution.summary());
    if distribution.is_highly_concentrated() {
        info!(
            "{} of {} stacks hold 80% of the samples",
            distribution.stacks_for_80_percent, distribution.stack_count
        );
    }

    let hot_paths = calculate_hot_paths(&collapsed, thread_samples, args.top_paths);
    debug!("Top 3 hot paths:");
    for (i, path) in hot_paths.iter().take(3).enumerate() {
        debug!(
            "  {}. {} samples ({:.1}%): {}",
            i + 1,
            path.samples,
            path.percentage,
            path.stack
        );
    }

    let svg_content = if args.output_svg.is_some() && collapsed.is_empty() {
        warn!(
            "Step 6/7: Skipping flamegraph, thread {} has no samples with a call stack",
            args.thread_index
        );
        None
    } else if args.output_svg.is_some() {
        info!("Step 6/7: Generating flamegraph...");
        Some(
            generate_flamegraph(&collapsed, args.flamegraph_config.as_ref())
                .context("Failed to generate flamegraph")?,
        )
    } else {
        info!("Step 6/7: Skipping flamegraph generation (not requested)");
        None
    };

    info!("Step 7/7: Writing output files...");
    let profile = Profile {
        version: SCHEMA_VERSION.to_string(),
        trace_path: args.trace_path.display().to_string(),
        thread_index: args.thread_index,
        thread_name: trace.thread_name(args.thread_index).unwrap_or_default().to_string(),
        merge_mode: args
            .merge_mode
            .map_or_else(|| "none".to_string(), |mode| mode.to_string()),
        sampling_interval_ms: trace.header().sampling_interval_ms,
        total_samples: trace.samples().len() as u64,
        thread_samples,
        heat_map: heat_map_rows(&trace, &heat_map, args.top_paths),
        hot_paths,
        call_tree,
        generated_at: Utc::now().to_rfc3339(),
    };

    write_profile(&profile, &args.output_json).context("Failed to write profile JSON")?;
    info!("✓ Profile written to: {}", args.output_json.display());

    if let (Some(svg), Some(svg_path)) = (svg_content, &args.output_svg) {
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("✓ Flamegraph written to: {}", svg_path.display());
    }

    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("PROFILE SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Trace:          {}", profile.trace_path);
        println!("Thread:         {} ({})", profile.thread_index, profile.thread_name);
        println!("Thread Samples: {}", profile.thread_samples);
        println!("Unique Stacks:  {}", collapsed.len());
        if let Some(hottest) = profile.heat_map.first() {
            println!(
                "Hottest:        {} ({} samples, {:.1}%)",
                hottest.function, hottest.samples, hottest.percentage
            );
        }
        println!("\n{}", generate_text_summary(&collapsed, 10, thread_samples));
        println!("{}", "=".repeat(80));
    }

    info!(
        "Analysis completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(profile)
}

/// Fail early when the requested thread is not part of the trace
///
/// **Crate** - shared by commands that take a thread index
pub(crate) fn check_thread(trace: &TraceStore, thread_index: i32) -> Result<()> {
    if trace.thread_name(thread_index).is_none() {
        anyhow::bail!(
            "Thread {} does not exist (trace has {} threads)",
            thread_index,
            trace.threads().len()
        );
    }
    Ok(())
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.trace_path.as_os_str().is_empty() {
        anyhow::bail!("Trace path cannot be empty");
    }

    if args.thread_index < 0 {
        anyhow::bail!("Thread index cannot be negative");
    }

    if args.top_paths == 0 {
        anyhow::bail!("top_paths must be greater than 0");
    }

    if args.top_paths > MAX_TOP_PATHS {
        anyhow::bail!("top_paths is too large (max {})", MAX_TOP_PATHS);
    }

    if args.tree_options.max_depth == 0 {
        anyhow::bail!("max_depth must be greater than 0");
    }

    if !(0.0..=100.0).contains(&args.tree_options.min_percentage) {
        anyhow::bail!("min_percentage must be between 0 and 100");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_args() -> AnalyzeArgs {
        AnalyzeArgs {
            trace_path: PathBuf::from("trace.bin"),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_args(&valid_args()).is_ok());
    }

    #[test]
    fn test_validate_args_empty_trace_path() {
        let args = AnalyzeArgs::default();
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_negative_thread() {
        let args = AnalyzeArgs {
            thread_index: -1,
            ..valid_args()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_paths_bounds() {
        let zero = AnalyzeArgs {
            top_paths: 0,
            ..valid_args()
        };
        let huge = AnalyzeArgs {
            top_paths: MAX_TOP_PATHS + 1,
            ..valid_args()
        };
        assert!(validate_args(&zero).is_err());
        assert!(validate_args(&huge).is_err());
    }

    #[test]
    fn test_validate_args_tree_depth() {
        let mut args = valid_args();
        args.tree_options.max_depth = 0;
        assert!(validate_args(&args).is_err());
    }
}
