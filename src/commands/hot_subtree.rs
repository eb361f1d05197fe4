//! Hot-subtree command implementation.
//!
//! Resolves marker functions by name, then reports per-function cost inside
//! the subtrees rooted at those markers.

use super::analyze::check_thread;
use super::models::HotSubtreeArgs;
use crate::aggregator::{aggregate_hot_subtree, find_functions_by_name, FunctionSampleData};
use crate::output::schema::{FunctionRow, HotSubtreeReport};
use crate::output::write_hot_subtree_report;
use crate::parser::TraceStore;
use crate::utils::config::{MAX_TOP_PATHS, SCHEMA_VERSION};
use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};

/// Execute the hot-subtree command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Trace load or validation failures
/// * Unknown thread
/// * File write errors
pub fn execute_hot_subtree(args: &HotSubtreeArgs) -> Result<HotSubtreeReport> {
    info!("Step 1/3: Loading trace...");
    let trace = TraceStore::load(&args.trace_path).context("Failed to load trace")?;
    check_thread(&trace, args.thread_index)?;

    info!("Step 2/3: Resolving marker functions for '{}'...", args.search);
    let markers = find_functions_by_name(trace.functions(), &args.search);
    if markers.is_empty() {
        warn!("No function name contains '{}'", args.search);
    }

    let mut marker_functions: Vec<String> = markers
        .iter()
        .map(|&id| trace.function_name(id).to_string())
        .collect();
    marker_functions.sort();

    let functions = aggregate_hot_subtree(
        trace.samples(),
        trace.stack_frames(),
        args.thread_index,
        &markers,
    )
    .context("Failed to aggregate hot subtree")?;

    let report = HotSubtreeReport {
        version: SCHEMA_VERSION.to_string(),
        trace_path: args.trace_path.display().to_string(),
        thread_index: args.thread_index,
        search: args.search.clone(),
        marker_functions,
        functions: function_rows(&trace, &functions),
        generated_at: Utc::now().to_rfc3339(),
    };

    print_report(&report, args.top);

    info!("Step 3/3: Writing output files...");
    if let Some(path) = &args.output_json {
        write_hot_subtree_report(&report, path).context("Failed to write hot-subtree JSON")?;
        info!("✓ Report written to: {}", path.display());
    }

    Ok(report)
}

fn function_rows(trace: &TraceStore, functions: &[FunctionSampleData]) -> Vec<FunctionRow> {
    functions
        .iter()
        .map(|data| FunctionRow {
            function_id: data.function_id,
            function: trace.function_name(data.function_id).to_string(),
            self_samples: data.self_count,
            total_samples: data.total_count,
        })
        .collect()
}

fn print_report(report: &HotSubtreeReport, top: usize) {
    println!("\n{}", "=".repeat(80));
    println!("HOT SUBTREE: '{}' (thread {})", report.search, report.thread_index);
    println!("{}", "=".repeat(80));
    println!("Markers: {}", report.marker_functions.join(", "));
    println!();
    println!("  {:<54} {:>10} {:>10}", "FUNCTION", "TOTAL", "SELF");
    for row in report.functions.iter().take(top) {
        println!(
            "  {:<54} {:>10} {:>10}",
            truncate(&row.function, 54),
            row.total_samples,
            row.self_samples
        );
    }
    if report.functions.len() > top {
        println!("\n   (Showing top {} of {} functions)", top, report.functions.len());
    }
    println!("{}", "=".repeat(80));
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let head: String = name.chars().take(width - 3).collect();
    format!("{}...", head)
}

/// Validate hot-subtree arguments
///
/// **Public** - can be called before execute_hot_subtree for early validation
pub fn validate_hot_subtree_args(args: &HotSubtreeArgs) -> Result<()> {
    if args.trace_path.as_os_str().is_empty() {
        anyhow::bail!("Trace path cannot be empty");
    }

    if args.thread_index < 0 {
        anyhow::bail!("Thread index cannot be negative");
    }

    if args.search.trim().is_empty() {
        anyhow::bail!("Search term cannot be empty");
    }

    if args.top == 0 || args.top > MAX_TOP_PATHS {
        anyhow::bail!("top must be between 1 and {}", MAX_TOP_PATHS);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_args() -> HotSubtreeArgs {
        HotSubtreeArgs {
            trace_path: PathBuf::from("trace.bin"),
            search: "parse".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_hot_subtree_args_valid() {
        assert!(validate_hot_subtree_args(&valid_args()).is_ok());
    }

    #[test]
    fn test_validate_hot_subtree_args_blank_search() {
        let args = HotSubtreeArgs {
            search: "   ".to_string(),
            ..valid_args()
        };
        assert!(validate_hot_subtree_args(&args).is_err());
    }

    #[test]
    fn test_validate_hot_subtree_args_top_zero() {
        let args = HotSubtreeArgs {
            top: 0,
            ..valid_args()
        };
        assert!(validate_hot_subtree_args(&args).is_err());
    }

    #[test]
    fn test_truncate_keeps_short_names() {
        assert_eq!(truncate("main", 10), "main");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
