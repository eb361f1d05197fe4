//! Calculate hot paths and sample distribution from collapsed stacks.
//!
//! Hot paths are the call paths that collect the most samples.
//! These are the primary targets for optimization.

use super::heat_map::HeatMapEntry;
use super::stack_builder::CollapsedStack;
use crate::output::schema::{HeatMapRow, HotPath};
use crate::parser::TraceStore;
use log::debug;

/// Calculate hot paths from collapsed stacks
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `stacks` - Collapsed stacks from stack_builder (heaviest first)
/// * `total_samples` - Samples on the thread
/// * `top_n` - Number of top paths to return
pub fn calculate_hot_paths(
    stacks: &[CollapsedStack],
    total_samples: u64,
    top_n: usize,
) -> Vec<HotPath> {
    debug!("Calculating top {} hot paths from {} stacks", top_n, stacks.len());

    stacks
        .iter()
        .take(top_n)
        .map(|stack| create_hot_path(stack, total_samples))
        .collect()
}

/// Create a HotPath from a CollapsedStack
pub fn create_hot_path(stack: &CollapsedStack, total_samples: u64) -> HotPath {
    HotPath {
        stack: stack.stack.clone(),
        samples: stack.weight,
        percentage: percentage(stack.weight, total_samples),
    }
}

/// Resolve heat map entries to named report rows
pub fn heat_map_rows(
    trace: &TraceStore,
    entries: &[HeatMapEntry],
    top_n: usize,
) -> Vec<HeatMapRow> {
    let total: u64 = entries.iter().map(|e| u64::from(e.sample_count)).sum();
    entries
        .iter()
        .take(top_n)
        .map(|entry| HeatMapRow {
            function_id: entry.function_id,
            function: trace.function_name(entry.function_id).to_string(),
            samples: u64::from(entry.sample_count),
            percentage: percentage(u64::from(entry.sample_count), total),
        })
        .collect()
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Describe how a thread's samples spread over its call stacks
///
/// **Public** - provides summary statistics
///
/// # Arguments
/// * `stacks` - Collapsed stacks, heaviest first
/// * `thread_samples` - All samples of the thread, including those without a stack
pub fn calculate_sample_distribution(
    stacks: &[CollapsedStack],
    thread_samples: u64,
) -> SampleDistribution {
    let attributed: u64 = stacks.iter().map(|s| s.weight).sum();

    // Smallest prefix of the heaviest stacks holding 80% of attributed samples
    let mut covered = 0u64;
    let mut stacks_for_80_percent = 0;
    for stack in stacks {
        if covered * 5 >= attributed * 4 {
            break;
        }
        covered += stack.weight;
        stacks_for_80_percent += 1;
    }

    SampleDistribution {
        thread_samples,
        stackless_samples: thread_samples.saturating_sub(attributed),
        stack_count: stacks.len(),
        hottest_stack_percentage: stacks
            .first()
            .map_or(0.0, |s| percentage(s.weight, attributed)),
        stacks_for_80_percent,
    }
}

/// Sample distribution statistics
///
/// **Public** - returned from calculate_sample_distribution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleDistribution {
    pub thread_samples: u64,

    /// Samples recorded without a call stack
    pub stackless_samples: u64,

    /// Number of unique stacks
    pub stack_count: usize,

    /// Share of attributed samples in the heaviest stack
    pub hottest_stack_percentage: f64,

    /// Heaviest stacks needed to cover 80% of attributed samples
    pub stacks_for_80_percent: usize,
}

impl SampleDistribution {
    /// Returns true if at most 10% of the stacks hold 80% of the samples
    pub fn is_highly_concentrated(&self) -> bool {
        self.stack_count > 0 && self.stacks_for_80_percent * 10 <= self.stack_count
    }

    /// Get human-readable summary
    ///
    /// **Public** - for logging and debugging
    pub fn summary(&self) -> String {
        format!(
            "Samples: {} ({} without stack) | Stacks: {} | Hottest: {:.1}% | 80% in {} stacks",
            self.thread_samples,
            self.stackless_samples,
            self.stack_count,
            self.hottest_stack_percentage,
            self.stacks_for_80_percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_hot_paths() {
        let stacks = vec![
            CollapsedStack::new("main;execute".to_string(), 50),
            CollapsedStack::new("main;storage".to_string(), 30),
            CollapsedStack::new("main;compute".to_string(), 20),
        ];

        let hot_paths = calculate_hot_paths(&stacks, 100, 2);

        assert_eq!(hot_paths.len(), 2);
        assert_eq!(hot_paths[0].stack, "main;execute");
        assert_eq!(hot_paths[0].samples, 50);
        assert_eq!(hot_paths[0].percentage, 50.0);
    }

    #[test]
    fn test_distribution_counts_stackless_samples() {
        let stacks = vec![
            CollapsedStack::new("main;a".to_string(), 6),
            CollapsedStack::new("main;b".to_string(), 2),
            CollapsedStack::new("main;c".to_string(), 2),
        ];

        let dist = calculate_sample_distribution(&stacks, 12);

        assert_eq!(dist.stackless_samples, 2);
        assert_eq!(dist.stack_count, 3);
        assert_eq!(dist.hottest_stack_percentage, 60.0);
        assert_eq!(dist.stacks_for_80_percent, 2);
        assert!(!dist.is_highly_concentrated());
    }

    #[test]
    fn test_distribution_concentrated_in_one_stack() {
        let mut stacks = vec![CollapsedStack::new("main;hot".to_string(), 900)];
        for i in 0..9 {
            stacks.push(CollapsedStack::new(format!("main;cold{}", i), 10));
        }

        let dist = calculate_sample_distribution(&stacks, 990);

        assert_eq!(dist.stacks_for_80_percent, 1);
        assert!(dist.is_highly_concentrated());
    }

    #[test]
    fn test_distribution_only_stackless() {
        let dist = calculate_sample_distribution(&[], 4);
        assert_eq!(dist.stackless_samples, 4);
        assert_eq!(dist.stack_count, 0);
        assert!(!dist.is_highly_concentrated());
    }

    #[test]
    fn test_hot_path_without_samples() {
        let stack = CollapsedStack::new("idle".to_string(), 0);
        let hot_path = create_hot_path(&stack, 0);
        assert_eq!(hot_path.percentage, 0.0);
    }
}
