//! Flat per-function sample tally for one thread.

use crate::parser::{Sample, TraceStore};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Samples attributed to one function (`-1` = unknown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatMapEntry {
    pub function_id: i32,
    pub sample_count: u32,
}

/// Count the thread's samples per function
///
/// **Public** - main entry point for the flat profile
///
/// # Returns
/// Entries sorted by sample count (descending), then function id (ascending)
pub fn build_function_heat_map(samples: &[Sample], thread_index: i32) -> Vec<HeatMapEntry> {
    let mut counts: HashMap<i32, u32> = HashMap::new();
    for sample in samples.iter().filter(|s| s.thread_index == thread_index) {
        *counts.entry(sample.function_id).or_insert(0) += 1;
    }

    let mut entries: Vec<HeatMapEntry> = counts
        .into_iter()
        .map(|(function_id, sample_count)| HeatMapEntry {
            function_id,
            sample_count,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.sample_count
            .cmp(&a.sample_count)
            .then(a.function_id.cmp(&b.function_id))
    });

    debug!(
        "Heat map for thread {}: {} functions",
        thread_index,
        entries.len()
    );
    entries
}

impl TraceStore {
    pub fn function_heat_map(&self, thread_index: i32) -> Vec<HeatMapEntry> {
        build_function_heat_map(self.samples(), thread_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::NO_INDEX;

    fn sample(function_id: i32, thread_index: i32) -> Sample {
        Sample {
            stack_trace_id: NO_INDEX,
            function_id,
            address: 0,
            timestamp: 0.0,
            thread_index,
        }
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let samples = [
            sample(3, 0),
            sample(1, 0),
            sample(3, 0),
            sample(2, 0),
            sample(NO_INDEX, 0),
            sample(3, 1),
        ];
        let entries = build_function_heat_map(&samples, 0);

        assert_eq!(
            entries,
            vec![
                HeatMapEntry { function_id: 3, sample_count: 2 },
                HeatMapEntry { function_id: NO_INDEX, sample_count: 1 },
                HeatMapEntry { function_id: 1, sample_count: 1 },
                HeatMapEntry { function_id: 2, sample_count: 1 },
            ]
        );
    }

    #[test]
    fn test_unknown_thread_is_empty() {
        assert!(build_function_heat_map(&[sample(0, 0)], 5).is_empty());
    }
}
