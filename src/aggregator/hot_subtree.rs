//! Marker-scoped aggregation: who pays for the calls under a given function?
//!
//! The user names a function (the "marker"). Only samples whose stack passes
//! through a marker are kept, and cost is summed per function over the
//! subtrees rooted at marker frames. A marker that recurses into itself is
//! counted once per sample.

use super::merge::{merge_call_stacks, MergeMode};
use super::thread_stacks::{collect_thread_stack_frames, frame_slot, StackFrameSamples};
use crate::parser::{FunctionData, Sample, StackFrame, TraceStore, NO_INDEX};
use crate::utils::error::TraceError;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Aggregated counts for one function inside the marker subtrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSampleData {
    pub function_id: i32,
    pub self_count: u64,
    pub total_count: u64,
}

/// Whether a frame lies inside a marker subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Active,
    Filtered,
}

/// Ids of every function whose name contains `needle` (case-insensitive)
///
/// An empty needle matches nothing.
pub fn find_functions_by_name(functions: &[FunctionData], needle: &str) -> HashSet<i32> {
    if needle.is_empty() {
        return HashSet::new();
    }
    let needle = needle.to_lowercase();

    functions
        .par_iter()
        .enumerate()
        .filter(|(_, function)| function.name.to_lowercase().contains(&needle))
        .map(|(id, _)| id as i32)
        .collect()
}

/// Keep the thread's samples whose caller chain passes through a marker
///
/// # Errors
/// * `TraceError::InvalidIndex` - a stack or caller id outside `frames`
/// * `TraceError::DataCorruption` - a caller chain longer than the frame table
pub fn filter_samples_by_marker(
    samples: &[Sample],
    frames: &[StackFrame],
    thread_index: i32,
    markers: &HashSet<i32>,
) -> Result<Vec<Sample>, TraceError> {
    let keep: Vec<bool> = samples
        .par_iter()
        .map(|sample| {
            if sample.thread_index != thread_index {
                return Ok(false);
            }
            stack_contains_marker(sample.stack_trace_id, frames, markers)
        })
        .collect::<Result<_, _>>()?;

    Ok(samples
        .iter()
        .zip(keep)
        .filter_map(|(sample, keep)| keep.then_some(*sample))
        .collect())
}

/// Walk from a leaf frame to its root, stopping at the first marker
fn stack_contains_marker(
    leaf: i32,
    frames: &[StackFrame],
    markers: &HashSet<i32>,
) -> Result<bool, TraceError> {
    let mut current = leaf;
    let mut steps = 0usize;
    while current != NO_INDEX {
        let frame = &frames[frame_slot(current, frames.len())?];
        if markers.contains(&frame.function_id) {
            return Ok(true);
        }

        steps += 1;
        if steps > frames.len() {
            return Err(TraceError::DataCorruption(format!(
                "caller chain of frame {} does not terminate",
                leaf
            )));
        }
        current = frame.caller_frame_id;
    }
    Ok(false)
}

/// Per-function self/total counts inside marker subtrees of one thread
///
/// **Public** - main entry point for hot-subtree analysis
///
/// # Algorithm
/// 1. Merge stacks by function
/// 2. Keep samples whose stack contains a marker
/// 3. Collect the thread's frames with self/total counts
/// 4. Mark frames Active top-down: a marker frame or a callee of an Active frame
/// 5. Sum self counts of Active frames per function; sum total counts only
///    for frames with no ancestor of the same function
///
/// # Returns
/// Functions sorted by total count, then self count (both descending)
pub fn aggregate_hot_subtree(
    samples: &[Sample],
    frames: &[StackFrame],
    thread_index: i32,
    markers: &HashSet<i32>,
) -> Result<Vec<FunctionSampleData>, TraceError> {
    if markers.is_empty() {
        return Ok(Vec::new());
    }

    let merged = merge_call_stacks(samples, frames, MergeMode::ByFunction)?;
    let filtered =
        filter_samples_by_marker(&merged.samples, &merged.frames, thread_index, markers)?;
    debug!(
        "{} of {} samples pass through {} marker function(s)",
        filtered.len(),
        samples.len(),
        markers.len()
    );

    let stacks = collect_thread_stack_frames(&filtered, &merged.frames, thread_index)?;
    let result = aggregate_active_frames(&stacks.frames, markers);

    info!(
        "Hot subtree of thread {}: {} functions",
        thread_index,
        result.len()
    );
    Ok(result)
}

/// Steps 4 and 5; `frames` must list callers before callees
fn aggregate_active_frames(
    frames: &[StackFrameSamples],
    markers: &HashSet<i32>,
) -> Vec<FunctionSampleData> {
    let mut states = Vec::with_capacity(frames.len());
    for node in frames {
        let caller = node.frame.caller_frame_id;
        let caller_active = caller != NO_INDEX && states[caller as usize] == NodeState::Active;
        states.push(if caller_active || markers.contains(&node.frame.function_id) {
            NodeState::Active
        } else {
            NodeState::Filtered
        });
    }

    let mut per_function: HashMap<i32, FunctionSampleData> = HashMap::new();
    for (index, node) in frames.iter().enumerate() {
        if states[index] != NodeState::Active {
            continue;
        }

        let function_id = node.frame.function_id;
        let entry = per_function
            .entry(function_id)
            .or_insert(FunctionSampleData {
                function_id,
                self_count: 0,
                total_count: 0,
            });
        entry.self_count += u64::from(node.self_count);
        if !has_ancestor_with_function(frames, index, function_id) {
            entry.total_count += u64::from(node.total_count);
        }
    }

    let mut result: Vec<FunctionSampleData> = per_function.into_values().collect();
    result.sort_by(|a, b| {
        b.total_count
            .cmp(&a.total_count)
            .then(b.self_count.cmp(&a.self_count))
            .then(a.function_id.cmp(&b.function_id))
    });
    result
}

/// Callers always have a smaller index here, so the walk terminates
fn has_ancestor_with_function(
    frames: &[StackFrameSamples],
    index: usize,
    function_id: i32,
) -> bool {
    let mut caller = frames[index].frame.caller_frame_id;
    while caller != NO_INDEX {
        let node = &frames[caller as usize];
        if node.frame.function_id == function_id {
            return true;
        }
        caller = node.frame.caller_frame_id;
    }
    false
}

impl TraceStore {
    pub fn find_functions_by_name(&self, needle: &str) -> HashSet<i32> {
        find_functions_by_name(self.functions(), needle)
    }

    pub fn aggregate_hot_subtree(
        &self,
        thread_index: i32,
        markers: &HashSet<i32>,
    ) -> Result<Vec<FunctionSampleData>, TraceError> {
        aggregate_hot_subtree(self.samples(), self.stack_frames(), thread_index, markers)
    }
}
