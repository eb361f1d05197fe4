//! Build collapsed stack format from a thread's call tree.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "parent;child;grandchild weight"
//!
//! Example: "main;parse_file;alloc 120"
//! This means: 120 samples landed in alloc while called from parse_file from main.

use super::thread_stacks::ThreadStacks;
use crate::parser::{TraceStore, NO_INDEX};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single collapsed stack entry
///
/// **Public** - used by flamegraph generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string
    pub stack: String,

    /// Weight (samples whose leaf is the last frame of this stack)
    pub weight: u64,
}

impl CollapsedStack {
    /// Create a new collapsed stack
    ///
    /// **Public** - constructor
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Line in the folded format understood by flamegraph tools
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Build collapsed stacks from a thread's collected frames
///
/// **Public** - main entry point for stack building
///
/// # Arguments
/// * `trace` - Store used to resolve function names
/// * `stacks` - Collector output for one thread
///
/// # Returns
/// Vector of collapsed stacks, one per unique name path, heaviest first
///
/// # Algorithm
/// 1. For every frame with self samples, walk up to the root
/// 2. Join function names root-first
/// 3. Aggregate by unique stack (frames merged by address can share a name path)
pub fn build_collapsed_stacks(trace: &TraceStore, stacks: &ThreadStacks) -> Vec<CollapsedStack> {
    debug!(
        "Building collapsed stacks from {} frames",
        stacks.frames.len()
    );

    let mut stack_map: HashMap<String, u64> = HashMap::new();
    let mut names: Vec<&str> = Vec::new();

    for node in stacks.frames.iter().filter(|f| f.self_count > 0) {
        names.clear();
        names.push(trace.function_name(node.frame.function_id));

        // Callers precede callees in collector output, so this ends at a root
        let mut caller = node.frame.caller_frame_id;
        while caller != NO_INDEX {
            let frame = &stacks.frames[caller as usize].frame;
            names.push(trace.function_name(frame.function_id));
            caller = frame.caller_frame_id;
        }
        names.reverse();

        // ';' separates frames in the folded format
        let stack_str = names
            .iter()
            .map(|n| n.replace(';', ":"))
            .collect::<Vec<_>>()
            .join(";");
        *stack_map.entry(stack_str).or_insert(0) += u64::from(node.self_count);
    }

    let mut stacks: Vec<CollapsedStack> = stack_map
        .into_iter()
        .map(|(stack, weight)| CollapsedStack::new(stack, weight))
        .collect();

    stacks.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));
    debug!("Built {} unique collapsed stacks", stacks.len());

    stacks
}
