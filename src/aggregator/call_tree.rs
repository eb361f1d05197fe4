//! Top-down call tree built from a thread's collected frames.

use super::thread_stacks::ThreadStacks;
use super::tree_index::{build_tree_index, TreeIndex};
use crate::output::schema::CallTreeNode;
use crate::parser::TraceStore;
use crate::utils::config::{DEFAULT_TREE_DEPTH, DEFAULT_TREE_MIN_PERCENTAGE};
use crate::utils::error::TraceError;
use log::debug;

/// Pruning applied while building the tree
#[derive(Debug, Clone, Copy)]
pub struct CallTreeOptions {
    /// Deepest level kept (roots are level 1)
    pub max_depth: usize,

    /// Nodes below this share of the thread's attributed samples are dropped
    pub min_percentage: f64,
}

impl Default for CallTreeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_TREE_DEPTH,
            min_percentage: DEFAULT_TREE_MIN_PERCENTAGE,
        }
    }
}

/// Build the nested call tree of a thread
///
/// Children are ordered by total samples (descending), ties keep frame order.
pub fn build_call_tree(
    trace: &TraceStore,
    stacks: &ThreadStacks,
    options: &CallTreeOptions,
) -> Result<Vec<CallTreeNode>, TraceError> {
    let index = build_tree_index(&stacks.frames)?;
    let attributed = stacks.attributed_sample_count() as f64;
    let min_total = (attributed * options.min_percentage / 100.0).ceil().max(1.0) as u32;

    let builder = TreeBuilder {
        trace,
        stacks,
        index: &index,
        min_total,
        max_depth: options.max_depth,
    };
    let roots = builder.build_level(index.roots(), 1);

    debug!(
        "Call tree: {} roots (min total {}, max depth {})",
        roots.len(),
        min_total,
        options.max_depth
    );
    Ok(roots)
}

struct TreeBuilder<'a> {
    trace: &'a TraceStore,
    stacks: &'a ThreadStacks,
    index: &'a TreeIndex,
    min_total: u32,
    max_depth: usize,
}

impl TreeBuilder<'_> {
    fn build_level(&self, members: &[u32], level: usize) -> Vec<CallTreeNode> {
        if level > self.max_depth {
            return Vec::new();
        }

        let mut members: Vec<usize> = members
            .iter()
            .map(|&m| m as usize)
            .filter(|&m| self.stacks.frames[m].total_count >= self.min_total)
            .collect();
        members.sort_by_key(|&m| std::cmp::Reverse(self.stacks.frames[m].total_count));

        members
            .into_iter()
            .map(|m| {
                let node = &self.stacks.frames[m];
                CallTreeNode {
                    function_id: node.frame.function_id,
                    function: self.trace.function_name(node.frame.function_id).to_string(),
                    address: node.frame.address,
                    self_samples: u64::from(node.self_count),
                    total_samples: u64::from(node.total_count),
                    children: self.build_level(self.index.children(m), level + 1),
                }
            })
            .collect()
    }
}
