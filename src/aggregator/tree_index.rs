//! Parent-pointer to children-range conversion.
//!
//! Frames only know their caller. Views that walk a tree top-down need the
//! opposite direction, so we sort element indices by (depth, parent) and cut
//! the sorted order into one contiguous range per parent.
//!
//! Slot 0 holds the roots (parent `-1`), slot `i + 1` holds the children of
//! element `i`.

use crate::parser::{StackFrame, NO_INDEX};
use crate::utils::error::TraceError;
use log::debug;

/// Anything that sits in an index-linked forest
pub trait TreeNode {
    /// Index of the parent element, `-1` for roots
    fn parent(&self) -> i32;

    /// 1-based depth; a parent is always shallower than its children
    fn depth(&self) -> i32;
}

impl TreeNode for StackFrame {
    fn parent(&self) -> i32 {
        self.caller_frame_id
    }

    fn depth(&self) -> i32 {
        self.depth
    }
}

/// A run of `data_index_of_child`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildRange {
    pub offset: u32,
    pub count: u32,
}

/// Children lookup table for an index-linked forest of `N` elements
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeIndex {
    /// `N + 1` ranges, slot 0 is the virtual root
    children_of: Vec<ChildRange>,

    /// Element indices, grouped by parent
    data_index_of_child: Vec<u32>,
}

impl TreeIndex {
    /// Number of indexed elements
    pub fn len(&self) -> usize {
        self.data_index_of_child.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_index_of_child.is_empty()
    }

    /// Elements without a parent
    pub fn roots(&self) -> &[u32] {
        self.slot(0)
    }

    /// Direct children of `element`
    pub fn children(&self, element: usize) -> &[u32] {
        self.slot(element + 1)
    }

    pub fn child_count(&self, element: usize) -> usize {
        self.children_of
            .get(element + 1)
            .map_or(0, |range| range.count as usize)
    }

    /// Raw range of a slot (0 = roots, `i + 1` = children of `i`)
    pub fn range(&self, slot: usize) -> ChildRange {
        self.children_of.get(slot).copied().unwrap_or_default()
    }

    pub fn data_index_of_child(&self) -> &[u32] {
        &self.data_index_of_child
    }

    fn slot(&self, slot: usize) -> &[u32] {
        match self.children_of.get(slot) {
            Some(range) => {
                let start = range.offset as usize;
                &self.data_index_of_child[start..start + range.count as usize]
            }
            None => &[],
        }
    }
}

/// Build a tree index for elements implementing [`TreeNode`]
///
/// **Public** - main entry point for tree views
pub fn build_tree_index<T: TreeNode>(data: &[T]) -> Result<TreeIndex, TraceError> {
    build_tree_index_by(data, T::parent, T::depth)
}

/// Build a tree index with explicit parent/depth accessors
///
/// # Algorithm
/// 1. Sort element indices by (depth, parent, index)
/// 2. Scan once, closing a range at every change of parent
///
/// # Errors
/// * `TraceError::InvalidIndex` - a parent index outside `-1..N`
/// * `TraceError::DataCorruption` - children of one parent are not
///   contiguous, which only happens when depths contradict the parent links
pub fn build_tree_index_by<T>(
    data: &[T],
    parent_of: impl Fn(&T) -> i32,
    depth_of: impl Fn(&T) -> i32,
) -> Result<TreeIndex, TraceError> {
    let n = data.len();

    let mut keys = Vec::with_capacity(n);
    for (index, element) in data.iter().enumerate() {
        let parent = parent_of(element);
        if parent < NO_INDEX || parent >= n as i32 {
            return Err(TraceError::invalid_index("tree parent", parent, n));
        }
        keys.push((depth_of(element), parent, index));
    }
    // Keys are unique by index, so an unstable sort is deterministic
    keys.sort_unstable();

    let mut children_of = vec![ChildRange::default(); n + 1];
    let mut closed = vec![false; n + 1];
    let mut data_index_of_child = Vec::with_capacity(n);
    let mut run_start = 0usize;

    for (pos, &(_, parent, index)) in keys.iter().enumerate() {
        data_index_of_child.push(index as u32);

        let run_ends = keys.get(pos + 1).map_or(true, |next| next.1 != parent);
        if !run_ends {
            continue;
        }

        let slot = (parent + 1) as usize;
        if closed[slot] {
            return Err(TraceError::DataCorruption(format!(
                "children of element {} span several depths",
                parent
            )));
        }
        closed[slot] = true;
        children_of[slot] = ChildRange {
            offset: run_start as u32,
            count: (pos + 1 - run_start) as u32,
        };
        run_start = pos + 1;
    }

    debug!(
        "Built tree index over {} elements ({} roots)",
        n, children_of[0].count
    );

    Ok(TreeIndex {
        children_of,
        data_index_of_child,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        parent: i32,
        depth: i32,
    }

    impl TreeNode for Node {
        fn parent(&self) -> i32 {
            self.parent
        }

        fn depth(&self) -> i32 {
            self.depth
        }
    }

    fn nodes(links: &[(i32, i32)]) -> Vec<Node> {
        links
            .iter()
            .map(|&(parent, depth)| Node { parent, depth })
            .collect()
    }

    #[test]
    fn test_parent_chain_out_of_order() {
        // node0 -> node1, node1 is the root, node2 -> node0
        let data = nodes(&[(1, 2), (-1, 1), (0, 3)]);
        let index = build_tree_index(&data).unwrap();

        assert_eq!(index.roots(), &[1]);
        assert_eq!(index.children(1), &[0]);
        assert_eq!(index.children(0), &[2]);
        assert!(index.children(2).is_empty());
        assert_eq!(index.child_count(2), 0);
    }

    #[test]
    fn test_siblings_keep_original_order() {
        let data = nodes(&[(-1, 1), (0, 2), (-1, 1), (0, 2), (2, 2)]);
        let index = build_tree_index(&data).unwrap();

        assert_eq!(index.roots(), &[0, 2]);
        assert_eq!(index.children(0), &[1, 3]);
        assert_eq!(index.children(2), &[4]);
    }

    #[test]
    fn test_ranges_partition_children() {
        let data = nodes(&[(-1, 1), (0, 2), (1, 3), (1, 3), (0, 2), (-1, 1)]);
        let index = build_tree_index(&data).unwrap();

        let mut seen: Vec<u32> = (0..=data.len())
            .flat_map(|slot| {
                let range = index.range(slot);
                let start = range.offset as usize;
                index.data_index_of_child()[start..start + range.count as usize].to_vec()
            })
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_empty_input() {
        let index = build_tree_index::<Node>(&[]).unwrap();
        assert!(index.is_empty());
        assert!(index.roots().is_empty());
        assert_eq!(index.range(0), ChildRange::default());
    }

    #[test]
    fn test_parent_out_of_range() {
        let data = nodes(&[(-1, 1), (4, 2)]);
        assert!(matches!(
            build_tree_index(&data),
            Err(TraceError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_contradicting_depths_detected() {
        // two children of node0 at depths 2 and 4, separated by node2's child at depth 3
        let data = nodes(&[(-1, 1), (0, 2), (1, 3), (0, 4)]);
        assert!(matches!(
            build_tree_index(&data),
            Err(TraceError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_explicit_accessors() {
        let parents = [-1, 0, 0];
        let index = build_tree_index_by(&parents, |&p| p, |&p| if p < 0 { 1 } else { 2 }).unwrap();
        assert_eq!(index.children(0), &[1, 2]);
    }
}
