//! Old-to-new index tables for frame renumbering.
//!
//! Every transform that reorders or deduplicates frames records the mapping
//! it used, so callers can tell which id space a sample's `stack_trace_id`
//! currently refers to.

use crate::parser::NO_INDEX;

/// Mapping from indices of one array to indices of another
///
/// Unmapped entries hold `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexRemap {
    new_of_old: Vec<i32>,
}

impl IndexRemap {
    /// Empty mapping over `old_len` source indices
    pub fn new(old_len: usize) -> Self {
        Self {
            new_of_old: vec![NO_INDEX; old_len],
        }
    }

    /// Build from a permutation where `order[new] == old`
    pub fn from_order(order: &[usize], old_len: usize) -> Self {
        let mut remap = Self::new(old_len);
        for (new, &old) in order.iter().enumerate() {
            remap.insert(old, new);
        }
        remap
    }

    pub fn insert(&mut self, old: usize, new: usize) {
        self.new_of_old[old] = new as i32;
    }

    /// Translate an old index; `-1`, out-of-range and unmapped indices give `-1`
    pub fn apply(&self, old: i32) -> i32 {
        usize::try_from(old)
            .ok()
            .and_then(|i| self.new_of_old.get(i))
            .copied()
            .unwrap_or(NO_INDEX)
    }

    /// Mapping equivalent to applying `self` and then `next`
    pub fn compose_with(&self, next: &IndexRemap) -> IndexRemap {
        IndexRemap {
            new_of_old: self.new_of_old.iter().map(|&mid| next.apply(mid)).collect(),
        }
    }

    /// Number of source indices
    pub fn len(&self) -> usize {
        self.new_of_old.len()
    }

    pub fn is_empty(&self) -> bool {
        self.new_of_old.is_empty()
    }

    /// Number of source indices that survived
    pub fn mapped_count(&self) -> usize {
        self.new_of_old.iter().filter(|&&n| n != NO_INDEX).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_order() {
        let remap = IndexRemap::from_order(&[2, 0], 3);
        assert_eq!(remap.apply(2), 0);
        assert_eq!(remap.apply(0), 1);
        assert_eq!(remap.apply(1), NO_INDEX);
        assert_eq!(remap.apply(NO_INDEX), NO_INDEX);
        assert_eq!(remap.apply(17), NO_INDEX);
        assert_eq!(remap.mapped_count(), 2);
    }

    #[test]
    fn test_compose_with() {
        // 0->1, 1->0, 2 dropped; then 0->0, 1->0 (merge)
        let first = IndexRemap::from_order(&[1, 0], 3);
        let mut second = IndexRemap::new(2);
        second.insert(0, 0);
        second.insert(1, 0);

        let composed = first.compose_with(&second);
        assert_eq!(composed.len(), 3);
        assert_eq!(composed.apply(0), 0);
        assert_eq!(composed.apply(1), 0);
        assert_eq!(composed.apply(2), NO_INDEX);
    }
}
