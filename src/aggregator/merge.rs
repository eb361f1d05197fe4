//! Trace-wide deduplication of structurally identical call paths.
//!
//! Independent samples record the same call path as separate frame chains.
//! Merging walks the forest one depth level at a time and collapses siblings
//! that share a caller and a location into a single frame.

use super::remap::IndexRemap;
use super::thread_stacks::frame_slot;
use crate::parser::{Sample, StackFrame, TraceStore, NO_INDEX};
use crate::utils::error::TraceError;
use log::debug;
use std::fmt;
use std::str::FromStr;

/// What makes two sibling frames "the same"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeMode {
    /// Same code address
    ByAddress,
    /// Same resolved function; also folds generic/recursive instantiations
    ByFunction,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::ByAddress => write!(f, "address"),
            MergeMode::ByFunction => write!(f, "function"),
        }
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "address" | "by-address" => Ok(MergeMode::ByAddress),
            "function" | "by-function" => Ok(MergeMode::ByFunction),
            other => Err(format!("unknown merge mode '{}'", other)),
        }
    }
}

/// Merge key of a frame within its level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Location {
    Function(i32),
    Address(i64),
}

impl MergeMode {
    fn location_of(self, frame: &StackFrame) -> Location {
        match self {
            MergeMode::ByAddress => Location::Address(frame.address),
            // Unresolved frames only merge when their addresses match
            MergeMode::ByFunction if frame.function_id == NO_INDEX => {
                Location::Address(frame.address)
            }
            MergeMode::ByFunction => Location::Function(frame.function_id),
        }
    }
}

/// Result of a merge: a new frame array and samples pointing into it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedStacks {
    /// Deduplicated frames, shallower levels first
    pub frames: Vec<StackFrame>,

    /// Input samples with `stack_trace_id` rewritten into `frames`
    pub samples: Vec<Sample>,

    /// Input frame index -> merged frame index
    pub remap: IndexRemap,
}

/// Collapse identical call paths
///
/// **Public** - main entry point for call-stack deduplication
///
/// # Algorithm
/// 1. Group frames by depth, shallowest first
/// 2. Per level: rewrite each caller to its merged index (callers live on a
///    shallower level and are already merged)
/// 3. Sort the level by (merged caller, location, original index)
/// 4. Emit one frame per run of equal (merged caller, location)
/// 5. Rewrite every sample's `stack_trace_id`
///
/// # Errors
/// * `TraceError::InvalidIndex` - a caller or stack id outside `frames`
/// * `TraceError::DataCorruption` - a caller that is not shallower than its callee
pub fn merge_call_stacks(
    samples: &[Sample],
    frames: &[StackFrame],
    mode: MergeMode,
) -> Result<MergedStacks, TraceError> {
    let mut by_depth: Vec<usize> = (0..frames.len()).collect();
    by_depth.sort_unstable_by_key(|&i| (frames[i].depth, i));

    let mut remap = IndexRemap::new(frames.len());
    let mut merged: Vec<StackFrame> = Vec::with_capacity(frames.len());
    let mut level: Vec<(i32, Location, usize)> = Vec::new();

    let mut level_start = 0;
    while level_start < by_depth.len() {
        let depth = frames[by_depth[level_start]].depth;
        let level_end = by_depth[level_start..]
            .iter()
            .position(|&i| frames[i].depth != depth)
            .map_or(by_depth.len(), |len| level_start + len);

        level.clear();
        for &old in &by_depth[level_start..level_end] {
            let frame = &frames[old];
            let caller = if frame.caller_frame_id == NO_INDEX {
                NO_INDEX
            } else {
                let slot = frame_slot(frame.caller_frame_id, frames.len())?;
                let mapped = remap.apply(slot as i32);
                if mapped == NO_INDEX {
                    return Err(TraceError::DataCorruption(format!(
                        "frame {} at depth {} has caller {} that is not shallower",
                        old, depth, slot
                    )));
                }
                mapped
            };
            level.push((caller, mode.location_of(frame), old));
        }
        level.sort_unstable();

        let mut run_start = 0;
        while run_start < level.len() {
            let (caller, location, first) = level[run_start];
            let new_index = merged.len();
            merged.push(StackFrame {
                caller_frame_id: caller,
                ..frames[first]
            });

            let mut run_end = run_start;
            while run_end < level.len()
                && level[run_end].0 == caller
                && level[run_end].1 == location
            {
                remap.insert(level[run_end].2, new_index);
                run_end += 1;
            }
            run_start = run_end;
        }

        level_start = level_end;
    }

    let mut out_samples = samples.to_vec();
    for sample in out_samples.iter_mut() {
        if sample.stack_trace_id != NO_INDEX {
            frame_slot(sample.stack_trace_id, frames.len())?;
            sample.stack_trace_id = remap.apply(sample.stack_trace_id);
        }
    }

    debug!(
        "Merged {} frames into {} ({})",
        frames.len(),
        merged.len(),
        mode
    );

    Ok(MergedStacks {
        frames: merged,
        samples: out_samples,
        remap,
    })
}

impl TraceStore {
    /// Deduplicate the store's call stacks
    pub fn merge_call_stacks(&self, mode: MergeMode) -> Result<MergedStacks, TraceError> {
        merge_call_stacks(self.samples(), self.stack_frames(), mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(address: i64, function_id: i32, caller: i32, depth: i32) -> StackFrame {
        StackFrame {
            address,
            function_id,
            caller_frame_id: caller,
            depth,
        }
    }

    #[test]
    fn test_equal_roots_collapse() {
        let frames = [frame(0x10, 0, -1, 1), frame(0x10, 0, -1, 1)];
        let merged = merge_call_stacks(&[], &frames, MergeMode::ByAddress).unwrap();
        assert_eq!(merged.frames.len(), 1);
        assert_eq!(merged.remap.apply(1), 0);
    }

    #[test]
    fn test_equal_address_different_depth_survives() {
        let frames = [frame(0x10, 0, -1, 1), frame(0x10, 0, 0, 2)];
        let merged = merge_call_stacks(&[], &frames, MergeMode::ByAddress).unwrap();
        assert_eq!(merged.frames.len(), 2);
        assert_eq!(merged.frames[1].caller_frame_id, 0);
    }

    #[test]
    fn test_by_function_folds_addresses() {
        // same function entered at two addresses under the same root
        let frames = [
            frame(0x10, 0, -1, 1),
            frame(0x20, 1, 0, 2),
            frame(0x24, 1, 0, 2),
        ];
        let by_address = merge_call_stacks(&[], &frames, MergeMode::ByAddress).unwrap();
        let by_function = merge_call_stacks(&[], &frames, MergeMode::ByFunction).unwrap();
        assert_eq!(by_address.frames.len(), 3);
        assert_eq!(by_function.frames.len(), 2);
        assert_eq!(by_function.frames[1].address, 0x20);
    }

    #[test]
    fn test_unknown_functions_merge_by_address() {
        let frames = [frame(0x10, -1, -1, 1), frame(0x20, -1, -1, 1)];
        let merged = merge_call_stacks(&[], &frames, MergeMode::ByFunction).unwrap();
        assert_eq!(merged.frames.len(), 2);
    }

    #[test]
    fn test_caller_on_same_level_rejected() {
        let frames = [frame(0x10, 0, 1, 1), frame(0x20, 0, -1, 1)];
        let result = merge_call_stacks(&[], &frames, MergeMode::ByAddress);
        assert!(matches!(result, Err(TraceError::DataCorruption(_))));
    }

    #[test]
    fn test_merge_mode_parse() {
        assert_eq!("Function".parse::<MergeMode>().unwrap(), MergeMode::ByFunction);
        assert_eq!("by-address".parse::<MergeMode>().unwrap(), MergeMode::ByAddress);
        assert!("stack".parse::<MergeMode>().is_err());
    }
}
