//! Per-thread projection of the frame forest with self/total sample counts.
//!
//! The collector keeps only the frames a thread's samples can reach, renumbers
//! them so every caller precedes its callees, and accumulates counts bottom-up.

use super::remap::IndexRemap;
use super::tree_index::TreeNode;
use crate::parser::{Sample, StackFrame, TraceStore, NO_INDEX};
use crate::utils::error::TraceError;
use log::debug;

/// A frame of a thread's call tree with its sample counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrameSamples {
    pub frame: StackFrame,

    /// Samples whose leaf is exactly this frame
    pub self_count: u32,

    /// Self count plus the total of every callee
    pub total_count: u32,

    /// Start of this frame's run in `ThreadStacks::samples`
    pub samples_offset: u32,
}

impl TreeNode for StackFrameSamples {
    fn parent(&self) -> i32 {
        self.frame.caller_frame_id
    }

    fn depth(&self) -> i32 {
        self.frame.depth
    }
}

/// Output of the collector for one thread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadStacks {
    /// Thread samples, sorted by (renumbered) `stack_trace_id`; samples
    /// without a stack come first
    pub samples: Vec<Sample>,

    /// Reachable frames in depth order; callers precede callees
    pub frames: Vec<StackFrameSamples>,

    /// Input frame index -> `frames` index
    pub remap: IndexRemap,
}

impl ThreadStacks {
    /// Samples whose leaf is `frame`
    pub fn samples_of(&self, frame: usize) -> &[Sample] {
        match self.frames.get(frame) {
            Some(f) if f.self_count > 0 => {
                let start = f.samples_offset as usize;
                &self.samples[start..start + f.self_count as usize]
            }
            _ => &[],
        }
    }

    /// Samples that carry a stack
    pub fn attributed_sample_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.stack_trace_id != NO_INDEX)
            .count()
    }
}

/// Project the frame forest onto one thread and count samples per frame
///
/// **Public** - main entry point for per-thread trees
///
/// # Arguments
/// * `samples` - All samples of the trace (any thread)
/// * `frames` - The frame array the samples' `stack_trace_id`s refer to
/// * `thread_index` - Thread to keep
///
/// # Algorithm
/// 1. Keep the thread's samples and mark their leaf frames
/// 2. Add every ancestor of a marked frame (fixed point)
/// 3. Sort kept frames by depth, renumber, rewrite callers and samples
/// 4. Sort samples by frame, count runs into `self_count`
/// 5. Walk frames in reverse and push totals into callers
///
/// # Errors
/// * `TraceError::InvalidIndex` - a stack or caller id outside `frames`
/// * `TraceError::DataCorruption` - a caller that does not sort before its
///   callee (cyclic chain or inconsistent depths)
pub fn collect_thread_stack_frames(
    samples: &[Sample],
    frames: &[StackFrame],
    thread_index: i32,
) -> Result<ThreadStacks, TraceError> {
    let mut kept = vec![false; frames.len()];
    let mut collected: Vec<usize> = Vec::new();
    let mut thread_samples: Vec<Sample> = Vec::new();

    for sample in samples.iter().filter(|s| s.thread_index == thread_index) {
        thread_samples.push(*sample);
        if sample.stack_trace_id == NO_INDEX {
            continue;
        }
        let frame = frame_slot(sample.stack_trace_id, frames.len())?;
        if !kept[frame] {
            kept[frame] = true;
            collected.push(frame);
        }
    }

    // `kept` doubles as the visited set, so a cyclic caller chain ends the walk
    let mut cursor = 0;
    while cursor < collected.len() {
        let caller = frames[collected[cursor]].caller_frame_id;
        cursor += 1;
        if caller == NO_INDEX {
            continue;
        }
        let caller = frame_slot(caller, frames.len())?;
        if !kept[caller] {
            kept[caller] = true;
            collected.push(caller);
        }
    }

    collected.sort_unstable_by_key(|&old| (frames[old].depth, old));
    let remap = IndexRemap::from_order(&collected, frames.len());

    let mut out_frames = Vec::with_capacity(collected.len());
    for (new, &old) in collected.iter().enumerate() {
        let mut frame = frames[old];
        frame.caller_frame_id = remap.apply(frame.caller_frame_id);
        if frame.caller_frame_id >= new as i32 {
            return Err(TraceError::DataCorruption(format!(
                "frame {} does not sort after its caller {} (cyclic or inconsistent depths)",
                old, frames[old].caller_frame_id
            )));
        }
        out_frames.push(StackFrameSamples {
            frame,
            self_count: 0,
            total_count: 0,
            samples_offset: 0,
        });
    }

    for sample in thread_samples.iter_mut() {
        sample.stack_trace_id = remap.apply(sample.stack_trace_id);
    }
    // Stable, so samples of one frame keep their time order
    thread_samples.sort_by_key(|s| s.stack_trace_id);

    let mut run_start = 0;
    while run_start < thread_samples.len() {
        let id = thread_samples[run_start].stack_trace_id;
        let mut run_end = run_start + 1;
        while run_end < thread_samples.len() && thread_samples[run_end].stack_trace_id == id {
            run_end += 1;
        }
        if id != NO_INDEX {
            let frame = &mut out_frames[id as usize];
            frame.self_count = (run_end - run_start) as u32;
            frame.samples_offset = run_start as u32;
        }
        run_start = run_end;
    }

    accumulate_totals(&mut out_frames);

    debug!(
        "Thread {}: {} samples, {} of {} frames reachable",
        thread_index,
        thread_samples.len(),
        out_frames.len(),
        frames.len()
    );

    Ok(ThreadStacks {
        samples: thread_samples,
        frames: out_frames,
        remap,
    })
}

/// Bottom-up pass; relies on callers being stored before their callees
fn accumulate_totals(frames: &mut [StackFrameSamples]) {
    for index in (0..frames.len()).rev() {
        frames[index].total_count += frames[index].self_count;
        let caller = frames[index].frame.caller_frame_id;
        if caller != NO_INDEX {
            let total = frames[index].total_count;
            frames[caller as usize].total_count += total;
        }
    }
}

/// Bounds-check a frame id
pub(crate) fn frame_slot(id: i32, len: usize) -> Result<usize, TraceError> {
    usize::try_from(id)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| TraceError::invalid_index("stack frame", id, len))
}

impl TraceStore {
    /// Per-thread call tree over the store's own frame array
    pub fn collect_thread_stack_frames(
        &self,
        thread_index: i32,
    ) -> Result<ThreadStacks, TraceError> {
        collect_thread_stack_frames(self.samples(), self.stack_frames(), thread_index)
    }
}
