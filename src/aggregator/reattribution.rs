//! Move samples out of functions that should never be blamed.
//!
//! Instrumentation stubs, trampolines and similar glue show up as sample
//! leaves but are never what the user wants to optimize. Samples landing in
//! such functions (or in unresolved code) are handed to the nearest caller
//! frame whose function is known and not filtered.

use super::thread_stacks::frame_slot;
use crate::parser::{FunctionData, Sample, StackFrame, TraceStore, NO_INDEX};
use crate::utils::error::TraceError;
use log::debug;
use rayon::prelude::*;

/// Per-function "never blame" flags
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReattributionFilter {
    filtered: Vec<bool>,
}

impl ReattributionFilter {
    /// Propagate per-module flags to functions
    ///
    /// Functions without a (valid) module take `default_filtered`.
    pub fn from_module_flags(
        functions: &[FunctionData],
        module_filtered: &[bool],
        default_filtered: bool,
    ) -> Self {
        let filtered = functions
            .iter()
            .map(|function| {
                usize::try_from(function.module_id)
                    .ok()
                    .and_then(|m| module_filtered.get(m))
                    .copied()
                    .unwrap_or(default_filtered)
            })
            .collect();
        Self { filtered }
    }

    /// Filter every module whose file path contains one of `patterns` (case-insensitive)
    pub fn from_module_patterns(
        trace: &TraceStore,
        patterns: &[String],
        default_filtered: bool,
    ) -> Self {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_lowercase()).collect();
        let module_filtered: Vec<bool> = trace
            .modules()
            .iter()
            .map(|module| {
                let path = module.file_path.to_lowercase();
                patterns.iter().any(|p| path.contains(p.as_str()))
            })
            .collect();

        debug!(
            "{} of {} modules filtered",
            module_filtered.iter().filter(|&&f| f).count(),
            module_filtered.len()
        );
        Self::from_module_flags(trace.functions(), &module_filtered, default_filtered)
    }

    /// Whether samples in `function_id` must move to a caller
    ///
    /// Ids outside the function table are never filtered.
    pub fn is_filtered(&self, function_id: i32) -> bool {
        usize::try_from(function_id)
            .ok()
            .and_then(|id| self.filtered.get(id))
            .copied()
            .unwrap_or(false)
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered.iter().filter(|&&f| f).count()
    }
}

/// Reattribute every sample independently (in parallel)
///
/// **Public** - pre-pass before any other view
///
/// A sample whose function is unknown or filtered moves to its caller frame,
/// taking that frame's function and address, until a valid function is
/// found. When the chain runs out, the sample keeps its frame but its
/// function becomes unknown.
///
/// # Errors
/// * `TraceError::InvalidIndex` - a stack or caller id outside `frames`
/// * `TraceError::DataCorruption` - a caller chain longer than the frame table
pub fn reattribute_samples(
    samples: &[Sample],
    frames: &[StackFrame],
    filter: &ReattributionFilter,
) -> Result<Vec<Sample>, TraceError> {
    let out: Vec<Sample> = samples
        .par_iter()
        .map(|sample| reattribute_sample(sample, frames, filter))
        .collect::<Result<_, _>>()?;

    let moved = samples
        .iter()
        .zip(&out)
        .filter(|(before, after)| before.stack_trace_id != after.stack_trace_id)
        .count();
    debug!("Reattributed {} of {} samples", moved, samples.len());

    Ok(out)
}

fn reattribute_sample(
    sample: &Sample,
    frames: &[StackFrame],
    filter: &ReattributionFilter,
) -> Result<Sample, TraceError> {
    let mut out = *sample;
    let mut steps = 0usize;

    while out.function_id == NO_INDEX || filter.is_filtered(out.function_id) {
        let caller = match out.stack_trace_id {
            NO_INDEX => NO_INDEX,
            frame => frames[frame_slot(frame, frames.len())?].caller_frame_id,
        };
        if caller == NO_INDEX {
            out.function_id = NO_INDEX;
            break;
        }

        steps += 1;
        if steps > frames.len() {
            return Err(TraceError::DataCorruption(format!(
                "caller chain of frame {} does not terminate",
                sample.stack_trace_id
            )));
        }

        let caller_frame = &frames[frame_slot(caller, frames.len())?];
        out.stack_trace_id = caller;
        out.function_id = caller_frame.function_id;
        out.address = caller_frame.address;
    }

    Ok(out)
}

impl TraceStore {
    /// Reattributed copy of the store's samples
    pub fn reattribute_samples(
        &self,
        filter: &ReattributionFilter,
    ) -> Result<Vec<Sample>, TraceError> {
        reattribute_samples(self.samples(), self.stack_frames(), filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(module_id: i32) -> FunctionData {
        FunctionData {
            module_id,
            name: String::new(),
            base_address: 0,
            length: 0,
        }
    }

    fn frame(function_id: i32, caller: i32, depth: i32) -> StackFrame {
        StackFrame {
            address: 0x100 * (function_id as i64 + 2),
            function_id,
            caller_frame_id: caller,
            depth,
        }
    }

    fn sample(stack: i32, function_id: i32) -> Sample {
        Sample {
            stack_trace_id: stack,
            function_id,
            address: 0x1,
            timestamp: 0.0,
            thread_index: 0,
        }
    }

    #[test]
    fn test_module_flags_propagate() {
        let functions = [function(0), function(1), function(NO_INDEX)];
        let filter = ReattributionFilter::from_module_flags(&functions, &[true, false], true);
        assert!(filter.is_filtered(0));
        assert!(!filter.is_filtered(1));
        assert!(filter.is_filtered(2));
        assert!(!filter.is_filtered(NO_INDEX));
        assert_eq!(filter.filtered_count(), 2);
    }

    #[test]
    fn test_moves_to_nearest_valid_caller() {
        // f0 (ok) <- f1 (filtered) <- f2 (filtered)
        let frames = [frame(0, -1, 1), frame(1, 0, 2), frame(2, 1, 3)];
        let functions = [function(0), function(1), function(1)];
        let filter = ReattributionFilter::from_module_flags(&functions, &[false, true], false);

        let out = reattribute_samples(&[sample(2, 2)], &frames, &filter).unwrap();
        assert_eq!(out[0].stack_trace_id, 0);
        assert_eq!(out[0].function_id, 0);
        assert_eq!(out[0].address, frames[0].address);
    }

    #[test]
    fn test_unknown_function_climbs() {
        let frames = [frame(0, -1, 1), frame(NO_INDEX, 0, 2)];
        let filter = ReattributionFilter::from_module_flags(&[function(0)], &[false], false);
        let out = reattribute_samples(&[sample(1, NO_INDEX)], &frames, &filter).unwrap();
        assert_eq!(out[0].function_id, 0);
        assert_eq!(out[0].stack_trace_id, 0);
    }

    #[test]
    fn test_exhausted_chain_becomes_unknown() {
        let frames = [frame(0, -1, 1)];
        let filter = ReattributionFilter::from_module_flags(&[function(0)], &[true], false);
        let out =
            reattribute_samples(&[sample(0, 0), sample(NO_INDEX, 0)], &frames, &filter).unwrap();
        assert_eq!(out[0].function_id, NO_INDEX);
        assert_eq!(out[0].stack_trace_id, 0);
        assert_eq!(out[1].function_id, NO_INDEX);
    }

    #[test]
    fn test_valid_samples_untouched() {
        let frames = [frame(0, -1, 1)];
        let filter = ReattributionFilter::from_module_flags(&[function(0)], &[false], false);
        let input = [sample(0, 0)];
        assert_eq!(reattribute_samples(&input, &frames, &filter).unwrap(), input.to_vec());
    }

    #[test]
    fn test_cycle_reported() {
        let frames = [frame(0, 1, 2), frame(0, 0, 2)];
        let filter = ReattributionFilter::from_module_flags(&[function(0)], &[true], false);
        let result = reattribute_samples(&[sample(0, 0)], &frames, &filter);
        assert!(matches!(result, Err(TraceError::DataCorruption(_))));
    }
}
