//! CPU Trace Studio
//!
//! Offline post-processing of sampled CPU call stacks: per-thread call
//! trees, stack deduplication, flat heat maps, module-filter reattribution
//! and marker-scoped hot-subtree aggregation.
//!
//! This crate provides the core implementation for the
//! `cpu-trace` CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! cargo install cpu-trace-studio
//! cpu-trace analyze --trace capture.bin --thread 0 --flamegraph flame.svg
//! ```

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod output;
pub mod parser;
pub mod utils;
