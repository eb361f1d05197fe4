//! Output writers for analysis reports and flamegraphs.
//!
//! This module handles writing data to disk in various formats:
//! - JSON reports (per-thread profiles, hot-subtree searches)
//! - SVG flamegraphs

pub mod json;
pub mod schema;
pub mod svg;

// Re-export main functions
pub use json::{read_profile, write_hot_subtree_report, write_profile};
pub use svg::write_svg;
