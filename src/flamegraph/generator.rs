//! SVG flamegraph generation using inferno, plus a plain-text summary.

use crate::aggregator::stack_builder::CollapsedStack;
use crate::utils::error::FlamegraphError;
use inferno::flamegraph::{self, Options};
use log::info;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "CPU Samples".to_string(),
            width: 1200,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Generate SVG flamegraph from collapsed stacks
///
/// # Errors
/// * `FlamegraphError::EmptyStacks` - nothing to draw
/// * `FlamegraphError::RenderFailed` - inferno rejected the stacks or failed to write
pub fn generate_flamegraph(
    stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    let mut options = Options::default();
    options.title = config.title;
    options.image_width = Some(config.width);
    options.count_name = "samples".to_string();

    let lines: Vec<String> = stacks.iter().map(CollapsedStack::to_line).collect();
    let mut svg = Vec::new();
    flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::RenderFailed(e.to_string()))?;

    let svg = String::from_utf8(svg)?;
    info!("Flamegraph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}

/// Render the heaviest stacks as a fixed-width table
pub fn generate_text_summary(
    stacks: &[CollapsedStack],
    max_lines: usize,
    total_samples: u64,
) -> String {
    let mut lines = Vec::new();
    let total = total_samples.max(1);

    lines.push("  HOT PATHS".to_string());
    lines.push(format!("  ┏{}┳{}┳{}┓", "━".repeat(62), "━".repeat(12), "━".repeat(9)));
    lines.push(format!(
        "  ┃ {:<60} ┃ {:^10} ┃ {:^7} ┃",
        "Call Stack (Hottest First)", "SAMPLES", "%"
    ));
    lines.push(format!("  ┣{}╋{}╋{}┫", "━".repeat(62), "━".repeat(12), "━".repeat(9)));

    for stack in stacks.iter().take(max_lines) {
        let percentage = (stack.weight as f64 / total as f64) * 100.0;
        lines.push(format!(
            "  ┃ {:<60} ┃ {:>10} ┃ {:>6.1}% ┃",
            truncate_left(&stack.stack, 60),
            stack.weight,
            percentage
        ));
    }

    lines.push(format!("  ┗{}┻{}┻{}┛", "━".repeat(62), "━".repeat(12), "━".repeat(9)));

    if stacks.len() > max_lines {
        lines.push(String::new());
        lines.push(format!("   (Showing top {} of {} unique paths)", max_lines, stacks.len()));
    }

    lines.join("\n")
}

/// Keep the leaf end of long stacks
fn truncate_left(stack: &str, width: usize) -> String {
    let chars = stack.chars().count();
    if chars <= width {
        return stack.to_string();
    }
    let tail: String = stack.chars().skip(chars - (width - 3)).collect();
    format!("...{}", tail)
}
