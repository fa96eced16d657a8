//! Terminal rendering for pipeline results
//!
//! Color-coded confidence banner, diagnosis, and the retrieved evidence.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::types::{Confidence, PipelineResult, SourceReference};

const RULE_WIDTH: usize = 64;

/// Banner line for a confidence level
pub fn confidence_banner(confidence: Confidence) -> String {
    match confidence {
        Confidence::High => format!("{}", "High Confidence - Strong evidence retrieved".green().bold()),
        Confidence::Medium => format!("{}", "Medium Confidence - Moderate evidence".yellow().bold()),
        Confidence::Low => format!("{}", "Low Confidence - Limited matching evidence".red().bold()),
    }
}

fn render_source(source: &SourceReference) -> String {
    format!(
        "  {} {} (similarity: {:.2})\n    Q: {}\n    A: {}",
        format!("Case {}", source.case).bold(),
        format!("[{}]", source.source).dimmed(),
        source.similarity,
        source.question,
        source.answer
    )
}

/// Full human-readable report for one analysis
pub fn render_result(result: &PipelineResult, elapsed: Duration, show_details: bool) -> String {
    let rule = "=".repeat(RULE_WIDTH).cyan().to_string();
    let mut lines = vec![rule.clone(), confidence_banner(result.confidence), rule];

    if show_details {
        lines.push(format!("{} {}", "Rewritten query:".bold(), result.rewritten_query));
        lines.push(format!("{} {}", "HyDE hypothesis:".bold(), result.hypothesis));
        lines.push(String::new());
    }

    lines.push(format!("{}", "Diagnosis".bold().underline()));
    lines.push(result.diagnosis.clone());
    lines.push(String::new());

    if result.sources.is_empty() {
        lines.push(format!("{}", "No supporting cases retrieved.".dimmed()));
    } else {
        lines.push(format!("{} ({})", "Evidence".bold().underline(), result.sources.len()));
        lines.extend(result.sources.iter().map(render_source));
    }

    lines.push(String::new());
    lines.push(format!(
        "{}",
        format!("Response time: {:.1}s", elapsed.as_secs_f64()).dimmed()
    ));

    lines.join("\n")
}

/// Spinner shown while the pipeline runs
pub fn pipeline_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
