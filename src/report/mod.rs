// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report generation for page evaluations.
//!
//! Supports two output formats:
//! - Text: human-readable score breakdown with WCAG references
//! - JSON: the full evaluation record for programmatic consumption

use crate::evaluator::Evaluation;
use crate::scanner::ScannedPage;
use crate::scoring::{Category, ErrorSupportScore, FinalScore};
use serde::Serialize;
use std::fmt::Write;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Generate a report for one evaluation
pub fn generate_report(evaluation: &Evaluation, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::from("=== Accessgrade Evaluation Report ===\n\n");
            write_evaluation(&mut output, evaluation);
            output
        }
        OutputFormat::Json => to_json(evaluation),
    }
}

/// Generate a report for a batch scan
pub fn generate_batch_report(pages: &[ScannedPage], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => generate_batch_text(pages),
        OutputFormat::Json => to_json(&pages),
    }
}

/// Generate a report for an aggregation without a page
pub fn generate_score_report(score: &FinalScore, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::from("=== Accessgrade Score ===\n\n");
            write_score(&mut output, score);
            output
        }
        OutputFormat::Json => to_json(score),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize report: {}\"}}", e))
}

fn generate_batch_text(pages: &[ScannedPage]) -> String {
    let mut output = String::from("=== Accessgrade Batch Report ===\n\n");

    if pages.is_empty() {
        output.push_str("No HTML pages found.\n");
        return output;
    }

    let _ = writeln!(output, "Evaluated {} page(s)\n", pages.len());
    for page in pages {
        let _ = writeln!(output, "##### {} #####", page.path.display());
        write_evaluation(&mut output, &page.evaluation);
        output.push('\n');
    }

    let mean = pages.iter().map(|p| p.evaluation.score.final_score).sum::<f64>() / pages.len() as f64;
    let _ = writeln!(output, "Mean final score: {:.3}", mean);
    output
}

fn write_evaluation(output: &mut String, evaluation: &Evaluation) {
    if !evaluation.url.is_empty() {
        let _ = writeln!(output, "URL: {}", evaluation.url);
    }
    if !evaluation.title.is_empty() {
        let _ = writeln!(output, "Title: {}", evaluation.title);
    }
    let _ = writeln!(output, "Evaluated: {}\n", evaluation.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));

    write_score(output, &evaluation.score);

    output.push_str("--- Metrics ---\n");
    for (metric, value) in evaluation.metrics.iter() {
        let _ = writeln!(output, "  {:<24} {:.3}", metric.name(), value);
    }
    output.push('\n');

    write_error_support(output, &evaluation.error_support);

    if evaluation.recommendations.is_empty() {
        output.push_str("No recommendations. All measured metrics meet their thresholds.\n");
        return;
    }

    let _ = writeln!(output, "--- Recommendations ({}) ---", evaluation.recommendations.len());
    for rec in &evaluation.recommendations {
        let _ = writeln!(output, "[{}] {} ({} = {:.3})", rec.priority, rec.issue, rec.metric, rec.value);
        let _ = writeln!(output, "  {}: {}", rec.category, rec.wcag_reference);
        let _ = writeln!(output, "  Fix: {}", rec.recommendation);
        let groups = rec.impact.affected_groups();
        if !groups.is_empty() {
            let _ = writeln!(output, "  Affects: {}", groups.join(", "));
        }
        output.push('\n');
    }
}

fn write_score(output: &mut String, score: &FinalScore) {
    let _ = writeln!(
        output,
        "Final score: {:.3} ({})\n  {}\n",
        score.final_score,
        score.quality_level,
        score.quality_level.description()
    );

    output.push_str("--- Subscores ---\n");
    for category in [
        Category::Perceptibility,
        Category::Operability,
        Category::Understandability,
        Category::Localization,
    ] {
        match score.subscores.get(category) {
            Some(value) => {
                let _ = writeln!(output, "  {:<24} {:.3}", category.to_string(), value);
            }
            None => {
                let _ = writeln!(output, "  {:<24} n/a", category.to_string());
            }
        }
    }
    if let Some(main) = score.main_score {
        let _ = writeln!(output, "  {:<24} {:.3}", "main", main);
    }
    output.push('\n');
}

fn write_error_support(output: &mut String, support: &ErrorSupportScore) {
    let _ = writeln!(output, "--- Error support ({}) ---", support.mode);
    let _ = writeln!(output, "  combined {:.3}, static {:.3}", support.combined, support.static_score);
    if let Some(dynamic) = support.dynamic_score {
        let _ = writeln!(output, "  dynamic {:.3}", dynamic);
    }
    if let Some(note) = &support.note {
        let _ = writeln!(output, "  note: {}", note);
    }
    for form in &support.forms {
        match &form.reason {
            Some(reason) => {
                let _ = writeln!(output, "  {}: {}", form.form_selector, reason);
            }
            None => {
                let _ = writeln!(
                    output,
                    "  {}: {}/{} fields supported, quality {:.3}",
                    form.form_selector, form.supported_fields, form.total_fields, form.quality_score
                );
            }
        }
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Evaluator;
    use crate::page::PageData;
    use crate::scoring::{Metric, SubMetrics};
    use std::path::PathBuf;

    fn sample_evaluation() -> Evaluation {
        let html = r#"<html lang="en"><head><title>Contact</title></head><body>
            <h1>Contact</h1><h3>Form</h3>
            <form id="contact"><input type="email" required></form>
        </body></html>"#;
        let page = PageData::from_html("https://example.edu/contact", html);
        let external = SubMetrics::new().with(Metric::AltText, 0.4);
        Evaluator::default().evaluate_static(&page, &external)
    }

    #[test]
    fn test_text_report() {
        let report = generate_report(&sample_evaluation(), OutputFormat::Text);
        assert!(report.contains("Final score:"));
        assert!(report.contains("Title: Contact"));
        assert!(report.contains("Error support (static only)"));
        assert!(report.contains("WCAG 1.1.1"));
        assert!(report.contains("--- Recommendations"));
    }

    #[test]
    fn test_json_report() {
        let report = generate_report(&sample_evaluation(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&report).expect("valid JSON");
        assert!(parsed["metrics"]["alt_text"].is_number());
        assert!(parsed["score"]["final_score"].is_number());
        assert!(parsed["recommendations"].is_array());
        assert_eq!(parsed["error_support"]["mode"], "static_only");
    }

    #[test]
    fn test_batch_report() {
        assert!(generate_batch_report(&[], OutputFormat::Text).contains("No HTML pages found"));

        let pages = vec![ScannedPage {
            path: PathBuf::from("site/index.html"),
            evaluation: sample_evaluation(),
        }];
        let text = generate_batch_report(&pages, OutputFormat::Text);
        assert!(text.contains("site/index.html"));
        assert!(text.contains("Mean final score"));

        let json = generate_batch_report(&pages, OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(parsed.as_array().map(|a| a.len()), Some(1));
    }

    #[test]
    fn test_score_report_marks_missing_subscores() {
        let score = Evaluator::default().aggregate(&SubMetrics::new().with(Metric::Localization, 0.6));
        let report = generate_score_report(&score, OutputFormat::Text);
        assert!(report.contains("perceptibility"));
        assert!(report.contains("n/a"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }
}
