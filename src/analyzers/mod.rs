// SPDX-License-Identifier: PMPL-1.0-or-later
//! Sub-metric analyzers over a page snapshot.
//!
//! Each analyzer module measures one WCAG-derived sub-metric from the
//! page markup. Image, contrast and media metrics are not measured here;
//! they arrive as external inputs to the evaluator.

pub mod forms;
pub mod keyboard;
pub mod language;
pub mod semantic;

use crate::page::PageData;
use crate::scoring::{Metric, SubMetrics};
use tracing::debug;

/// Trait implemented by all analyzers
pub trait MetricAnalyzer: Send + Sync {
    /// Human-readable name of this analyzer
    fn name(&self) -> &str;

    /// Short description of what this analyzer measures
    fn description(&self) -> &str;

    /// The sub-metric this analyzer produces
    fn metric(&self) -> Metric;

    /// Measure the page, in [0, 1]; `None` when the metric cannot be computed
    fn measure(&self, page: &PageData) -> Option<f64>;
}

/// The analyzers run on every page
pub fn default_analyzers() -> Vec<Box<dyn MetricAnalyzer>> {
    vec![
        Box::new(keyboard::KeyboardAnalyzer),
        Box::new(semantic::StructuredNavigationAnalyzer),
        Box::new(forms::InstructionClarityAnalyzer),
        Box::new(forms::InputAssistanceAnalyzer),
        Box::new(language::LocalizationAnalyzer),
    ]
}

/// Run all analyzers on a page
pub fn measure_all(page: &PageData) -> SubMetrics {
    let mut metrics = SubMetrics::new();

    for analyzer in default_analyzers() {
        match analyzer.measure(page) {
            Some(value) => {
                debug!("{}: {} = {:.3}", analyzer.name(), analyzer.metric(), value);
                metrics.insert(analyzer.metric(), value);
            }
            None => debug!("{}: {} not measurable", analyzer.name(), analyzer.metric()),
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_all_covers_every_analyzer() {
        let page = PageData::from_html("https://example.edu/", "<html lang=\"en\"><body><h1>Hi</h1></body></html>");
        let metrics = measure_all(&page);
        assert_eq!(metrics.len(), default_analyzers().len());
        assert_eq!(metrics.get(Metric::StructuredNavigation), Some(1.0));
        assert_eq!(metrics.get(Metric::ErrorSupport), None);
    }

    #[test]
    fn test_analyzer_metrics_distinct() {
        let mut seen: Vec<Metric> = default_analyzers().iter().map(|a| a.metric()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }
}
