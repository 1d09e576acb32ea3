// SPDX-License-Identifier: PMPL-1.0-or-later
//! Whole-page evaluation.
//!
//! Runs the markup analyzers, scores `error_support` (against a live
//! document when one is available), merges externally measured
//! sub-metrics, aggregates and attaches recommendations.

use crate::analyzers;
use crate::config::Config;
use crate::document::LiveDocument;
use crate::page::PageData;
use crate::probe::ProbeOptions;
use crate::recommend::{recommend, Recommendation};
use crate::scoring::{Aggregator, ErrorSupportScore, FinalScore, HybridScorer, Metric, SubMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of evaluating one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub title: String,
    /// Every sub-metric that went into the score
    pub metrics: SubMetrics,
    pub score: FinalScore,
    pub error_support: ErrorSupportScore,
    pub recommendations: Vec<Recommendation>,
}

/// Page evaluator
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: Config,
}

impl Evaluator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Full evaluation with dynamic error-support probing.
    ///
    /// `external` carries metrics measured elsewhere (alt text, contrast,
    /// media); its entries replace any computed value of the same name.
    pub fn evaluate<D: LiveDocument + ?Sized>(
        &self,
        page: &PageData,
        document: &mut D,
        external: &SubMetrics,
    ) -> Evaluation {
        info!(url = %page.url, "Evaluating page");
        let error_support = self.scorer().score(page, document);
        self.finish(page, error_support, external)
    }

    /// Evaluation without a live document; error support is static only
    pub fn evaluate_static(&self, page: &PageData, external: &SubMetrics) -> Evaluation {
        info!(url = %page.url, "Evaluating page statically");
        let error_support = self.scorer().score_static(page);
        self.finish(page, error_support, external)
    }

    /// Aggregation alone, for sub-metrics gathered by other tools
    pub fn aggregate(&self, metrics: &SubMetrics) -> FinalScore {
        self.aggregator().aggregate(metrics)
    }

    fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.config.weights.clone(), self.config.quality.clone())
    }

    /// A fresh scorer; the deadline clock starts here
    fn scorer(&self) -> HybridScorer {
        let probe = &self.config.probe;
        let mut options = ProbeOptions::from_config(probe);
        if probe.deadline_secs > 0 {
            options = options.with_deadline(Duration::from_secs(probe.deadline_secs));
        }
        HybridScorer::new(self.config.weights.hybrid.clone(), options)
    }

    fn finish(&self, page: &PageData, error_support: ErrorSupportScore, external: &SubMetrics) -> Evaluation {
        let mut metrics = analyzers::measure_all(page);
        metrics.insert(Metric::ErrorSupport, error_support.combined);
        metrics.merge(external);
        debug!(url = %page.url, ?metrics, "Sub-metrics collected");

        let score = self.aggregate(&metrics);
        let recommendations = recommend(&metrics);

        info!(
            url = %page.url,
            final_score = score.final_score,
            quality = %score.quality_level,
            recommendations = recommendations.len(),
            "Evaluation complete"
        );

        Evaluation {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            url: page.url.clone(),
            title: page.title.clone(),
            metrics,
            score,
            error_support,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::memory::MemoryDocument;
    use crate::scoring::{ErrorSupportMode, QualityLevel};

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.probe.settle_delay_ms = 0;
        config
    }

    #[test]
    fn test_static_page_without_forms() {
        let html = r#"<html lang="uk"><head><title>Home</title></head>
            <body><h1>Про університет</h1><a href="/en/">English</a></body></html>"#;
        let page = PageData::from_html("https://example.edu/", html);
        let evaluation = Evaluator::new(fast_config()).evaluate_static(&page, &SubMetrics::new());

        assert_eq!(evaluation.title, "Home");
        assert_eq!(evaluation.error_support.mode, ErrorSupportMode::NoTestableSurface);
        assert_eq!(evaluation.metrics.get(Metric::ErrorSupport), Some(1.0));
        assert_eq!(evaluation.metrics.get(Metric::AltText), None);
        assert!(evaluation.score.subscores.perceptibility.is_none());
    }

    #[test]
    fn test_external_metrics_override() {
        let page = PageData::from_html("", "<html><body><h1>A</h1><h4>B</h4></body></html>");
        let external = SubMetrics::new()
            .with(Metric::AltText, 0.5)
            .with(Metric::StructuredNavigation, 1.0);
        let evaluation = Evaluator::new(fast_config()).evaluate_static(&page, &external);

        assert_eq!(evaluation.metrics.get(Metric::AltText), Some(0.5));
        assert_eq!(evaluation.metrics.get(Metric::StructuredNavigation), Some(1.0));
        assert!(evaluation
            .recommendations
            .iter()
            .any(|r| r.metric == Metric::AltText));
    }

    #[test]
    fn test_dynamic_evaluation_of_silent_form() {
        let html = r#"<html><body><form id="signup">
            <input type="email" id="email" required>
        </form></body></html>"#;
        let page = PageData::from_html("https://example.edu/signup", html);
        let mut doc = MemoryDocument::parse(html);
        let evaluation = Evaluator::new(fast_config()).evaluate(&page, &mut doc, &SubMetrics::new());

        // Native validity still fires, so the dynamic pass found something
        assert_eq!(evaluation.error_support.forms.len(), 1);
        assert!(evaluation.error_support.dynamic_score.is_some());
        assert!(evaluation.metrics.get(Metric::ErrorSupport).is_some());
    }

    #[test]
    fn test_aggregate_only() {
        let metrics = SubMetrics::new().with(Metric::Localization, 1.0);
        let score = Evaluator::default().aggregate(&metrics);
        assert_eq!(score.final_score, 1.0);
        assert_eq!(score.quality_level, QualityLevel::Excellent);
    }
}
