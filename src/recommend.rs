// SPDX-License-Identifier: PMPL-1.0-or-later
//! Recommendations derived from sub-metric thresholds.
//!
//! Each rule fires when its metric is present and below the threshold.
//! A metric that was never measured produces no recommendation.

use crate::scoring::{Category, Metric, SubMetrics};
use serde::{Deserialize, Serialize};

/// How urgently a recommendation should be acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Blocks a large group of users
    High,
    /// Degrades the experience noticeably
    Medium,
    /// Polish
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

/// Impact assessment: who is affected by an accessibility issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactAssessment {
    /// Affects blind users (screen reader users)
    pub blind: bool,
    /// Affects low-vision users
    pub low_vision: bool,
    /// Affects users with motor disabilities
    pub motor: bool,
    /// Affects users with cognitive disabilities
    pub cognitive: bool,
    /// Affects users reading in a second language
    pub language: bool,
}

impl ImpactAssessment {
    pub fn blind() -> Self {
        Self { blind: true, ..Self::default() }
    }

    pub fn visual() -> Self {
        Self { blind: true, low_vision: true, ..Self::default() }
    }

    pub fn motor() -> Self {
        Self { motor: true, blind: true, ..Self::default() }
    }

    pub fn cognitive() -> Self {
        Self { cognitive: true, ..Self::default() }
    }

    pub fn language() -> Self {
        Self { language: true, cognitive: true, ..Self::default() }
    }

    /// Describe affected groups
    pub fn affected_groups(&self) -> Vec<&'static str> {
        let mut groups = Vec::new();
        if self.blind { groups.push("blind"); }
        if self.low_vision { groups.push("low-vision"); }
        if self.motor { groups.push("motor"); }
        if self.cognitive { groups.push("cognitive"); }
        if self.language { groups.push("non-native speakers"); }
        groups
    }
}

/// A recommended improvement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Category the triggering metric belongs to
    pub category: Category,
    /// The metric that triggered this recommendation
    pub metric: Metric,
    /// Measured value of the metric
    pub value: f64,
    /// What is wrong
    pub issue: String,
    /// What to do about it
    pub recommendation: String,
    pub priority: Priority,
    /// WCAG success criterion, e.g. "WCAG 2.1.1"
    pub wcag_reference: String,
    pub impact: ImpactAssessment,
}

/// A threshold rule over one metric
struct Rule {
    metric: Metric,
    threshold: f64,
    issue: &'static str,
    recommendation: &'static str,
    priority: Priority,
    wcag: &'static str,
    impact: fn() -> ImpactAssessment,
}

const RULES: &[Rule] = &[
    Rule {
        metric: Metric::AltText,
        threshold: 0.8,
        issue: "Images lack alternative text",
        recommendation: "Add meaningful alt attributes to all informative images",
        priority: Priority::High,
        wcag: "WCAG 1.1.1",
        impact: ImpactAssessment::blind,
    },
    Rule {
        metric: Metric::Contrast,
        threshold: 0.7,
        issue: "Low text contrast",
        recommendation: "Raise contrast to at least 4.5:1 for body text",
        priority: Priority::High,
        wcag: "WCAG 1.4.3",
        impact: ImpactAssessment::visual,
    },
    Rule {
        metric: Metric::KeyboardNavigation,
        threshold: 0.9,
        issue: "Interactive elements are not reachable by keyboard",
        recommendation: "Make every interactive element focusable and operable from the keyboard",
        priority: Priority::High,
        wcag: "WCAG 2.1.1",
        impact: ImpactAssessment::motor,
    },
    Rule {
        metric: Metric::StructuredNavigation,
        threshold: 0.8,
        issue: "Heading levels are skipped",
        recommendation: "Use a heading outline without gaps (h1, h2, h3 in order)",
        priority: Priority::Medium,
        wcag: "WCAG 1.3.1",
        impact: ImpactAssessment::blind,
    },
    Rule {
        metric: Metric::InstructionClarity,
        threshold: 0.7,
        issue: "Instructions are complex or unclear",
        recommendation: "Shorten instructions and replace technical terms with plain language",
        priority: Priority::Medium,
        wcag: "WCAG 3.1.5",
        impact: ImpactAssessment::cognitive,
    },
    Rule {
        metric: Metric::InputAssistance,
        threshold: 0.7,
        issue: "Form fields offer little input help",
        recommendation: "Add autocomplete, hints or aria-describedby help to form fields",
        priority: Priority::Medium,
        wcag: "WCAG 3.3.5",
        impact: ImpactAssessment::cognitive,
    },
    Rule {
        metric: Metric::ErrorSupport,
        threshold: 0.7,
        issue: "Form errors are not identified accessibly",
        recommendation: "Announce validation errors with aria-invalid, aria-describedby and a live region",
        priority: Priority::High,
        wcag: "WCAG 3.3.1",
        impact: ImpactAssessment::blind,
    },
    Rule {
        metric: Metric::Localization,
        threshold: 0.6,
        issue: "Insufficient language support",
        recommendation: "Offer Ukrainian and English versions of the content",
        priority: Priority::Medium,
        wcag: "WCAG 3.1.2",
        impact: ImpactAssessment::language,
    },
];

/// Recommendations for every measured metric below its threshold
pub fn recommend(metrics: &SubMetrics) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = RULES
        .iter()
        .filter_map(|rule| {
            let value = metrics.get(rule.metric)?;
            (value < rule.threshold).then(|| Recommendation {
                category: rule.metric.category(),
                metric: rule.metric,
                value,
                issue: rule.issue.to_string(),
                recommendation: rule.recommendation.to_string(),
                priority: rule.priority,
                wcag_reference: rule.wcag.to_string(),
                impact: (rule.impact)(),
            })
        })
        .collect();

    recommendations.sort_by_key(|r| r.priority);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metrics_produce_nothing() {
        assert!(recommend(&SubMetrics::new()).is_empty());
    }

    #[test]
    fn test_thresholds() {
        let metrics = SubMetrics::new()
            .with(Metric::KeyboardNavigation, 0.89)
            .with(Metric::AltText, 0.8)
            .with(Metric::Localization, 0.2);
        let recs = recommend(&metrics);
        let fired: Vec<Metric> = recs.iter().map(|r| r.metric).collect();
        // alt text exactly at its threshold does not fire
        assert_eq!(fired, vec![Metric::KeyboardNavigation, Metric::Localization]);
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[0].wcag_reference, "WCAG 2.1.1");
        assert_eq!(recs[1].category, Category::Localization);
    }

    #[test]
    fn test_high_priority_first() {
        let metrics = SubMetrics::new()
            .with(Metric::InstructionClarity, 0.1)
            .with(Metric::ErrorSupport, 0.1);
        let recs = recommend(&metrics);
        assert_eq!(recs[0].metric, Metric::ErrorSupport);
        assert_eq!(recs[1].metric, Metric::InstructionClarity);
    }

    #[test]
    fn test_every_rule_fires_at_zero() {
        let mut metrics = SubMetrics::new();
        for metric in Metric::ALL {
            metrics.insert(metric, 0.0);
        }
        // media accessibility has no rule
        assert_eq!(recommend(&metrics).len(), Metric::ALL.len() - 1);
    }

    #[test]
    fn test_impact_groups() {
        assert_eq!(ImpactAssessment::visual().affected_groups(), vec!["blind", "low-vision"]);
        assert!(ImpactAssessment::language().affected_groups().contains(&"non-native speakers"));
    }
}
