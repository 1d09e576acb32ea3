// SPDX-License-Identifier: PMPL-1.0-or-later
//! Hierarchical score aggregation.
//!
//! Sub-metrics fold into four category subscores with fixed per-metric
//! weights. Perceptibility, operability and understandability then fold
//! into a "main" score, and main is blended with localization at the
//! outermost level. Missing metrics drop out of both numerator and
//! denominator at every level.

use crate::config::{QualityConfig, WeightsConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// A named sub-metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AltText,
    Contrast,
    MediaAccessibility,
    KeyboardNavigation,
    StructuredNavigation,
    InstructionClarity,
    InputAssistance,
    ErrorSupport,
    Localization,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::AltText,
        Metric::Contrast,
        Metric::MediaAccessibility,
        Metric::KeyboardNavigation,
        Metric::StructuredNavigation,
        Metric::InstructionClarity,
        Metric::InputAssistance,
        Metric::ErrorSupport,
        Metric::Localization,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::AltText => "alt_text",
            Metric::Contrast => "contrast",
            Metric::MediaAccessibility => "media_accessibility",
            Metric::KeyboardNavigation => "keyboard_navigation",
            Metric::StructuredNavigation => "structured_navigation",
            Metric::InstructionClarity => "instruction_clarity",
            Metric::InputAssistance => "input_assistance",
            Metric::ErrorSupport => "error_support",
            Metric::Localization => "localization",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn category(&self) -> Category {
        match self {
            Metric::AltText | Metric::Contrast | Metric::MediaAccessibility => Category::Perceptibility,
            Metric::KeyboardNavigation | Metric::StructuredNavigation => Category::Operability,
            Metric::InstructionClarity | Metric::InputAssistance | Metric::ErrorSupport => {
                Category::Understandability
            }
            Metric::Localization => Category::Localization,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One of the four scoring categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Perceptibility,
    Operability,
    Understandability,
    Localization,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Perceptibility => write!(f, "perceptibility"),
            Category::Operability => write!(f, "operability"),
            Category::Understandability => write!(f, "understandability"),
            Category::Localization => write!(f, "localization"),
        }
    }
}

/// Sub-metric values in [0, 1]; absent entries are unknown, not zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubMetrics(BTreeMap<Metric, f64>);

impl SubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; NaN is dropped and anything else clamped to [0, 1]
    pub fn insert(&mut self, metric: Metric, value: f64) {
        if value.is_nan() {
            warn!(%metric, "Ignoring NaN sub-metric");
            self.0.remove(&metric);
            return;
        }
        self.0.insert(metric, value.clamp(0.0, 1.0));
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.insert(metric, value);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn remove(&mut self, metric: Metric) -> Option<f64> {
        self.0.remove(&metric)
    }

    /// Entries of `other` replace entries of `self`
    pub fn merge(&mut self, other: &SubMetrics) {
        for (metric, value) in other.iter() {
            self.insert(metric, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build from loosely named values; unknown names and nulls are skipped
    pub fn from_named(values: &HashMap<String, Option<f64>>) -> Self {
        let mut metrics = SubMetrics::new();
        for (name, value) in values {
            match (Metric::from_name(name), value) {
                (Some(metric), Some(value)) => metrics.insert(metric, *value),
                (Some(_), None) => debug!(metric = %name, "Sub-metric explicitly absent"),
                (None, _) => warn!(metric = %name, "Unknown sub-metric ignored"),
            }
        }
        metrics
    }
}

/// Category subscores; `None` when no metric of the category was known
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perceptibility: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub understandability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localization: Option<f64>,
}

impl Subscores {
    pub fn get(&self, category: Category) -> Option<f64> {
        match category {
            Category::Perceptibility => self.perceptibility,
            Category::Operability => self.operability,
            Category::Understandability => self.understandability,
            Category::Localization => self.localization,
        }
    }

    /// Known subscores keyed by category
    pub fn to_map(&self) -> BTreeMap<Category, f64> {
        [
            Category::Perceptibility,
            Category::Operability,
            Category::Understandability,
            Category::Localization,
        ]
        .into_iter()
        .filter_map(|c| self.get(c).map(|v| (c, v)))
        .collect()
    }
}

/// Discrete quality bucket of a final score, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excellent,
    Good,
    Satisfactory,
    Poor,
    VeryPoor,
}

impl QualityLevel {
    /// Walk the ladder from the top; every score lands in exactly one bucket
    pub fn classify(score: f64, ladder: &QualityConfig) -> Self {
        if score >= ladder.excellent {
            QualityLevel::Excellent
        } else if score >= ladder.good {
            QualityLevel::Good
        } else if score >= ladder.satisfactory {
            QualityLevel::Satisfactory
        } else if score >= ladder.poor {
            QualityLevel::Poor
        } else {
            QualityLevel::VeryPoor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityLevel::Excellent => "Excellent",
            QualityLevel::Good => "Good",
            QualityLevel::Satisfactory => "Satisfactory",
            QualityLevel::Poor => "Poor",
            QualityLevel::VeryPoor => "Very poor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            QualityLevel::Excellent => "The site fully meets accessibility standards",
            QualityLevel::Good => "The site has a good level of accessibility with minor shortcomings",
            QualityLevel::Satisfactory => "The site needs improvements to meet accessibility standards",
            QualityLevel::Poor => "The site has serious accessibility problems",
            QualityLevel::VeryPoor => "The site does not meet basic accessibility requirements",
        }
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Aggregation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    pub subscores: Subscores,
    /// Fold of the three inner categories, before localization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_score: Option<f64>,
    pub final_score: f64,
    pub quality_level: QualityLevel,
}

/// Renormalizing weighted fold.
///
/// With every part present this is `sum(w * v) / divisor`. Missing parts
/// remove their weight from the numerator and shrink the divisor in
/// proportion, so known values are never diluted by unknown ones.
fn weighted_fold(parts: &[(Option<f64>, f64)], divisor: f64) -> Option<f64> {
    let total_weight: f64 = parts.iter().map(|(_, w)| w).sum();
    let (numerator, present_weight) = parts
        .iter()
        .filter_map(|(value, weight)| value.map(|v| (v * weight, *weight)))
        .fold((0.0, 0.0), |(n, d), (vn, vd)| (n + vn, d + vd));

    if total_weight <= 0.0 || present_weight <= 0.0 {
        return None;
    }
    let denominator = divisor * present_weight / total_weight;
    Some((numerator / denominator).clamp(0.0, 1.0))
}

/// Folds sub-metrics into subscores, a final score and a quality level
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    weights: WeightsConfig,
    quality: QualityConfig,
}

impl Aggregator {
    pub fn new(weights: WeightsConfig, quality: QualityConfig) -> Self {
        Self { weights, quality }
    }

    pub fn subscores(&self, metrics: &SubMetrics) -> Subscores {
        let p = &self.weights.perceptibility;
        let o = &self.weights.operability;
        let u = &self.weights.understandability;

        Subscores {
            perceptibility: weighted_fold(
                &[
                    (metrics.get(Metric::AltText), p.alt_text),
                    (metrics.get(Metric::Contrast), p.contrast),
                    (metrics.get(Metric::MediaAccessibility), p.media_accessibility),
                ],
                p.divisor,
            ),
            operability: weighted_fold(
                &[
                    (metrics.get(Metric::KeyboardNavigation), o.keyboard_navigation),
                    (metrics.get(Metric::StructuredNavigation), o.structured_navigation),
                ],
                o.divisor,
            ),
            understandability: weighted_fold(
                &[
                    (metrics.get(Metric::InstructionClarity), u.instruction_clarity),
                    (metrics.get(Metric::InputAssistance), u.input_assistance),
                    (metrics.get(Metric::ErrorSupport), u.error_support),
                ],
                u.divisor,
            ),
            localization: metrics.get(Metric::Localization),
        }
    }

    /// Two-stage fold: inner categories into main, then main with localization
    pub fn main_and_final(&self, subscores: &Subscores) -> (Option<f64>, f64) {
        let c = &self.weights.categories;
        let inner = [
            (subscores.perceptibility, c.perceptibility),
            (subscores.operability, c.operability),
            (subscores.understandability, c.understandability),
        ];
        let inner_total: f64 = inner.iter().map(|(_, w)| w).sum();
        let main = weighted_fold(&inner, inner_total);

        let outer = [(main, c.main), (subscores.localization, c.localization)];
        let outer_total: f64 = outer.iter().map(|(_, w)| w).sum();
        let final_score = weighted_fold(&outer, outer_total).unwrap_or(0.0);
        (main, final_score)
    }

    pub fn aggregate(&self, metrics: &SubMetrics) -> FinalScore {
        let subscores = self.subscores(metrics);
        let (main_score, final_score) = self.main_and_final(&subscores);
        let quality_level = QualityLevel::classify(final_score, &self.quality);
        debug!(
            metrics = metrics.len(),
            ?subscores,
            final_score,
            %quality_level,
            "Aggregated sub-metrics"
        );
        FinalScore {
            subscores,
            main_score,
            final_score,
            quality_level,
        }
    }
}
