// SPDX-License-Identifier: PMPL-1.0-or-later
//! Scoring: the hybrid `error_support` scorer and the hierarchical
//! aggregator that turns sub-metrics into a final grade.

pub mod aggregate;
pub mod hybrid;

pub use aggregate::{Aggregator, Category, FinalScore, Metric, QualityLevel, SubMetrics, Subscores};
pub use hybrid::{ErrorSupportMode, ErrorSupportScore, HybridScorer};
