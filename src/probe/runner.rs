// SPDX-License-Identifier: PMPL-1.0-or-later
//! Per-field scenario runner.

use super::scenarios::{synthesize, TestScenario};
use super::signals::{collect, ChannelFlags, ErrorSignals};
use super::{FieldDescriptor, ProbeOptions};
use crate::document::LiveDocument;
use crate::error::{GradeError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: TestScenario,
    pub signals: ErrorSignals,
    pub error_detected: bool,
    pub quality_score: f64,
    /// Set when the scenario could not be applied or read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ScenarioResult {
    fn from_signals(scenario: TestScenario, signals: ErrorSignals) -> Self {
        Self {
            error_detected: signals.error_detected(),
            quality_score: signals.quality_score(),
            scenario,
            signals,
            failure: None,
        }
    }

    /// All channels silent, quality zero
    fn failed(scenario: TestScenario, error: &GradeError) -> Self {
        Self {
            scenario,
            signals: ErrorSignals::default(),
            error_detected: false,
            quality_score: 0.0,
            failure: Some(error.to_string()),
        }
    }
}

/// Outcome of all scenarios on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResult {
    pub field: FieldDescriptor,
    pub scenario_results: Vec<ScenarioResult>,
    /// Channel-wise OR across scenarios
    pub detection_summary: ChannelFlags,
    pub overall_support: bool,
    pub quality_score: f64,
}

/// Run every synthesized scenario against `field`, one at a time.
///
/// A scenario that fails is recorded with zero quality and the remaining
/// scenarios still run. Only an expired deadline aborts the field.
pub fn run_field<D: LiveDocument + ?Sized>(
    doc: &mut D,
    field: &FieldDescriptor,
    options: &ProbeOptions,
) -> Result<FieldResult> {
    let scenarios = synthesize(field, options.max_scenarios_per_field);
    debug!(field = %field.selector, scenarios = scenarios.len(), "Testing field");

    let mut scenario_results = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        options.check_deadline()?;
        let result = match collect(doc, field, &scenario, options.settle_delay) {
            Ok(signals) => ScenarioResult::from_signals(scenario, signals),
            Err(e) => {
                warn!(
                    field = %field.selector,
                    scenario = %scenario.kind,
                    error = %e,
                    "Scenario failed, recording as undetected"
                );
                ScenarioResult::failed(scenario, &e)
            }
        };
        debug!(
            field = %field.selector,
            scenario = %result.scenario.kind,
            detected = result.error_detected,
            quality = result.quality_score,
            "Scenario complete"
        );
        scenario_results.push(result);
    }

    Ok(fold_field(field.clone(), scenario_results))
}

/// Fold scenario outcomes into a field result.
///
/// Field quality is the mean scenario quality plus 0.1 per distinct channel
/// that ever fired (bonus capped at 0.2), capped at 1.0.
pub fn fold_field(field: FieldDescriptor, scenario_results: Vec<ScenarioResult>) -> FieldResult {
    let detection_summary = scenario_results
        .iter()
        .fold(ChannelFlags::default(), |acc, r| acc.union(r.signals.channels()));

    let quality_score = if scenario_results.is_empty() {
        0.0
    } else {
        let mean = scenario_results.iter().map(|r| r.quality_score).sum::<f64>()
            / scenario_results.len() as f64;
        let bonus = (0.1 * detection_summary.count() as f64).min(0.2);
        (mean + bonus).min(1.0)
    };

    FieldResult {
        field,
        overall_support: detection_summary.any(),
        detection_summary,
        scenario_results,
        quality_score,
    }
}
