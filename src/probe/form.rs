// SPDX-License-Identifier: PMPL-1.0-or-later
//! Form error-support tester.
//!
//! Discovers the testable fields of a form (or of the page body treated as
//! one virtual form), runs every field through the scenario runner and
//! folds the field results into a [`FormResult`].

use super::runner::{run_field, FieldResult};
use super::{FieldDescriptor, ProbeOptions};
use crate::document::{ElementId, FormScope, LiveDocument};
use crate::error::{GradeError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Input types whose value format is itself a constraint
const CONSTRAINED_TYPES: &[&str] = &[
    "email",
    "number",
    "tel",
    "url",
    "date",
    "time",
    "datetime-local",
    "password",
];

/// Input types that never take user-entered values
const SKIPPED_TYPES: &[&str] = &["hidden", "submit", "reset", "button", "image"];

/// The `maxLength` browsers report when no limit is declared
pub const UNBOUNDED_MAX_LENGTH: i64 = 524_288;

pub fn is_constrained_type(field_type: &str) -> bool {
    CONSTRAINED_TYPES.contains(&field_type)
}

/// Fields per channel that fired at least once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStatistics {
    pub native: usize,
    pub aria: usize,
    pub structural: usize,
    pub visual: usize,
}

/// One diagnostic sub-score with a human-readable explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub score: f64,
    pub description: String,
}

impl BreakdownEntry {
    fn new(score: f64, description: impl Into<String>) -> Self {
        Self { score, description: description.into() }
    }
}

/// Informational sub-scores; not summed back into the quality score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedBreakdown {
    pub error_response: BreakdownEntry,
    pub error_localization: BreakdownEntry,
    pub accessibility: BreakdownEntry,
    pub message_quality: BreakdownEntry,
}

impl DetailedBreakdown {
    fn untested(reason: &str) -> Self {
        Self {
            error_response: BreakdownEntry::new(0.0, reason),
            error_localization: BreakdownEntry::new(0.0, "Not tested"),
            accessibility: BreakdownEntry::new(0.0, "Not tested"),
            message_quality: BreakdownEntry::new(0.0, "Not tested"),
        }
    }
}

/// Error-support result for one form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormResult {
    pub form_selector: String,
    pub field_results: Vec<FieldResult>,
    pub total_fields: usize,
    pub supported_fields: usize,
    /// Mean of field quality scores
    pub quality_score: f64,
    pub detection_statistics: DetectionStatistics,
    pub detailed_breakdown: DetailedBreakdown,
    /// Why nothing was tested; present only on degenerate results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FormResult {
    /// Result for a form that could not be tested at all
    pub fn degenerate(form_selector: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            form_selector: form_selector.to_string(),
            field_results: Vec::new(),
            total_fields: 0,
            supported_fields: 0,
            quality_score: 0.0,
            detection_statistics: DetectionStatistics::default(),
            detailed_breakdown: DetailedBreakdown::untested(&reason),
            reason: Some(reason),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.reason.is_some()
    }

    /// Fraction of tested fields whose errors were communicated at all
    pub fn support_ratio(&self) -> f64 {
        if self.total_fields == 0 {
            0.0
        } else {
            self.supported_fields as f64 / self.total_fields as f64
        }
    }

    /// Fold field results into a form result
    pub fn from_fields(form_selector: &str, field_results: Vec<FieldResult>) -> Self {
        let total_fields = field_results.len();
        let supported_fields = field_results.iter().filter(|f| f.overall_support).count();
        let quality_score = if total_fields == 0 {
            0.0
        } else {
            field_results.iter().map(|f| f.quality_score).sum::<f64>() / total_fields as f64
        };

        let mut stats = DetectionStatistics::default();
        for field in &field_results {
            let summary = field.detection_summary;
            stats.native += usize::from(summary.native);
            stats.aria += usize::from(summary.aria);
            stats.structural += usize::from(summary.structural);
            stats.visual += usize::from(summary.visual);
        }

        let localization = if supported_fields == 0 {
            0.0
        } else if supported_fields == total_fields {
            0.3
        } else if supported_fields as f64 > total_fields as f64 / 2.0 {
            0.2
        } else {
            0.1
        };

        let detailed_breakdown = DetailedBreakdown {
            error_response: BreakdownEntry::new(
                if supported_fields > 0 { 0.3 } else { 0.0 },
                format!("{}/{} fields surface errors", supported_fields, total_fields),
            ),
            error_localization: BreakdownEntry::new(
                localization,
                format!("{}/{} fields localize errors", supported_fields, total_fields),
            ),
            accessibility: BreakdownEntry::new(
                (stats.aria as f64 / total_fields.max(1) as f64 * 0.2).min(0.2),
                format!("ARIA support: {}/{} fields", stats.aria, total_fields),
            ),
            message_quality: BreakdownEntry::new(
                (quality_score * 0.2).min(0.2),
                format!("Average message quality: {:.2}", quality_score),
            ),
        };

        Self {
            form_selector: form_selector.to_string(),
            field_results,
            total_fields,
            supported_fields,
            quality_score,
            detection_statistics: stats,
            detailed_breakdown,
            reason: None,
        }
    }
}

/// Test every discoverable field of `scope`.
///
/// Discovery problems produce a degenerate result with a reason. The only
/// error returned is an expired deadline.
pub fn test_form<D: LiveDocument + ?Sized>(
    doc: &mut D,
    scope: &FormScope,
    options: &ProbeOptions,
) -> Result<FormResult> {
    let selector = scope.selector().to_string();
    info!(form = %selector, "Testing form error support");

    let root = match doc.locate_scope(scope) {
        Ok(Some(root)) => root,
        Ok(None) => return Ok(FormResult::degenerate(&selector, "Form not found")),
        Err(e) => {
            warn!(form = %selector, error = %e, "Form lookup failed");
            return Ok(FormResult::degenerate(&selector, format!("Form lookup failed: {}", e)));
        }
    };

    let fields = match discover_fields(&*doc, root, &selector) {
        Ok(fields) => fields,
        Err(e) => {
            warn!(form = %selector, error = %e, "Field discovery failed");
            return Ok(FormResult::degenerate(&selector, format!("Field discovery failed: {}", e)));
        }
    };
    if fields.is_empty() {
        return Ok(FormResult::degenerate(&selector, "No testable fields"));
    }
    debug!(form = %selector, fields = fields.len(), "Discovered testable fields");

    let mut field_results = Vec::with_capacity(fields.len());
    for field in &fields {
        options.check_deadline()?;
        match run_field(doc, field, options) {
            Ok(result) => field_results.push(result),
            Err(e @ GradeError::DeadlineExceeded(_)) => return Err(e),
            Err(e) => {
                warn!(field = %field.selector, error = %e, "Field test failed, skipping");
            }
        }
    }

    let result = FormResult::from_fields(&selector, field_results);
    info!(
        form = %selector,
        total = result.total_fields,
        supported = result.supported_fields,
        quality = result.quality_score,
        "Form tested"
    );
    Ok(result)
}

/// Testable fields under `root`, in document order
pub fn discover_fields<D: LiveDocument + ?Sized>(
    doc: &D,
    root: ElementId,
    scope_selector: &str,
) -> Result<Vec<FieldDescriptor>> {
    let mut fields = Vec::new();
    let mut position = 0;

    for element in doc.descendants(root)? {
        let tag = doc.tag_name(element)?;
        if !matches!(tag.as_str(), "input" | "textarea" | "select") {
            continue;
        }
        position += 1;

        let attr = |name: &str| doc.attribute(element, name);
        let field_type = match tag.as_str() {
            "input" => attr("type")?
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string()),
            "select" if attr("multiple")?.is_some() => "select-multiple".to_string(),
            "select" => "select-one".to_string(),
            other => other.to_string(),
        };
        if SKIPPED_TYPES.contains(&field_type.as_str()) {
            continue;
        }

        let int_attr = |name: &str| -> Result<Option<i64>> {
            Ok(attr(name)?.and_then(|v| v.trim().parse::<i64>().ok()))
        };
        let non_empty = |name: &str| -> Result<Option<String>> {
            Ok(attr(name)?.filter(|v| !v.is_empty()))
        };

        let required = attr("required")?.is_some();
        let pattern = non_empty("pattern")?;
        let min_length = int_attr("minlength")?.filter(|v| *v > 0);
        let max_length = int_attr("maxlength")?.filter(|v| *v > 0 && *v < UNBOUNDED_MAX_LENGTH);
        let min = non_empty("min")?;
        let max = non_empty("max")?;

        let testable = required
            || pattern.is_some()
            || min_length.is_some()
            || max_length.is_some()
            || min.is_some()
            || max.is_some()
            || is_constrained_type(&field_type);
        if !testable {
            continue;
        }

        let selector = if let Some(id) = non_empty("id")? {
            format!("#{}", id)
        } else if let Some(name) = non_empty("name")? {
            format!("[name=\"{}\"]", name)
        } else {
            // Ordinal among the scope's form controls, not a CSS selector
            format!("{} field #{}", scope_selector, position)
        };

        fields.push(FieldDescriptor {
            element,
            selector,
            field_type,
            required,
            pattern,
            min_length: min_length.and_then(|v| u32::try_from(v).ok()),
            max_length: max_length.and_then(|v| u32::try_from(v).ok()),
            min,
            max,
            step: non_empty("step")?,
        });
    }

    Ok(fields)
}
