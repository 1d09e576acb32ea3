// SPDX-License-Identifier: PMPL-1.0-or-later
//! Invalid-value scenario library and per-field scenario synthesis.

use super::FieldDescriptor;
use serde::{Deserialize, Serialize};

/// What a scenario's value is trying to provoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Empty,
    Whitespace,
    WhitespaceOnly,
    InvalidFormat,
    Incomplete,
    MissingLocal,
    TooLong,
    TooShort,
    NonNumeric,
    TooLarge,
    InvalidChars,
    UnsupportedProtocol,
    InvalidDate,
    InvalidValues,
    InvalidTime,
    ExceedsMaxlength,
    BelowMin,
    AboveMax,
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScenarioKind::Empty => "empty",
            ScenarioKind::Whitespace => "whitespace",
            ScenarioKind::WhitespaceOnly => "whitespace_only",
            ScenarioKind::InvalidFormat => "invalid_format",
            ScenarioKind::Incomplete => "incomplete",
            ScenarioKind::MissingLocal => "missing_local",
            ScenarioKind::TooLong => "too_long",
            ScenarioKind::TooShort => "too_short",
            ScenarioKind::NonNumeric => "non_numeric",
            ScenarioKind::TooLarge => "too_large",
            ScenarioKind::InvalidChars => "invalid_chars",
            ScenarioKind::UnsupportedProtocol => "unsupported_protocol",
            ScenarioKind::InvalidDate => "invalid_date",
            ScenarioKind::InvalidValues => "invalid_values",
            ScenarioKind::InvalidTime => "invalid_time",
            ScenarioKind::ExceedsMaxlength => "exceeds_maxlength",
            ScenarioKind::BelowMin => "below_min",
            ScenarioKind::AboveMax => "above_max",
        };
        write!(f, "{}", name)
    }
}

/// One candidate invalid value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScenario {
    pub value: String,
    pub kind: ScenarioKind,
    pub description: String,
}

impl TestScenario {
    pub fn new(value: impl Into<String>, kind: ScenarioKind, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind,
            description: description.into(),
        }
    }
}

/// Library scenarios for a declared field type, `None` for unknown types
pub fn library(field_type: &str) -> Option<Vec<TestScenario>> {
    use ScenarioKind::*;
    fn s(value: impl Into<String>, kind: ScenarioKind, description: &str) -> TestScenario {
        TestScenario::new(value, kind, description)
    }
    let scenarios = match field_type {
        "email" => vec![
            s("", Empty, "Empty field"),
            s("abc", InvalidFormat, "Invalid format"),
            s("test@", Incomplete, "Incomplete email"),
            s("@domain.com", MissingLocal, "Missing local part"),
            s(format!("{}@test.com", "a".repeat(255)), TooLong, "Too long"),
        ],
        "number" => vec![
            s("", Empty, "Empty field"),
            s("abc", NonNumeric, "Not a number"),
            s("12.34.56", InvalidFormat, "Invalid format"),
            s("999999999999999999999", TooLarge, "Number too large"),
        ],
        "tel" => vec![
            s("", Empty, "Empty field"),
            s("123", TooShort, "Too short"),
            s("abc-def-ghij", InvalidChars, "Invalid characters"),
            s("1".repeat(50), TooLong, "Too long"),
        ],
        "url" => vec![
            s("", Empty, "Empty field"),
            s("not-url", InvalidFormat, "Invalid format"),
            s("http://", Incomplete, "Incomplete URL"),
            s("ftp://invalid", UnsupportedProtocol, "Unsupported protocol"),
        ],
        "date" => vec![
            s("", Empty, "Empty field"),
            s("32/13/2023", InvalidDate, "Nonexistent date"),
            s("not-date", InvalidFormat, "Invalid format"),
            s("2023-13-45", InvalidValues, "Invalid values"),
        ],
        "time" => vec![
            s("", Empty, "Empty field"),
            s("25:99", InvalidTime, "Nonexistent time"),
            s("not-time", InvalidFormat, "Invalid format"),
        ],
        "password" => vec![
            s("", Empty, "Empty password"),
            s("123", TooShort, "Too short"),
            s("   ", WhitespaceOnly, "Whitespace only"),
        ],
        "text" | "textarea" => vec![
            s("", Empty, "Empty field"),
            s("   ", WhitespaceOnly, "Whitespace only"),
        ],
        _ => return None,
    };
    Some(scenarios)
}

/// Generic pair used when the declared type has no library entry
fn generic_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new("", ScenarioKind::Empty, "Empty field"),
        TestScenario::new("   ", ScenarioKind::Whitespace, "Whitespace only"),
    ]
}

/// Scenarios to run against one field, capped at `limit`.
///
/// Library scenarios come first (empty values only for required fields),
/// followed by boundary scenarios derived from the field's own
/// constraints. A `min`/`max` that does not parse as a number yields no
/// boundary scenario.
pub fn synthesize(field: &FieldDescriptor, limit: usize) -> Vec<TestScenario> {
    let base = library(&field.field_type).unwrap_or_else(generic_scenarios);
    let mut scenarios: Vec<TestScenario> = base
        .into_iter()
        .filter(|s| s.kind != ScenarioKind::Empty || field.required)
        .collect();

    if let Some(max_length) = field.max_length.filter(|m| *m > 0) {
        scenarios.push(TestScenario::new(
            "a".repeat(max_length as usize + 10),
            ScenarioKind::ExceedsMaxlength,
            format!("Exceeds maxlength ({})", max_length),
        ));
    }

    if let Some((raw, min)) = numeric_bound(field.min.as_deref()) {
        scenarios.push(TestScenario::new(
            format_number(min - 1.0),
            ScenarioKind::BelowMin,
            format!("Below minimum ({})", raw),
        ));
    }

    if let Some((raw, max)) = numeric_bound(field.max.as_deref()) {
        scenarios.push(TestScenario::new(
            format_number(max + 1.0),
            ScenarioKind::AboveMax,
            format!("Above maximum ({})", raw),
        ));
    }

    scenarios.truncate(limit);
    scenarios
}

fn numeric_bound(raw: Option<&str>) -> Option<(&str, f64)> {
    let raw = raw?.trim();
    let value = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some((raw, value))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(field_type: &str) -> FieldDescriptor {
        FieldDescriptor {
            element: Default::default(),
            selector: "#f".to_string(),
            field_type: field_type.to_string(),
            required: false,
            pattern: None,
            min_length: None,
            max_length: None,
            min: None,
            max: None,
            step: None,
        }
    }

    #[test]
    fn test_empty_only_for_required() {
        let optional = synthesize(&field("email"), 3);
        assert!(optional.iter().all(|s| s.kind != ScenarioKind::Empty));
        assert_eq!(optional[0].kind, ScenarioKind::InvalidFormat);

        let required = FieldDescriptor { required: true, ..field("email") };
        let scenarios = synthesize(&required, 3);
        assert_eq!(scenarios[0].kind, ScenarioKind::Empty);
        assert_eq!(scenarios.len(), 3);
    }

    #[test]
    fn test_unknown_type_falls_back_to_generic() {
        let scenarios = synthesize(&FieldDescriptor { required: true, ..field("color") }, 3);
        let kinds: Vec<_> = scenarios.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![ScenarioKind::Empty, ScenarioKind::Whitespace]);
    }

    #[test]
    fn test_boundary_scenarios() {
        let quantity = FieldDescriptor {
            min: Some("1".to_string()),
            max: Some("10".to_string()),
            ..field("range")
        };
        let scenarios = synthesize(&quantity, 3);
        let values: Vec<_> = scenarios.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["   ", "0", "11"]);
        assert_eq!(scenarios[1].kind, ScenarioKind::BelowMin);
        assert_eq!(scenarios[2].kind, ScenarioKind::AboveMax);
    }

    #[test]
    fn test_exceeds_maxlength() {
        let short = FieldDescriptor { max_length: Some(5), ..field("text") };
        let scenarios = synthesize(&short, 3);
        let last = scenarios.last().unwrap();
        assert_eq!(last.kind, ScenarioKind::ExceedsMaxlength);
        assert_eq!(last.value.len(), 15);
    }

    #[test]
    fn test_unparsable_bounds_skipped() {
        let date = FieldDescriptor {
            min: Some("2024-01-01".to_string()),
            max: Some("soon".to_string()),
            ..field("date")
        };
        let scenarios = synthesize(&date, 10);
        assert!(scenarios
            .iter()
            .all(|s| s.kind != ScenarioKind::BelowMin && s.kind != ScenarioKind::AboveMax));
    }

    #[test]
    fn test_library_first_then_cap() {
        let required_number = FieldDescriptor {
            required: true,
            min: Some("0".to_string()),
            ..field("number")
        };
        let scenarios = synthesize(&required_number, 3);
        assert_eq!(scenarios.len(), 3);
        assert!(scenarios.iter().all(|s| s.kind != ScenarioKind::BelowMin));
    }

    #[test]
    fn test_fractional_bounds() {
        let price = FieldDescriptor { min: Some("0.5".to_string()), ..field("number") };
        let scenarios = synthesize(&price, 10);
        let below = scenarios.iter().find(|s| s.kind == ScenarioKind::BelowMin).unwrap();
        assert_eq!(below.value, "-0.5");
    }
}
