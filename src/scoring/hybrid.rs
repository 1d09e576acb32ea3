// SPDX-License-Identifier: PMPL-1.0-or-later
//! Hybrid error-support scorer.
//!
//! Blends a static reading of the page markup with the dynamic result of
//! the form error-support tester. Static evidence is attribute presence and
//! the wording of any error text already in the markup; dynamic evidence is
//! what the page actually did when fed invalid values.

use crate::config::HybridWeights;
use crate::document::{FormScope, LiveDocument};
use crate::error::GradeError;
use crate::page::{has_declared_constraint, PageData};
use crate::probe::form::{test_form, FormResult};
use crate::probe::signals::ERROR_CONTAINER_CLASSES;
use crate::probe::ProbeOptions;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Words that make an error message actionable
const CONSTRUCTIVE_WORDS: &[&str] = &[
    "введіть",
    "виберіть",
    "перевірте",
    "має містити",
    "формат",
    "please",
    "enter",
    "select",
    "check",
];

/// Words that tie an error message to a specific kind of input
const SPECIFIC_WORDS: &[&str] = &[
    "email",
    "пароль",
    "телефон",
    "дата",
    "символів",
    "цифр",
    "password",
    "phone",
    "date",
];

const CONTAINER_TAGS: &[&str] = &["div", "fieldset", "section", "form"];

/// How the error-support number was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSupportMode {
    /// Static and dynamic evidence blended
    Hybrid,
    /// Dynamic pass unavailable or silent; static evidence only
    StaticOnly,
    /// Nothing on the page can fail validation
    NoTestableSurface,
}

impl std::fmt::Display for ErrorSupportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSupportMode::Hybrid => write!(f, "hybrid"),
            ErrorSupportMode::StaticOnly => write!(f, "static only"),
            ErrorSupportMode::NoTestableSurface => write!(f, "no testable surface"),
        }
    }
}

/// Static score of one form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticFormScore {
    pub form_selector: String,
    pub fields: usize,
    pub score: f64,
}

/// The `error_support` sub-metric with the evidence behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSupportScore {
    pub combined: f64,
    pub static_score: f64,
    /// Average over forms the dynamic pass tested, when any were
    pub dynamic_score: Option<f64>,
    pub mode: ErrorSupportMode,
    pub static_forms: Vec<StaticFormScore>,
    pub forms: Vec<FormResult>,
    /// Why the dynamic pass was not used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ErrorSupportScore {
    fn no_surface() -> Self {
        Self {
            combined: 1.0,
            static_score: 1.0,
            dynamic_score: None,
            mode: ErrorSupportMode::NoTestableSurface,
            static_forms: Vec::new(),
            forms: Vec::new(),
            note: None,
        }
    }
}

/// `static_weight * static + dynamic_weight * dynamic` when the dynamic
/// average is positive, otherwise the static score alone
pub fn blend(static_score: f64, dynamic_score: Option<f64>, weights: &HybridWeights) -> f64 {
    match dynamic_score {
        Some(dynamic) if dynamic > 0.0 => {
            weights.static_weight * static_score + weights.dynamic_weight * dynamic
        }
        _ => static_score,
    }
}

/// Average quality of error messages in [0, 1]; zero for no messages.
///
/// Per message: 0.3 for a length of 5 to 100 characters, 0.4 for
/// constructive wording, 0.3 for naming the kind of input.
pub fn message_quality(messages: &[String]) -> f64 {
    if messages.is_empty() {
        return 0.0;
    }
    let total: f64 = messages
        .iter()
        .map(|message| {
            let lower = message.to_lowercase();
            let mut quality = 0.0;
            if (5..=100).contains(&message.chars().count()) {
                quality += 0.3;
            }
            if CONSTRUCTIVE_WORDS.iter().any(|w| lower.contains(w)) {
                quality += 0.4;
            }
            if SPECIFIC_WORDS.iter().any(|w| lower.contains(w)) {
                quality += 0.3;
            }
            f64::min(quality, 1.0)
        })
        .sum();
    total / messages.len() as f64
}

/// Scores `error_support` for one page
#[derive(Debug, Clone)]
pub struct HybridScorer {
    weights: HybridWeights,
    options: ProbeOptions,
}

impl HybridScorer {
    pub fn new(weights: HybridWeights, options: ProbeOptions) -> Self {
        Self { weights, options }
    }

    /// Static and dynamic scoring against a live document
    pub fn score<D: LiveDocument + ?Sized>(&self, page: &PageData, doc: &mut D) -> ErrorSupportScore {
        if !page.has_testable_surface() {
            debug!(url = %page.url, "No forms or constrained fields, nothing to penalize");
            return ErrorSupportScore::no_surface();
        }

        let (static_score, static_forms) = static_score(page);
        let scopes: Vec<FormScope> = if page.forms.is_empty() {
            vec![FormScope::Page]
        } else {
            page.forms.iter().cloned().map(FormScope::Form).collect()
        };

        let mut forms = Vec::with_capacity(scopes.len());
        let mut note = None;
        for scope in &scopes {
            match test_form(doc, scope, &self.options) {
                Ok(result) => forms.push(result),
                Err(e @ GradeError::DeadlineExceeded(_)) => {
                    warn!(url = %page.url, error = %e, "Dynamic analysis unavailable, using static score");
                    note = Some(e.to_string());
                    forms.clear();
                    break;
                }
                Err(e) => {
                    warn!(form = %scope.selector(), error = %e, "Dynamic pass failed for form");
                }
            }
        }

        let tested: Vec<f64> = forms
            .iter()
            .filter(|f| !f.is_degenerate())
            .map(|f| f.quality_score)
            .collect();
        let dynamic_score = if tested.is_empty() {
            None
        } else {
            Some(tested.iter().sum::<f64>() / tested.len() as f64)
        };

        let combined = blend(static_score, dynamic_score, &self.weights);
        let mode = match dynamic_score {
            Some(d) if d > 0.0 => ErrorSupportMode::Hybrid,
            _ => ErrorSupportMode::StaticOnly,
        };
        if mode == ErrorSupportMode::StaticOnly && note.is_none() {
            note = Some("No form produced dynamic evidence".to_string());
        }

        info!(
            url = %page.url,
            static_score,
            dynamic = ?dynamic_score,
            combined,
            %mode,
            "Error support scored"
        );

        ErrorSupportScore {
            combined,
            static_score,
            dynamic_score,
            mode,
            static_forms,
            forms,
            note,
        }
    }

    /// Static scoring only, for pages without a live document
    pub fn score_static(&self, page: &PageData) -> ErrorSupportScore {
        if !page.has_testable_surface() {
            return ErrorSupportScore::no_surface();
        }
        let (static_score, static_forms) = static_score(page);
        ErrorSupportScore {
            combined: static_score,
            static_score,
            dynamic_score: None,
            mode: ErrorSupportMode::StaticOnly,
            static_forms,
            forms: Vec::new(),
            note: Some("No live document".to_string()),
        }
    }
}

/// Markup-wide facts shared by every field's static score
struct PageFacts {
    ids: HashSet<String>,
    has_alert: bool,
    has_live_region: bool,
    scripts_wired: bool,
}

impl PageFacts {
    fn gather(document: &Html) -> Self {
        let id_sel = Selector::parse("[id]").expect("valid selector");
        let alert_sel = Selector::parse("[role=\"alert\"]").expect("valid selector");
        let live_sel = Selector::parse("[aria-live]").expect("valid selector");
        let script_sel = Selector::parse("script").expect("valid selector");
        let wiring = Regex::new(
            r#"(?i)setCustomValidity|reportValidity|checkValidity|addEventListener\(\s*['"](?:input|change|blur|invalid|focusout)['"]"#,
        )
        .expect("valid regex");

        Self {
            ids: document
                .select(&id_sel)
                .filter_map(|e| e.value().attr("id"))
                .map(String::from)
                .collect(),
            has_alert: document.select(&alert_sel).next().is_some(),
            has_live_region: document.select(&live_sel).next().is_some(),
            scripts_wired: document
                .select(&script_sel)
                .any(|s| wiring.is_match(&s.text().collect::<String>())),
        }
    }
}

/// Static error-support score of the page and of each scored form.
///
/// Forms without constrained fields are left out; with nothing left the
/// score is 1.0.
pub fn static_score(page: &PageData) -> (f64, Vec<StaticFormScore>) {
    let document = Html::parse_document(&page.html);
    let facts = PageFacts::gather(&document);
    let form_sel = Selector::parse("form").expect("valid selector");
    let field_sel = Selector::parse("input, textarea, select").expect("valid selector");

    let mut scored = Vec::new();
    let forms: Vec<ElementRef<'_>> = document.select(&form_sel).collect();

    if forms.is_empty() {
        let fields: Vec<ElementRef<'_>> = document
            .select(&field_sel)
            .filter(|f| has_declared_constraint(*f))
            .collect();
        if let Some(score) = form_static_score(&document, &fields, &facts) {
            scored.push(StaticFormScore {
                form_selector: FormScope::Page.selector().to_string(),
                fields: fields.len(),
                score,
            });
        }
    } else {
        for (index, form) in forms.iter().enumerate() {
            let fields: Vec<ElementRef<'_>> = form
                .select(&field_sel)
                .filter(|f| has_declared_constraint(*f))
                .collect();
            let selector = page
                .forms
                .get(index)
                .map(|h| h.selector.clone())
                .unwrap_or_else(|| format!("form:nth-of-type({})", index + 1));
            if let Some(score) = form_static_score(&document, &fields, &facts) {
                scored.push(StaticFormScore {
                    form_selector: selector,
                    fields: fields.len(),
                    score,
                });
            }
        }
    }

    if scored.is_empty() {
        return (1.0, scored);
    }
    let mean = scored.iter().map(|f| f.score).sum::<f64>() / scored.len() as f64;
    (mean, scored)
}

fn form_static_score(document: &Html, fields: &[ElementRef<'_>], facts: &PageFacts) -> Option<f64> {
    if fields.is_empty() {
        return None;
    }
    let total: f64 = fields
        .iter()
        .map(|field| field_static_score(document, *field, facts))
        .sum();
    Some(total / fields.len() as f64)
}

/// Three phases: attribute presence (0.4), nearby message wording (0.3),
/// live announcement and reactive validation wiring (0.3)
fn field_static_score(document: &Html, field: ElementRef<'_>, facts: &PageFacts) -> f64 {
    let el = field.value();
    let flag = |b: bool| if b { 0.1 } else { 0.0 };

    let described_ids: Vec<&str> = el
        .attr("aria-describedby")
        .map(|ids| ids.split_whitespace().collect())
        .unwrap_or_default();
    let linked = described_ids.iter().any(|id| facts.ids.contains(*id));

    let phase1 = flag(el.attr("required").is_some() || el.attr("pattern").is_some())
        + flag(el.attr("aria-invalid").is_some())
        + flag(linked)
        + flag(facts.has_alert);

    let messages = nearby_messages(document, field, &described_ids);
    let phase2 = 0.3 * message_quality(&messages);

    let handler = ["oninput", "onchange", "onblur", "oninvalid"]
        .iter()
        .any(|name| el.attr(name).is_some());
    let phase3 = if facts.has_live_region { 0.15 } else { 0.0 }
        + if facts.scripts_wired || handler { 0.15 } else { 0.0 };

    phase1 + phase2 + phase3
}

/// Error text tied to a field: its described-by targets and error-class
/// elements in its container
fn nearby_messages(document: &Html, field: ElementRef<'_>, described_ids: &[&str]) -> Vec<String> {
    let mut messages = Vec::new();

    for id in described_ids {
        if let Ok(sel) = Selector::parse(&format!("[id=\"{}\"]", id.replace('"', "\\\""))) {
            for target in document.select(&sel) {
                push_text(&mut messages, target);
            }
        }
    }

    let container = field
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| CONTAINER_TAGS.contains(&a.value().name()))
        .or_else(|| field.parent().and_then(ElementRef::wrap));
    if let Some(container) = container {
        for element in container.descendants().filter_map(ElementRef::wrap) {
            let is_error = element
                .value()
                .classes()
                .any(|c| ERROR_CONTAINER_CLASSES.contains(&c));
            if is_error {
                push_text(&mut messages, element);
            }
        }
    }

    messages
}

fn push_text(messages: &mut Vec<String>, element: ElementRef<'_>) {
    let text = element.text().collect::<String>().trim().to_string();
    if !text.is_empty() && !messages.contains(&text) {
        messages.push(text);
    }
}
