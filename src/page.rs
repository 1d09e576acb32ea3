// SPDX-License-Identifier: PMPL-1.0-or-later
//! Page-data snapshot consumed by the scoring core.
//!
//! A snapshot carries the raw HTML (used for lightweight attribute and
//! keyword scans), the list of forms on the page and, for pages without
//! forms, the individually constrained fields found in the body.

use crate::probe::form::{is_constrained_type, UNBOUNDED_MAX_LENGTH};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Locates one `<form>` element of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormHandle {
    /// Selector reported in results (`#id` or `form:nth-of-type(n)`)
    pub selector: String,
    /// Zero-based position among the page's forms, in document order
    pub index: usize,
    /// The form's `id` attribute, when present
    pub id: Option<String>,
}

impl FormHandle {
    pub fn new(index: usize, id: Option<String>) -> Self {
        let selector = match &id {
            Some(id) => format!("#{}", id),
            None => format!("form:nth-of-type({})", index + 1),
        };
        Self { selector, index, id }
    }
}

/// Snapshot of one page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageData {
    pub url: String,
    pub title: String,
    pub html: String,
    /// Forms on the page, in document order
    #[serde(default)]
    pub forms: Vec<FormHandle>,
    /// Selectors of constrained fields that sit outside any form
    #[serde(default)]
    pub loose_fields: Vec<String>,
}

impl PageData {
    /// Build a snapshot by scanning raw HTML
    pub fn from_html(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let form_sel = Selector::parse("form").expect("valid selector");
        let field_sel = Selector::parse("input, textarea, select").expect("valid selector");
        let title_sel = Selector::parse("title").expect("valid selector");

        let forms = document
            .select(&form_sel)
            .enumerate()
            .map(|(index, form)| {
                let id = form
                    .value()
                    .attr("id")
                    .filter(|id| !id.trim().is_empty())
                    .map(String::from);
                FormHandle::new(index, id)
            })
            .collect();

        let loose_fields = document
            .select(&field_sel)
            .filter(|field| !inside_form(*field) && has_declared_constraint(*field))
            .enumerate()
            .map(|(index, field)| field_selector(field, index))
            .collect();

        let title = document
            .select(&title_sel)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            title,
            html: html.to_string(),
            forms,
            loose_fields,
        }
    }

    /// Whether the page has anything the error-support tester could probe
    pub fn has_testable_surface(&self) -> bool {
        !self.forms.is_empty() || !self.loose_fields.is_empty()
    }
}

fn inside_form(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "form")
}

/// Static counterpart of the live discovery rule, read from markup only
pub(crate) fn has_declared_constraint(field: ElementRef<'_>) -> bool {
    let el = field.value();
    let field_type = el
        .attr("type")
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_else(|| el.name().to_string());
    if matches!(field_type.as_str(), "hidden" | "submit" | "reset" | "button" | "image") {
        return false;
    }
    let length = |name: &str| el.attr(name).and_then(|v| v.trim().parse::<i64>().ok());
    el.attr("required").is_some()
        || el.attr("pattern").map(|p| !p.is_empty()).unwrap_or(false)
        || length("minlength").map(|v| v > 0).unwrap_or(false)
        || length("maxlength")
            .map(|v| v > 0 && v < UNBOUNDED_MAX_LENGTH)
            .unwrap_or(false)
        || el.attr("min").map(|v| !v.is_empty()).unwrap_or(false)
        || el.attr("max").map(|v| !v.is_empty()).unwrap_or(false)
        || is_constrained_type(&field_type)
}

fn field_selector(field: ElementRef<'_>, index: usize) -> String {
    let el = field.value();
    if let Some(id) = el.attr("id").filter(|id| !id.is_empty()) {
        format!("#{}", id)
    } else if let Some(name) = el.attr("name").filter(|n| !n.is_empty()) {
        format!("[name=\"{}\"]", name)
    } else {
        format!("{}:nth-of-type({})", el.name(), index + 1)
    }
}
