// SPDX-License-Identifier: PMPL-1.0-or-later
//! Keyboard navigation analyzer - WCAG 2.1.1 Keyboard (Level A)
//!
//! Measures the fraction of interactive elements a keyboard user can reach:
//! - Native controls count unless removed from the tab order with `tabindex="-1"`
//! - Custom widgets (`role="button"`, `onclick` handlers) need an explicit tabindex

use crate::analyzers::MetricAnalyzer;
use crate::page::PageData;
use crate::scoring::Metric;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Keyboard navigation analyzer
pub struct KeyboardAnalyzer;

/// Tags the browser puts in the tab order on its own
const NATIVE_FOCUSABLE: &[&str] = &["button", "a", "input", "select", "textarea"];

const INTERACTIVE_SELECTOR: &str = "button, a[href], input, select, textarea, [tabindex], [onclick], [role=\"button\"], [role=\"link\"]";

impl MetricAnalyzer for KeyboardAnalyzer {
    fn name(&self) -> &str {
        "Keyboard Navigation Analyzer"
    }

    fn description(&self) -> &str {
        "Fraction of interactive elements reachable by keyboard (WCAG 2.1.1)"
    }

    fn metric(&self) -> Metric {
        Metric::KeyboardNavigation
    }

    fn measure(&self, page: &PageData) -> Option<f64> {
        let document = Html::parse_document(&page.html);
        let interactive = interactive_elements(&document);
        if interactive.is_empty() {
            return Some(1.0);
        }
        let reachable = interactive.iter().filter(|el| is_keyboard_accessible(**el)).count();
        Some(reachable as f64 / interactive.len() as f64)
    }
}

/// Interactive elements in document order, each counted once
fn interactive_elements(document: &Html) -> Vec<ElementRef<'_>> {
    let selector = Selector::parse(INTERACTIVE_SELECTOR).expect("valid selector");
    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter(|el| el.value().attr("type") != Some("hidden"))
        .filter(|el| seen.insert(el.id()))
        .collect()
}

fn is_keyboard_accessible(element: ElementRef<'_>) -> bool {
    let el = element.value();
    // Unparsable tabindex values are ignored, as browsers do
    let tabindex: Option<i32> = el.attr("tabindex").and_then(|t| t.trim().parse().ok());

    if NATIVE_FOCUSABLE.contains(&el.name()) {
        return tabindex.map(|t| t >= 0).unwrap_or(true);
    }
    tabindex.map(|t| t >= 0).unwrap_or(false)
}
