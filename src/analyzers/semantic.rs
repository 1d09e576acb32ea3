// SPDX-License-Identifier: PMPL-1.0-or-later
//! Structured navigation analyzer - WCAG 1.3.1 Info and Relationships (Level A)
//!
//! Screen-reader users navigate by headings, so skipped heading levels
//! (an h2 followed directly by an h4) break the outline. The metric is
//! `1 - skipped levels / heading count`, floored at zero.

use crate::analyzers::MetricAnalyzer;
use crate::page::PageData;
use crate::scoring::Metric;
use scraper::{Html, Selector};

/// Structured navigation analyzer
pub struct StructuredNavigationAnalyzer;

impl MetricAnalyzer for StructuredNavigationAnalyzer {
    fn name(&self) -> &str {
        "Structured Navigation Analyzer"
    }

    fn description(&self) -> &str {
        "Checks that the heading outline does not skip levels (WCAG 1.3.1)"
    }

    fn metric(&self) -> Metric {
        Metric::StructuredNavigation
    }

    fn measure(&self, page: &PageData) -> Option<f64> {
        let document = Html::parse_document(&page.html);
        let levels = heading_levels(&document);
        if levels.is_empty() {
            return Some(1.0);
        }
        let skipped = skipped_levels(&levels);
        Some((1.0 - skipped as f64 / levels.len() as f64).max(0.0))
    }
}

/// Heading levels in document order
fn heading_levels(document: &Html) -> Vec<u8> {
    let heading_sel = Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector");
    document
        .select(&heading_sel)
        .filter_map(|el| {
            let tag = el.value().name();
            tag.strip_prefix('h').and_then(|n| n.parse::<u8>().ok())
        })
        .collect()
}

/// Total levels jumped over when descending the outline
fn skipped_levels(levels: &[u8]) -> usize {
    levels
        .windows(2)
        .map(|pair| {
            let (previous, current) = (pair[0], pair[1]);
            if current > previous + 1 {
                (current - previous - 1) as usize
            } else {
                0
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure(html: &str) -> f64 {
        StructuredNavigationAnalyzer.measure(&PageData::from_html("", html)).unwrap()
    }

    #[test]
    fn test_no_headings() {
        assert_eq!(measure("<p>plain</p>"), 1.0);
    }

    #[test]
    fn test_proper_outline() {
        assert_eq!(measure("<h1>A</h1><h2>B</h2><h3>C</h3><h2>D</h2>"), 1.0);
    }

    #[test]
    fn test_skipped_levels() {
        // h1 -> h4 skips two levels over three headings
        let score = measure("<h1>A</h1><h4>B</h4><h2>C</h2>");
        assert!((score - (1.0 - 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_floor_at_zero() {
        assert_eq!(measure("<h1>A</h1><h6>B</h6>"), 0.0);
    }

    #[test]
    fn test_skipped_levels_helper() {
        assert_eq!(skipped_levels(&[1, 3, 6]), 3);
        assert_eq!(skipped_levels(&[2, 1, 2]), 0);
    }
}
