// SPDX-License-Identifier: PMPL-1.0-or-later
//! Localization analyzer - WCAG 3.1.1 Language of Page (Level A), 3.1.2 Language of Parts (Level AA)
//!
//! Detects which languages a page is offered in and weights them for a
//! Ukrainian audience:
//! - `uk` 0.6, `en` 0.2, `de` or `fr` 0.08 (once), any other language 0.04
//!
//! Evidence comes from `<html lang>`, language-switch links, `hreflang`
//! alternates, language-selector widgets, the page URL and a keyword-based
//! guess at the content language.

use crate::analyzers::MetricAnalyzer;
use crate::page::PageData;
use crate::scoring::Metric;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeSet, HashSet};

/// Localization analyzer
pub struct LocalizationAnalyzer;

const UKRAINIAN_WEIGHT: f64 = 0.6;
const ENGLISH_WEIGHT: f64 = 0.2;
const EUROPEAN_WEIGHT: f64 = 0.08;
const OTHER_WEIGHT: f64 = 0.04;

/// Language codes recognised in URLs
const LINK_PATTERNS: &[&str] = &[
    r"/(uk|en|de|fr|ru|pl)/",
    r"[?&]lang=(uk|en|de|fr|ru|pl)",
    r"[?&]language=(uk|en|de|fr|ru|pl)",
    r"/lang/(uk|en|de|fr|ru|pl)",
];

const SELECTOR_WIDGETS: &str =
    ".language-selector, .lang-switcher, .language-menu, [class*=\"lang\"], [id*=\"lang\"]";

/// Language names as they appear in switcher widgets
const LANGUAGE_NAMES: &[(&str, &[&str])] = &[
    ("uk", &["українська", "укр", "ua", "ukraine"]),
    ("en", &["english", "англійська", "eng"]),
    ("de", &["deutsch", "german", "німецька"]),
    ("fr", &["français", "french", "французька"]),
    ("ru", &["русский", "russian", "російська"]),
    ("pl", &["polski", "polish", "польська"]),
];

/// Frequent words per language; ties go to the earlier entry
const LANGUAGE_INDICATORS: &[(&str, &[&str])] = &[
    ("uk", &["про", "для", "або", "який", "яка", "яке", "університет", "освіта"]),
    ("en", &["about", "for", "or", "which", "university", "education", "the", "and"]),
    ("ru", &["про", "для", "или", "который", "которая", "которое", "университет"]),
    ("de", &["über", "für", "oder", "welche", "universität", "bildung", "der", "die"]),
    ("fr", &["sur", "pour", "ou", "qui", "université", "éducation", "le", "la"]),
];

impl MetricAnalyzer for LocalizationAnalyzer {
    fn name(&self) -> &str {
        "Localization Analyzer"
    }

    fn description(&self) -> &str {
        "Weights the languages a page is available in (WCAG 3.1.1, 3.1.2)"
    }

    fn metric(&self) -> Metric {
        Metric::Localization
    }

    fn measure(&self, page: &PageData) -> Option<f64> {
        let languages = available_languages(&page.html, &page.url);
        Some(localization_score(&languages))
    }
}

/// Weighted score for a set of two-letter language codes
pub fn localization_score(languages: &BTreeSet<String>) -> f64 {
    let mut score = 0.0;
    if languages.contains("uk") {
        score += UKRAINIAN_WEIGHT;
    }
    if languages.contains("en") {
        score += ENGLISH_WEIGHT;
    }
    if languages.contains("de") || languages.contains("fr") {
        score += EUROPEAN_WEIGHT;
    }
    if languages.iter().any(|l| !matches!(l.as_str(), "uk" | "en" | "de" | "fr")) {
        score += OTHER_WEIGHT;
    }
    score.min(1.0)
}

/// Every language the page offers or is written in
pub fn available_languages(html: &str, url: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let mut languages = BTreeSet::new();

    let html_sel = Selector::parse("html[lang]").expect("valid selector");
    if let Some(lang) = document
        .select(&html_sel)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .and_then(language_prefix)
    {
        languages.insert(lang);
    }

    let patterns: Vec<Regex> = LINK_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect();

    let link_sel = Selector::parse("a[href]").expect("valid selector");
    for link in document.select(&link_sel) {
        if let Some(href) = link.value().attr("href") {
            languages.extend(codes_in_url(&patterns, href));
        }
    }

    let alternate_sel = Selector::parse("link[rel~=\"alternate\"][hreflang]").expect("valid selector");
    for link in document.select(&alternate_sel) {
        let lang = link.value().attr("hreflang").and_then(language_prefix);
        if let Some(lang) = lang.filter(|l| l != "x-") {
            languages.insert(lang);
        }
    }

    let widget_sel = Selector::parse(SELECTOR_WIDGETS).expect("valid selector");
    for widget in document.select(&widget_sel) {
        let text = widget.text().collect::<String>();
        let words = word_set(&text);
        for (code, names) in LANGUAGE_NAMES {
            if names.iter().any(|name| words.contains(*name)) {
                languages.insert((*code).to_string());
            }
        }
    }

    languages.extend(codes_in_url(&patterns, url));

    let body_sel = Selector::parse("body").expect("valid selector");
    let content: String = document
        .select(&body_sel)
        .next()
        .map(|body| body.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    if let Some(lang) = detect_content_language(&content) {
        languages.insert(lang.to_string());
    }

    languages
}

/// Language whose indicator words occur most in the text
pub fn detect_content_language(text: &str) -> Option<&'static str> {
    let words = word_set(text);
    let mut best: Option<(&'static str, usize)> = None;
    for (code, indicators) in LANGUAGE_INDICATORS {
        let hits = indicators.iter().filter(|w| words.contains(**w)).count();
        if hits > 0 && best.map(|(_, b)| hits > b).unwrap_or(true) {
            best = Some((*code, hits));
        }
    }
    best.map(|(code, _)| code)
}

fn codes_in_url<'a>(patterns: &'a [Regex], url: &'a str) -> impl Iterator<Item = String> + 'a {
    patterns
        .iter()
        .flat_map(move |re| re.captures_iter(url))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_lowercase()))
}

/// First two characters of a language tag, lowercased
fn language_prefix(tag: &str) -> Option<String> {
    let prefix: String = tag.trim().chars().take(2).collect::<String>().to_lowercase();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_score_weights() {
        assert_eq!(localization_score(&langs(&[])), 0.0);
        assert!((localization_score(&langs(&["uk"])) - 0.6).abs() < 1e-9);
        assert!((localization_score(&langs(&["uk", "en"])) - 0.8).abs() < 1e-9);
        // de and fr share one bonus
        assert!((localization_score(&langs(&["uk", "en", "de", "fr"])) - 0.88).abs() < 1e-9);
        assert!((localization_score(&langs(&["uk", "en", "de", "pl", "ru"])) - 0.92).abs() < 1e-9);
        assert!((localization_score(&langs(&["pl"])) - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_html_lang_and_links() {
        let html = r#"<html lang="uk-UA"><body>
            <a href="/en/about">English</a>
            <a href="/page?lang=de">DE</a>
        </body></html>"#;
        let found = available_languages(html, "https://example.edu/");
        assert!(found.contains("uk"));
        assert!(found.contains("en"));
        assert!(found.contains("de"));
    }

    #[test]
    fn test_hreflang_excludes_x_default() {
        let html = r#"<html><head>
            <link rel="alternate" hreflang="fr-FR" href="/fr">
            <link rel="alternate" hreflang="x-default" href="/">
        </head><body></body></html>"#;
        let found = available_languages(html, "");
        assert_eq!(found, langs(&["fr"]));
    }

    #[test]
    fn test_language_switcher_words() {
        let html = r#"<html><body>
            <div class="lang-switcher"><span>Українська</span> | <span>Polski</span></div>
            <div class="language-note">Language help</div>
        </body></html>"#;
        let found = available_languages(html, "");
        assert!(found.contains("uk"));
        assert!(found.contains("pl"));
        // "language" contains "ua" but is not the word "ua"
        assert!(!found.contains("en"));
    }

    #[test]
    fn test_url_pattern() {
        let found = available_languages("<html><body></body></html>", "https://site.ua/ru/news");
        assert_eq!(found, langs(&["ru"]));
    }

    #[test]
    fn test_detect_content_language() {
        assert_eq!(detect_content_language("About the university and education"), Some("en"));
        assert_eq!(detect_content_language("Інформація про університет і освіта"), Some("uk"));
        assert_eq!(detect_content_language("12345"), None);
        // "про" and "для" are shared; uk wins the tie
        assert_eq!(detect_content_language("про для"), Some("uk"));
    }

    #[test]
    fn test_measure() {
        let page = PageData::from_html(
            "https://example.edu/",
            r#"<html lang="uk"><body><a href="/en/">EN</a><p>Про університет</p></body></html>"#,
        );
        let score = LocalizationAnalyzer.measure(&page).unwrap();
        assert!((score - 0.8).abs() < 1e-9);
    }
}
