// SPDX-License-Identifier: PMPL-1.0-or-later
//! Form understandability analyzers - WCAG 3.3.2 Labels or Instructions (Level A),
//! 3.3.5 Help (Level AAA), 1.3.5 Identify Input Purpose (Level AA)
//!
//! Two sub-metrics come from the same form markup:
//! - `instruction_clarity`: share of instruction texts that are short, plain and jargon-free
//! - `input_assistance`: share of form fields that offer some help to the user

use crate::analyzers::MetricAnalyzer;
use crate::page::PageData;
use crate::scoring::Metric;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

/// Instruction clarity analyzer
pub struct InstructionClarityAnalyzer;

/// Input assistance analyzer
pub struct InputAssistanceAnalyzer;

/// Elements whose text counts as an instruction
const INSTRUCTION_SELECTOR: &str =
    "label, .help-text, .instruction, .form-help, .hint, small, [aria-describedby], .description";

/// Instructions at or below this many characters are too short to judge
const MIN_INSTRUCTION_CHARS: usize = 5;

const MAX_INSTRUCTION_WORDS: usize = 20;
const MAX_INSTRUCTION_SENTENCES: usize = 2;

/// Technical vocabulary that ordinary users should not meet in form help
const JARGON: &[&str] = &[
    "api", "json", "xml", "sql", "regex", "ajax", "backend", "frontend", "middleware", "endpoint",
];

/// Attributes that count as assistance on a field
const ASSISTANCE_ATTRIBUTES: &[&str] = &["autocomplete", "placeholder", "aria-describedby", "aria-label", "title"];

/// Input types the user never types into
const EXEMPT_INPUT_TYPES: &[&str] = &["hidden", "submit", "reset", "button", "image"];

impl MetricAnalyzer for InstructionClarityAnalyzer {
    fn name(&self) -> &str {
        "Instruction Clarity Analyzer"
    }

    fn description(&self) -> &str {
        "Checks that labels, hints and placeholders are short and plain (WCAG 3.3.2)"
    }

    fn metric(&self) -> Metric {
        Metric::InstructionClarity
    }

    fn measure(&self, page: &PageData) -> Option<f64> {
        let document = Html::parse_document(&page.html);
        let instructions = extract_instructions(&document);
        if instructions.is_empty() {
            return Some(1.0);
        }
        let sentence_re = Regex::new(r"[.!?]+").expect("valid regex");
        let clear = instructions
            .iter()
            .filter(|text| is_clear_instruction(text, &sentence_re))
            .count();
        Some(clear as f64 / instructions.len() as f64)
    }
}

impl MetricAnalyzer for InputAssistanceAnalyzer {
    fn name(&self) -> &str {
        "Input Assistance Analyzer"
    }

    fn description(&self) -> &str {
        "Fraction of form fields with autocomplete, placeholder or accessible hints (WCAG 1.3.5, 3.3.5)"
    }

    fn metric(&self) -> Metric {
        Metric::InputAssistance
    }

    fn measure(&self, page: &PageData) -> Option<f64> {
        let document = Html::parse_document(&page.html);
        let field_sel = Selector::parse("form input, form select, form textarea").expect("valid selector");

        let fields: Vec<ElementRef<'_>> = document
            .select(&field_sel)
            .filter(|el| {
                let input_type = el.value().attr("type").unwrap_or("text");
                !(el.value().name() == "input" && EXEMPT_INPUT_TYPES.contains(&input_type))
            })
            .collect();
        if fields.is_empty() {
            return Some(1.0);
        }

        let assisted = fields.iter().filter(|el| has_assistance(**el)).count();
        Some(assisted as f64 / fields.len() as f64)
    }
}

/// Distinct instruction texts on the page
fn extract_instructions(document: &Html) -> BTreeSet<String> {
    let instruction_sel = Selector::parse(INSTRUCTION_SELECTOR).expect("valid selector");
    let placeholder_sel = Selector::parse("input[placeholder]").expect("valid selector");

    let texts = document
        .select(&instruction_sel)
        .map(|el| el.text().collect::<String>())
        .chain(
            document
                .select(&placeholder_sel)
                .filter_map(|el| el.value().attr("placeholder").map(str::to_string)),
        );

    texts
        .map(|text| text.trim().to_string())
        .filter(|text| text.chars().count() > MIN_INSTRUCTION_CHARS)
        .collect()
}

fn is_clear_instruction(text: &str, sentence_re: &Regex) -> bool {
    let words = text.split_whitespace().count();
    let sentences = sentence_re.split(text).filter(|s| !s.trim().is_empty()).count();

    words <= MAX_INSTRUCTION_WORDS
        && sentences <= MAX_INSTRUCTION_SENTENCES
        && text.chars().count() >= MIN_INSTRUCTION_CHARS
        && !contains_jargon(text)
}

/// Whole-word jargon check, so "capital" does not trip on "api"
fn contains_jargon(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| JARGON.contains(&word))
}

fn has_assistance(field: ElementRef<'_>) -> bool {
    ASSISTANCE_ATTRIBUTES
        .iter()
        .any(|attr| field.value().attr(attr).map(|v| !v.trim().is_empty()).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clarity(html: &str) -> f64 {
        InstructionClarityAnalyzer.measure(&PageData::from_html("", html)).unwrap()
    }

    fn assistance(html: &str) -> f64 {
        InputAssistanceAnalyzer.measure(&PageData::from_html("", html)).unwrap()
    }

    #[test]
    fn test_no_instructions() {
        assert_eq!(clarity("<p>Hi</p>"), 1.0);
        // Too short to count
        assert_eq!(clarity("<label>Name</label>"), 1.0);
    }

    #[test]
    fn test_clear_and_unclear_instructions() {
        let html = r#"<form>
            <label for="e">Your email address</label>
            <small class="hint">Send the JSON payload to the endpoint</small>
            <input id="e" placeholder="name@example.com">
        </form>"#;
        // "Your email address", "name@example.com" clear; the jargon hint is not
        let score = clarity(html);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_instructions_counted_once() {
        let html = r#"<label>Phone number</label><label>Phone number</label>
            <div class="hint">This hint goes on and on. It has many sentences. Far too many for a form.</div>"#;
        assert_eq!(clarity(html), 0.5);
    }

    #[test]
    fn test_long_instruction_unclear() {
        let long = "word ".repeat(25);
        let html = format!("<div class=\"help-text\">{}</div>", long);
        assert_eq!(clarity(&html), 0.0);
    }

    #[test]
    fn test_jargon_whole_words() {
        assert!(contains_jargon("Paste the API key"));
        assert!(!contains_jargon("Enter your capital city"));
    }

    #[test]
    fn test_two_sentences_still_clear() {
        let sentence_re = Regex::new(r"[.!?]+").unwrap();
        assert!(is_clear_instruction("Enter your email. We never share it.", &sentence_re));
        assert!(!is_clear_instruction("One. Two. Three.", &sentence_re));
    }

    #[test]
    fn test_input_assistance() {
        let html = r#"<form>
            <input type="email" autocomplete="email">
            <input type="text" placeholder="City">
            <input type="text" aria-label="Search">
            <textarea></textarea>
            <input type="hidden" name="csrf">
            <input type="submit">
        </form>"#;
        assert_eq!(assistance(html), 0.75);
    }

    #[test]
    fn test_input_assistance_no_fields() {
        assert_eq!(assistance("<form><button>Go</button></form>"), 1.0);
        // Fields outside forms are not counted
        assert_eq!(assistance("<input type=\"text\">"), 1.0);
    }

    #[test]
    fn test_empty_attribute_is_no_help() {
        assert_eq!(assistance(r#"<form><input title=" "></form>"#), 0.0);
    }
}
