// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for accessgrade

use accessgrade::config::{self, Config, HybridWeights};
use accessgrade::document::memory::MemoryDocument;
use accessgrade::document::DomEvent;
use accessgrade::page::PageData;
use accessgrade::probe::ProbeOptions;
use accessgrade::recommend::Priority;
use accessgrade::report::{generate_report, OutputFormat};
use accessgrade::scanner;
use accessgrade::scoring::{ErrorSupportMode, HybridScorer, Metric, QualityLevel, SubMetrics};
use accessgrade::Evaluator;
use std::path::Path;
use std::time::Duration;

fn evaluator() -> Evaluator {
    let mut config = Config::default();
    config.probe.settle_delay_ms = 0;
    Evaluator::new(config)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(Path::new("tests/fixtures").join(name)).expect("fixture exists")
}

#[test]
fn test_accessible_fixture_outscores_inaccessible() {
    let evaluator = evaluator();
    let good = scanner::evaluate_file(Path::new("tests/fixtures/accessible.html"), &evaluator, &SubMetrics::new())
        .expect("evaluation should succeed");
    let bad = scanner::evaluate_file(Path::new("tests/fixtures/inaccessible.html"), &evaluator, &SubMetrics::new())
        .expect("evaluation should succeed");

    assert!(
        good.score.final_score > bad.score.final_score,
        "accessible {} should beat inaccessible {}",
        good.score.final_score,
        bad.score.final_score
    );
    assert_eq!(good.metrics.get(Metric::KeyboardNavigation), Some(1.0));
    assert_eq!(good.metrics.get(Metric::StructuredNavigation), Some(1.0));
    assert!(good.metrics.get(Metric::Localization).unwrap() >= 0.8);
    assert_eq!(good.error_support.mode, ErrorSupportMode::Hybrid);
}

#[test]
fn test_inaccessible_fixture_recommendations() {
    let evaluation = scanner::evaluate_file(
        Path::new("tests/fixtures/inaccessible.html"),
        &evaluator(),
        &SubMetrics::new(),
    )
    .expect("evaluation should succeed");

    let fired: Vec<Metric> = evaluation.recommendations.iter().map(|r| r.metric).collect();
    for metric in [
        Metric::KeyboardNavigation,
        Metric::StructuredNavigation,
        Metric::InstructionClarity,
        Metric::InputAssistance,
        Metric::Localization,
    ] {
        assert!(fired.contains(&metric), "expected a recommendation for {}", metric);
    }
    // External metrics were not supplied, so none of their rules fire
    assert!(!fired.contains(&Metric::AltText));
    assert!(!fired.contains(&Metric::Contrast));
    assert_eq!(evaluation.recommendations[0].priority, Priority::High);
}

#[test]
fn test_page_without_forms_has_full_error_support() {
    let html = fixture("no_forms.html");
    let page = PageData::from_html("https://example.edu/about", &html);
    let mut doc = MemoryDocument::parse(&html);
    let evaluation = evaluator().evaluate(&page, &mut doc, &SubMetrics::new());

    assert_eq!(evaluation.error_support.mode, ErrorSupportMode::NoTestableSurface);
    assert_eq!(evaluation.metrics.get(Metric::ErrorSupport), Some(1.0));
    assert!(evaluation.error_support.forms.is_empty());
}

#[test]
fn test_scripted_validation_improves_dynamic_score() {
    let html = fixture("accessible.html");
    let page = PageData::from_html("https://example.edu/apply", &html);

    let mut silent = MemoryDocument::parse(&html);
    let silent_eval = evaluator().evaluate(&page, &mut silent, &SubMetrics::new());

    let mut scripted = MemoryDocument::parse(&html);
    scripted
        .on("email", DomEvent::Blur, |dom, target| {
            let invalid = !dom.validity(target)?.valid;
            let slot = match dom.element_by_id("email-error") {
                Some(slot) => slot,
                None => return Ok(()),
            };
            if invalid {
                dom.set_attribute(target, "aria-invalid", "true")?;
                dom.set_text(slot, "Invalid email address")
            } else {
                dom.remove_attribute(target, "aria-invalid")?;
                dom.set_text(slot, "")
            }
        })
        .expect("email field exists");
    let scripted_eval = evaluator().evaluate(&page, &mut scripted, &SubMetrics::new());

    let silent_dynamic = silent_eval.error_support.dynamic_score.expect("silent form tested");
    let scripted_dynamic = scripted_eval.error_support.dynamic_score.expect("scripted form tested");
    assert!(scripted_dynamic > silent_dynamic);

    // Probing leaves the document as it found it
    let email = scripted.dom().element_by_id("email").expect("email field");
    assert_eq!(scripted.dom().value(email).unwrap(), "");
}

#[test]
fn test_expired_deadline_falls_back_to_static() {
    let html = fixture("accessible.html");
    let page = PageData::from_html("", &html);
    let mut doc = MemoryDocument::parse(&html);

    let options = ProbeOptions {
        settle_delay: Duration::ZERO,
        ..ProbeOptions::default()
    }
    .with_deadline(Duration::ZERO);
    let score = HybridScorer::new(HybridWeights::default(), options).score(&page, &mut doc);

    assert_eq!(score.mode, ErrorSupportMode::StaticOnly);
    assert!(score.forms.is_empty());
    assert_eq!(score.combined, score.static_score);
    assert!(score.note.as_deref().unwrap_or("").contains("deadline"));
}

#[test]
fn test_aggregation_example() {
    let metrics = SubMetrics::new()
        .with(Metric::AltText, 0.5)
        .with(Metric::Contrast, 0.5)
        .with(Metric::MediaAccessibility, 0.5)
        .with(Metric::KeyboardNavigation, 0.5)
        .with(Metric::StructuredNavigation, 0.5)
        .with(Metric::InstructionClarity, 0.5)
        .with(Metric::InputAssistance, 0.5)
        .with(Metric::ErrorSupport, 0.5)
        .with(Metric::Localization, 0.0);
    let score = evaluator().aggregate(&metrics);

    assert!((score.main_score.unwrap() - 0.5).abs() < 1e-9);
    assert!((score.final_score - 0.3).abs() < 1e-9);
    assert_eq!(score.quality_level, QualityLevel::Satisfactory);
}

#[test]
fn test_config_file_drives_evaluation() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    config::write_default_config(&path).unwrap();

    let mut loaded = config::load_config(&path).unwrap();
    loaded.probe.settle_delay_ms = 0;
    // Localization weight 0 leaves the final score equal to the main score
    loaded.weights.categories.localization = 0.0;

    let html = fixture("no_forms.html");
    let page = PageData::from_html("", &html);
    let evaluation = Evaluator::new(loaded).evaluate_static(&page, &SubMetrics::new());
    let main = evaluation.score.main_score.expect("main score");
    assert!((evaluation.score.final_score - main).abs() < 1e-9);
}

#[test]
fn test_json_report_round_trip() {
    let evaluation = scanner::evaluate_file(
        Path::new("tests/fixtures/no_forms.html"),
        &evaluator(),
        &SubMetrics::new().with(Metric::Contrast, 0.9),
    )
    .expect("evaluation should succeed");

    let report = generate_report(&evaluation, OutputFormat::Json);
    let parsed: accessgrade::Evaluation = serde_json::from_str(&report).expect("valid evaluation JSON");
    assert_eq!(parsed.id, evaluation.id);
    assert!((parsed.metrics.get(Metric::Contrast).unwrap() - 0.9).abs() < 1e-9);
    assert_eq!(parsed.score.quality_level, evaluation.score.quality_level);
}

#[test]
fn test_scan_fixture_directory() {
    let pages = scanner::scan_directory(Path::new("tests/fixtures"), &evaluator()).expect("scan should succeed");
    assert_eq!(pages.len(), 3);
}
