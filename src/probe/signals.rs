// SPDX-License-Identifier: PMPL-1.0-or-later
//! Signal collection for one scenario on one field.
//!
//! Applying a scenario overwrites the field value, fires input, change and
//! blur, waits for the page to settle and then reads the four channels. The
//! original value is written back by a [`ValueRestore`] guard on every exit
//! path.

use super::scenarios::TestScenario;
use super::FieldDescriptor;
use crate::document::{closest_container, DomEvent, ElementId, LiveDocument, ValueRestore};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Class names that mark an element as an error-message container
pub const ERROR_CONTAINER_CLASSES: &[&str] = &[
    "error",
    "invalid",
    "warning",
    "alert",
    "error-message",
    "field-error",
    "validation-error",
    "help-block",
    "form-error",
    "input-error",
];

/// Words that mark a text as an error message (English and Ukrainian)
pub const ERROR_KEYWORDS: &[&str] = &[
    "invalid",
    "required",
    "must",
    "error",
    "wrong",
    "incorrect",
    "невірний",
    "обов'язковий",
    "помилка",
    "неправильний",
    "введіть",
    "виберіть",
];

/// Substrings that mark a field class as an error state
pub const ERROR_STATE_CLASSES: &[&str] = &["error", "invalid", "warning", "has-error", "is-invalid"];

/// Tags searched, nearest first, for the container of a field
const CONTAINER_TAGS: &[&str] = &["div", "fieldset", "section", "form"];

/// Longest text still accepted as an inline error message
const MAX_MESSAGE_CHARS: usize = 200;

/// Native constraint-validation channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeSignal {
    pub detected: bool,
    pub validation_message: String,
    pub reasons: Vec<String>,
}

/// Assistive-semantics channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AriaSignal {
    pub detected: bool,
    /// Raw `aria-invalid` value
    pub aria_invalid: Option<String>,
    /// Text of the elements referenced by `aria-describedby`
    pub described_by_text: String,
    /// Non-empty `role="alert"` texts anywhere on the page
    pub alert_texts: Vec<String>,
}

impl AriaSignal {
    pub fn flags_invalid(&self) -> bool {
        self.aria_invalid.as_deref() == Some("true")
    }

    pub fn has_described_by_text(&self) -> bool {
        !self.described_by_text.is_empty()
    }

    pub fn has_alert(&self) -> bool {
        !self.alert_texts.is_empty()
    }
}

/// An error-message element found near the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyMessage {
    /// The error-container class the element matched
    pub class: String,
    pub text: String,
}

/// Structural-proximity channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralSignal {
    pub detected: bool,
    pub messages: Vec<NearbyMessage>,
}

/// Visual-state channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualSignal {
    pub detected: bool,
    pub error_classes: Vec<String>,
    pub invalid_state: bool,
}

/// Everything read back after one scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSignals {
    pub native: NativeSignal,
    pub aria: AriaSignal,
    pub structural: StructuralSignal,
    pub visual: VisualSignal,
}

/// Which channels fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFlags {
    pub native: bool,
    pub aria: bool,
    pub structural: bool,
    pub visual: bool,
}

impl ChannelFlags {
    pub fn any(&self) -> bool {
        self.native || self.aria || self.structural || self.visual
    }

    pub fn count(&self) -> usize {
        [self.native, self.aria, self.structural, self.visual]
            .iter()
            .filter(|fired| **fired)
            .count()
    }

    /// Channel-wise OR
    pub fn union(self, other: ChannelFlags) -> ChannelFlags {
        ChannelFlags {
            native: self.native || other.native,
            aria: self.aria || other.aria,
            structural: self.structural || other.structural,
            visual: self.visual || other.visual,
        }
    }
}

impl ErrorSignals {
    pub fn channels(&self) -> ChannelFlags {
        ChannelFlags {
            native: self.native.detected,
            aria: self.aria.detected,
            structural: self.structural.detected,
            visual: self.visual.detected,
        }
    }

    /// True when at least one channel fired
    pub fn error_detected(&self) -> bool {
        self.channels().any()
    }

    /// Weighted quality of the communication, in [0, 1].
    ///
    /// The assistive-semantics share is built from its own sub-signals and
    /// capped at 0.35.
    pub fn quality_score(&self) -> f64 {
        let indicator = |b: bool| -> f64 { if b { 1.0 } else { 0.0 } };
        let aria = 0.15 * indicator(self.aria.flags_invalid())
            + 0.15 * indicator(self.aria.has_described_by_text())
            + 0.05 * indicator(self.aria.has_alert());

        let score = 0.25 * indicator(self.native.detected)
            + aria.min(0.35)
            + 0.25 * indicator(self.structural.detected)
            + 0.15 * indicator(self.visual.detected);
        score.min(1.0)
    }
}

/// Apply `scenario` to `field` and read back all four channels.
///
/// The field's original value is restored before this returns, whether
/// reading succeeded or not.
pub fn collect<D: LiveDocument + ?Sized>(
    doc: &mut D,
    field: &FieldDescriptor,
    scenario: &TestScenario,
    settle_delay: Duration,
) -> Result<ErrorSignals> {
    let element = field.element;
    let mut guard = ValueRestore::capture(doc, element)?;
    let doc = guard.doc();

    doc.set_value(element, &scenario.value)?;
    for event in DomEvent::PROBE_SEQUENCE {
        doc.dispatch(element, event)?;
    }
    doc.settle(settle_delay);

    read_signals(&*doc, element)
}

/// Read the four channels for `element` without touching its value
pub fn read_signals<D: LiveDocument + ?Sized>(doc: &D, element: ElementId) -> Result<ErrorSignals> {
    Ok(ErrorSignals {
        native: read_native(doc, element)?,
        aria: read_aria(doc, element)?,
        structural: read_structural(doc, element)?,
        visual: read_visual(doc, element)?,
    })
}

fn read_native<D: LiveDocument + ?Sized>(doc: &D, element: ElementId) -> Result<NativeSignal> {
    let validity = doc.validity(element)?;
    Ok(NativeSignal {
        detected: !validity.valid,
        reasons: validity.reasons().into_iter().map(String::from).collect(),
        validation_message: validity.validation_message,
    })
}

fn read_aria<D: LiveDocument + ?Sized>(doc: &D, element: ElementId) -> Result<AriaSignal> {
    let aria_invalid = doc.attribute(element, "aria-invalid")?;

    let mut described = Vec::new();
    if let Some(ids) = doc.attribute(element, "aria-describedby")? {
        for id in ids.split_whitespace() {
            if let Some(target) = doc.element_by_id(id)? {
                let text = doc.text_content(target)?.trim().to_string();
                if !text.is_empty() {
                    described.push(text);
                }
            }
        }
    }

    let mut alert_texts = Vec::new();
    for candidate in doc.elements_with_attribute("role")? {
        if doc.attribute(candidate, "role")?.as_deref() != Some("alert") {
            continue;
        }
        let text = doc.text_content(candidate)?.trim().to_string();
        if !text.is_empty() {
            alert_texts.push(text);
        }
    }

    let mut signal = AriaSignal {
        detected: false,
        aria_invalid,
        described_by_text: described.join(" "),
        alert_texts,
    };
    signal.detected = signal.flags_invalid() || signal.has_described_by_text() || signal.has_alert();
    Ok(signal)
}

fn read_structural<D: LiveDocument + ?Sized>(doc: &D, element: ElementId) -> Result<StructuralSignal> {
    let Some(container) = closest_container(doc, element, CONTAINER_TAGS)? else {
        return Ok(StructuralSignal::default());
    };

    let mut messages = Vec::new();
    for class in ERROR_CONTAINER_CLASSES {
        for candidate in doc.descendants(container)? {
            if !doc.class_list(candidate)?.iter().any(|c| c == class) {
                continue;
            }
            let text = doc.text_content(candidate)?.trim().to_string();
            if !text.is_empty() && text.chars().count() < MAX_MESSAGE_CHARS {
                messages.push(NearbyMessage {
                    class: class.to_string(),
                    text,
                });
            }
        }
    }

    let detected = messages.iter().any(|m| contains_error_keyword(&m.text));
    Ok(StructuralSignal { detected, messages })
}

fn read_visual<D: LiveDocument + ?Sized>(doc: &D, element: ElementId) -> Result<VisualSignal> {
    let invalid_state = doc.matches_invalid_state(element)?;
    let error_classes: Vec<String> = doc
        .class_list(element)?
        .into_iter()
        .filter(|class| {
            let lower = class.to_lowercase();
            ERROR_STATE_CLASSES.iter().any(|marker| lower.contains(marker))
        })
        .collect();

    Ok(VisualSignal {
        detected: invalid_state || !error_classes.is_empty(),
        error_classes,
        invalid_state,
    })
}

pub fn contains_error_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::memory::MemoryDocument;
    use crate::probe::scenarios::ScenarioKind;

    fn descriptor(doc: &MemoryDocument, id: &str) -> FieldDescriptor {
        FieldDescriptor {
            element: doc.element_by_id(id).unwrap().unwrap(),
            selector: format!("#{}", id),
            field_type: "email".to_string(),
            required: true,
            pattern: None,
            min_length: None,
            max_length: None,
            min: None,
            max: None,
            step: None,
        }
    }

    fn scenario(value: &str) -> TestScenario {
        TestScenario::new(value, ScenarioKind::InvalidFormat, "Invalid format")
    }

    #[test]
    fn test_quality_extremes() {
        assert_eq!(ErrorSignals::default().quality_score(), 0.0);

        let all = ErrorSignals {
            native: NativeSignal { detected: true, ..Default::default() },
            aria: AriaSignal {
                detected: true,
                aria_invalid: Some("true".to_string()),
                described_by_text: "Enter a valid email".to_string(),
                alert_texts: vec!["Fix the errors below".to_string()],
            },
            structural: StructuralSignal { detected: true, messages: vec![] },
            visual: VisualSignal { detected: true, ..Default::default() },
        };
        assert!((all.quality_score() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_quality_monotonic_in_channels() {
        let mut signals = ErrorSignals::default();
        let mut last = signals.quality_score();

        signals.visual.detected = true;
        let next = signals.quality_score();
        assert!(next > last);
        last = next;

        signals.native.detected = true;
        let next = signals.quality_score();
        assert!(next > last);
        last = next;

        signals.structural.detected = true;
        let next = signals.quality_score();
        assert!(next > last);
        last = next;

        signals.aria = AriaSignal {
            detected: true,
            aria_invalid: Some("true".to_string()),
            ..Default::default()
        };
        assert!(signals.quality_score() > last);
    }

    #[test]
    fn test_aria_share_from_sub_signals() {
        let signals = ErrorSignals {
            aria: AriaSignal {
                detected: true,
                alert_texts: vec!["Oops".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!((signals.quality_score() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_native_only_page() {
        let mut doc = MemoryDocument::parse(r#"<form><input id="e" type="email" required></form>"#);
        let field = descriptor(&doc, "e");
        let signals = collect(&mut doc, &field, &scenario("abc"), Duration::ZERO).unwrap();
        assert!(signals.native.detected);
        assert_eq!(signals.native.reasons, vec!["type-mismatch".to_string()]);
        assert!(!signals.aria.detected);
        assert!(!signals.structural.detected);
        assert!(!signals.visual.detected);
        assert!((signals.quality_score() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_listener_driven_channels() {
        let mut doc = MemoryDocument::parse(
            r#"<form>
                <div class="field">
                    <input id="e" type="email" aria-describedby="e-hint">
                    <span id="e-hint" class="field-error"></span>
                </div>
            </form>"#,
        );
        doc.on("e", DomEvent::Blur, |dom, target| {
            dom.set_attribute(target, "aria-invalid", "true")?;
            dom.add_class(target, "is-invalid")?;
            let hint = dom.element_by_id("e-hint").expect("hint element");
            dom.set_text(hint, "Invalid email address")
        })
        .unwrap();

        let field = descriptor(&doc, "e");
        let signals = collect(&mut doc, &field, &scenario("abc"), Duration::ZERO).unwrap();
        assert!(signals.native.detected);
        assert!(signals.aria.flags_invalid());
        assert_eq!(signals.aria.described_by_text, "Invalid email address");
        assert!(signals.structural.detected);
        assert_eq!(signals.structural.messages[0].class, "field-error");
        assert_eq!(signals.visual.error_classes, vec!["is-invalid".to_string()]);
        assert!((signals.quality_score() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_free_message_is_not_structural() {
        let mut doc = MemoryDocument::parse(
            r#"<form>
                <div class="field">
                    <input id="e" type="email" aria-describedby="e-hint">
                    <span id="e-hint" class="field-error"></span>
                </div>
            </form>"#,
        );
        doc.on("e", DomEvent::Blur, |dom, target| {
            dom.set_attribute(target, "aria-invalid", "true")?;
            dom.add_class(target, "is-invalid")?;
            let hint = dom.element_by_id("e-hint").expect("hint element");
            dom.set_text(hint, "Please enter a valid email address")
        })
        .unwrap();

        let field = descriptor(&doc, "e");
        let signals = collect(&mut doc, &field, &scenario("abc"), Duration::ZERO).unwrap();
        assert_eq!(signals.structural.messages.len(), 1);
        assert!(!signals.structural.detected);
        // native 0.25 + aria 0.30 + visual 0.15
        assert!((signals.quality_score() - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_structural_requires_keyword() {
        let doc = MemoryDocument::parse(
            r#"<form><div><input id="a"><span class="error">Looks good</span></div></form>"#,
        );
        let a = doc.element_by_id("a").unwrap().unwrap();
        let signals = read_signals(&doc, a).unwrap();
        assert_eq!(signals.structural.messages.len(), 1);
        assert!(!signals.structural.detected);
    }

    #[test]
    fn test_ukrainian_keyword() {
        assert!(contains_error_keyword("Введіть коректну адресу"));
        assert!(contains_error_keyword("This field is REQUIRED"));
        assert!(!contains_error_keyword("All set"));
    }

    #[test]
    fn test_value_restored_after_collect() {
        let mut doc = MemoryDocument::parse(
            r#"<form><input id="e" type="email" value="keep@example.com"></form>"#,
        );
        let field = descriptor(&doc, "e");
        collect(&mut doc, &field, &scenario("abc"), Duration::ZERO).unwrap();
        assert_eq!(doc.value(field.element).unwrap(), "keep@example.com");
    }

    #[test]
    fn test_value_restored_after_failure() {
        let mut doc = MemoryDocument::parse(
            r#"<form><input id="e" type="email" value="keep@example.com"></form>"#,
        );
        doc.on("e", DomEvent::Change, |_, _| {
            Err(crate::error::GradeError::Document("listener threw".to_string()))
        })
        .unwrap();
        let field = descriptor(&doc, "e");
        assert!(collect(&mut doc, &field, &scenario("abc"), Duration::ZERO).is_err());
        assert_eq!(doc.value(field.element).unwrap(), "keep@example.com");
    }
}
