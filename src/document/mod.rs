// SPDX-License-Identifier: PMPL-1.0-or-later
//! Live document abstraction.
//!
//! The probing core never talks to a browser directly. It drives a
//! [`LiveDocument`]: something that can locate elements, read and write a
//! field's value, fire input/change/blur notifications, report native
//! constraint validation and wait for the page to settle. A headless
//! browser bridge implements this trait in production; [`memory`] provides
//! an in-process implementation used by the CLI and the test suite.

pub mod memory;

use crate::error::Result;
use crate::page::FormHandle;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Opaque handle to one element of a live document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub usize);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notifications dispatched on a field to trigger listener-driven validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    Input,
    Change,
    Blur,
}

impl DomEvent {
    /// The order in which a probe fires notifications after writing a value
    pub const PROBE_SEQUENCE: [DomEvent; 3] = [DomEvent::Input, DomEvent::Change, DomEvent::Blur];
}

impl std::fmt::Display for DomEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomEvent::Input => write!(f, "input"),
            DomEvent::Change => write!(f, "change"),
            DomEvent::Blur => write!(f, "blur"),
        }
    }
}

/// The region of a document a form test runs against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FormScope {
    /// A real `<form>` element
    Form(FormHandle),
    /// The whole page body, treated as one virtual form
    Page,
}

impl FormScope {
    /// Selector used to identify the scope in results
    pub fn selector(&self) -> &str {
        match self {
            FormScope::Form(handle) => &handle.selector,
            FormScope::Page => "body",
        }
    }
}

/// Native constraint-validation state of one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityState {
    pub valid: bool,
    pub validation_message: String,
    pub value_missing: bool,
    pub type_mismatch: bool,
    pub pattern_mismatch: bool,
    pub too_long: bool,
    pub too_short: bool,
    pub range_underflow: bool,
    pub range_overflow: bool,
    pub step_mismatch: bool,
}

impl ValidityState {
    /// A field that satisfies all of its constraints
    pub fn valid() -> Self {
        Self { valid: true, ..Self::default() }
    }

    /// Names of the constraint failures currently flagged
    pub fn reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if self.value_missing { reasons.push("value-missing"); }
        if self.type_mismatch { reasons.push("type-mismatch"); }
        if self.pattern_mismatch { reasons.push("pattern-mismatch"); }
        if self.too_long { reasons.push("too-long"); }
        if self.too_short { reasons.push("too-short"); }
        if self.range_underflow { reasons.push("range-underflow"); }
        if self.range_overflow { reasons.push("range-overflow"); }
        if self.step_mismatch { reasons.push("step-mismatch"); }
        reasons
    }
}

/// A live, mutable page that the probing core can drive.
///
/// Mutating operations take `&mut self`: one document is probed by one
/// scenario at a time.
pub trait LiveDocument {
    /// Root element of the scope, or `None` when it cannot be located
    fn locate_scope(&self, scope: &FormScope) -> Result<Option<ElementId>>;

    /// Element carrying the given `id` attribute
    fn element_by_id(&self, id: &str) -> Result<Option<ElementId>>;

    fn parent(&self, element: ElementId) -> Result<Option<ElementId>>;

    /// All descendant elements in document order, excluding `element`
    fn descendants(&self, element: ElementId) -> Result<Vec<ElementId>>;

    /// All elements in the document carrying attribute `name`
    fn elements_with_attribute(&self, name: &str) -> Result<Vec<ElementId>>;

    /// Lowercase tag name
    fn tag_name(&self, element: ElementId) -> Result<String>;

    fn attribute(&self, element: ElementId, name: &str) -> Result<Option<String>>;

    fn class_list(&self, element: ElementId) -> Result<Vec<String>>;

    fn text_content(&self, element: ElementId) -> Result<String>;

    /// Current value of a form control
    fn value(&self, element: ElementId) -> Result<String>;

    fn set_value(&mut self, element: ElementId, value: &str) -> Result<()>;

    /// Fire a notification on the element, running any page-side listeners
    fn dispatch(&mut self, element: ElementId, event: DomEvent) -> Result<()>;

    /// Native constraint validation of a form control
    fn validity(&self, element: ElementId) -> Result<ValidityState>;

    /// Whether the element currently renders in an "invalid" style state
    fn matches_invalid_state(&self, element: ElementId) -> Result<bool>;

    /// Block for `delay` so asynchronous page reactions can land
    fn settle(&mut self, delay: Duration);
}

/// Restores a field's original value when dropped.
///
/// Wraps the document for the duration of one scenario. Restoration runs
/// on every exit path: normal return, `?` propagation and unwinding.
pub struct ValueRestore<'a, D: LiveDocument + ?Sized> {
    doc: &'a mut D,
    element: ElementId,
    original: String,
}

impl<'a, D: LiveDocument + ?Sized> ValueRestore<'a, D> {
    /// Capture the field's current value
    pub fn capture(doc: &'a mut D, element: ElementId) -> Result<Self> {
        let original = doc.value(element)?;
        Ok(Self { doc, element, original })
    }

    /// The value that will be written back
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn doc(&mut self) -> &mut D {
        &mut *self.doc
    }
}

impl<D: LiveDocument + ?Sized> Drop for ValueRestore<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.doc.set_value(self.element, &self.original) {
            warn!(element = %self.element, error = %e, "Failed to restore field value");
        }
    }
}

/// Nearest ancestor whose tag is one of `tags`, falling back to the parent
pub fn closest_container<D: LiveDocument + ?Sized>(
    doc: &D,
    element: ElementId,
    tags: &[&str],
) -> Result<Option<ElementId>> {
    let parent = doc.parent(element)?;
    let mut current = parent;
    while let Some(candidate) = current {
        let tag = doc.tag_name(candidate)?;
        if tags.contains(&tag.as_str()) {
            return Ok(Some(candidate));
        }
        current = doc.parent(candidate)?;
    }
    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryDocument;
    use super::*;

    #[test]
    fn test_restore_on_drop() {
        let mut doc = MemoryDocument::parse(r#"<form><input id="a" value="keep"></form>"#);
        let field = doc.element_by_id("a").unwrap().unwrap();
        {
            let mut guard = ValueRestore::capture(&mut doc, field).unwrap();
            assert_eq!(guard.original(), "keep");
            guard.doc().set_value(field, "changed").unwrap();
            assert_eq!(guard.doc().value(field).unwrap(), "changed");
        }
        assert_eq!(doc.value(field).unwrap(), "keep");
    }

    #[test]
    fn test_closest_container_prefers_grouping_tags() {
        let doc = MemoryDocument::parse(
            r#"<form><fieldset><span><input id="a"></span></fieldset></form>"#,
        );
        let field = doc.element_by_id("a").unwrap().unwrap();
        let container = closest_container(&doc, field, &["div", "fieldset", "section", "form"])
            .unwrap()
            .unwrap();
        assert_eq!(doc.tag_name(container).unwrap(), "fieldset");
    }

    #[test]
    fn test_validity_reasons() {
        let state = ValidityState {
            valid: false,
            value_missing: true,
            range_overflow: true,
            ..ValidityState::default()
        };
        assert_eq!(state.reasons(), vec!["value-missing", "range-overflow"]);
        assert!(ValidityState::valid().reasons().is_empty());
    }
}
