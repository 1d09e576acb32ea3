// SPDX-License-Identifier: PMPL-1.0-or-later
//! In-memory live document.
//!
//! Parses HTML into a small mutable element tree and implements the parts
//! of a browser the probing core relies on: field values with input-type
//! sanitization, HTML constraint validation with browser-style messages,
//! class and attribute state, and page-side listeners registered as Rust
//! closures.

use super::{DomEvent, ElementId, FormScope, LiveDocument, ValidityState};
use crate::error::{GradeError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Node as HtmlNode};
use std::collections::BTreeMap;
use std::time::Duration;

/// Input types that never take part in constraint validation
const NON_VALIDATING_TYPES: &[&str] = &["hidden", "submit", "reset", "button", "image"];

/// Input types whose length and pattern constraints apply
const TEXT_LIKE_TYPES: &[&str] = &["text", "search", "url", "tel", "email", "password"];

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Current value of a form control
    value: Option<String>,
    detached: bool,
}

/// Mutable element tree backing a [`MemoryDocument`].
///
/// Page-side reactions receive `&mut Dom` so they can flag fields, toggle
/// classes and write error messages the way page scripts would.
#[derive(Debug, Clone, Default)]
pub struct Dom {
    nodes: Vec<Node>,
    root: usize,
    invalid_styling: bool,
}

/// A page-side listener body
pub type Reaction = Box<dyn FnMut(&mut Dom, ElementId) -> Result<()> + Send>;

struct Listener {
    target: ElementId,
    event: DomEvent,
    reaction: Reaction,
}

/// An in-process [`LiveDocument`] built from HTML
pub struct MemoryDocument {
    dom: Dom,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &self.dom.nodes.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl MemoryDocument {
    /// Parse a full HTML document
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut dom = Dom::default();
        dom.root = dom.import(parsed.root_element(), None);
        dom.invalid_styling = dom.declares_invalid_styling();
        dom.seed_values();
        Self { dom, listeners: Vec::new() }
    }

    /// Register a page-side reaction to `event` on the element with `id`
    pub fn on<F>(&mut self, id: &str, event: DomEvent, reaction: F) -> Result<()>
    where
        F: FnMut(&mut Dom, ElementId) -> Result<()> + Send + 'static,
    {
        let target = self
            .dom
            .element_by_id(id)
            .ok_or_else(|| GradeError::Document(format!("no element with id '{}'", id)))?;
        self.listeners.push(Listener {
            target,
            event,
            reaction: Box::new(reaction),
        });
        Ok(())
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }
}

impl Dom {
    /// Copy a parsed subtree into the arena, in document order
    fn import(&mut self, element: ElementRef<'_>, parent: Option<usize>) -> usize {
        let first = self.nodes.len();
        let mut stack = vec![(*element, parent)];
        while let Some((node, parent)) = stack.pop() {
            match node.value() {
                HtmlNode::Element(el) => {
                    let attrs = el
                        .attrs()
                        .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
                        .collect();
                    let index = self.push(
                        NodeData::Element {
                            tag: el.name().to_ascii_lowercase(),
                            attrs,
                        },
                        parent,
                    );
                    stack.extend(node.children().rev().map(|child| (child, Some(index))));
                }
                HtmlNode::Text(text) => {
                    self.push(NodeData::Text(text.to_string()), parent);
                }
                _ => {}
            }
        }
        first
    }

    fn push(&mut self, data: NodeData, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            data,
            parent,
            children: Vec::new(),
            value: None,
            detached: false,
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(index);
        }
        index
    }

    fn declares_invalid_styling(&self) -> bool {
        self.all_elements()
            .into_iter()
            .filter(|&i| self.tag(i) == Some("style"))
            .any(|i| {
                let css = self.text_of(i);
                css.contains(":invalid") || css.contains("[aria-invalid")
            })
    }

    fn seed_values(&mut self) {
        for index in self.all_elements() {
            let seeded = match self.tag(index) {
                Some("input") => Some(self.attr(index, "value").unwrap_or_default().to_string()),
                Some("textarea") => Some(self.text_of(index)),
                Some("select") => Some(self.selected_option_value(index)),
                _ => None,
            };
            self.nodes[index].value = seeded;
        }
    }

    fn selected_option_value(&self, select: usize) -> String {
        let options: Vec<usize> = self
            .descendants_of(select)
            .into_iter()
            .filter(|&i| self.tag(i) == Some("option"))
            .collect();
        let chosen = options
            .iter()
            .copied()
            .find(|&i| self.attr(i, "selected").is_some())
            .or_else(|| options.first().copied());
        match chosen {
            Some(option) => self
                .attr(option, "value")
                .map(String::from)
                .unwrap_or_else(|| self.text_of(option).trim().to_string()),
            None => String::new(),
        }
    }

    fn node(&self, element: ElementId) -> Result<&Node> {
        match self.nodes.get(element.0) {
            Some(node) if !node.detached && matches!(node.data, NodeData::Element { .. }) => Ok(node),
            _ => Err(GradeError::StaleElement(element)),
        }
    }

    fn node_mut(&mut self, element: ElementId) -> Result<&mut Node> {
        match self.nodes.get_mut(element.0) {
            Some(node) if !node.detached && matches!(node.data, NodeData::Element { .. }) => Ok(node),
            _ => Err(GradeError::StaleElement(element)),
        }
    }

    fn tag(&self, index: usize) -> Option<&str> {
        match &self.nodes.get(index)?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    fn attr(&self, index: usize, name: &str) -> Option<&str> {
        match &self.nodes.get(index)?.data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    fn text_of(&self, index: usize) -> String {
        let mut out = String::new();
        self.collect_text(index, &mut out);
        out
    }

    fn collect_text(&self, index: usize, out: &mut String) {
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            match &self.nodes[i].data {
                NodeData::Text(text) => out.push_str(text),
                NodeData::Element { .. } => stack.extend(self.nodes[i].children.iter().rev().copied()),
            }
        }
    }

    fn descendants_of(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[index].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            if self.tag(i).is_some() && !self.nodes[i].detached {
                out.push(i);
                stack.extend(self.nodes[i].children.iter().rev().copied());
            }
        }
        out
    }

    fn all_elements(&self) -> Vec<usize> {
        let mut all = vec![self.root];
        all.extend(self.descendants_of(self.root));
        all
    }

    /// Element carrying the given `id` attribute
    pub fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.all_elements()
            .into_iter()
            .find(|&i| self.attr(i, "id") == Some(id))
            .map(ElementId)
    }

    pub fn attribute(&self, element: ElementId, name: &str) -> Result<Option<String>> {
        self.node(element)?;
        Ok(self.attr(element.0, name).map(String::from))
    }

    pub fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) -> Result<()> {
        if let NodeData::Element { attrs, .. } = &mut self.node_mut(element)?.data {
            attrs.insert(name.to_ascii_lowercase(), value.to_string());
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, element: ElementId, name: &str) -> Result<()> {
        if let NodeData::Element { attrs, .. } = &mut self.node_mut(element)?.data {
            attrs.remove(name);
        }
        Ok(())
    }

    pub fn classes(&self, element: ElementId) -> Result<Vec<String>> {
        self.node(element)?;
        Ok(self
            .attr(element.0, "class")
            .map(|c| c.split_whitespace().map(String::from).collect())
            .unwrap_or_default())
    }

    pub fn add_class(&mut self, element: ElementId, class: &str) -> Result<()> {
        let mut classes = self.classes(element)?;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        self.set_attribute(element, "class", &classes.join(" "))
    }

    pub fn remove_class(&mut self, element: ElementId, class: &str) -> Result<()> {
        let classes: Vec<String> = self
            .classes(element)?
            .into_iter()
            .filter(|c| c != class)
            .collect();
        self.set_attribute(element, "class", &classes.join(" "))
    }

    pub fn text(&self, element: ElementId) -> Result<String> {
        self.node(element)?;
        Ok(self.text_of(element.0))
    }

    /// Replace the element's children with a single text node
    pub fn set_text(&mut self, element: ElementId, text: &str) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(element)?.children);
        for child in children {
            self.detach(child);
        }
        self.push(NodeData::Text(text.to_string()), Some(element.0));
        Ok(())
    }

    /// Append a new element under `parent` and return its handle
    pub fn append_element(
        &mut self,
        parent: ElementId,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<ElementId> {
        self.node(parent)?;
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        let index = self.push(
            NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
            },
            Some(parent.0),
        );
        if !text.is_empty() {
            self.push(NodeData::Text(text.to_string()), Some(index));
        }
        Ok(ElementId(index))
    }

    fn detach(&mut self, index: usize) {
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            self.nodes[i].detached = true;
            stack.extend(self.nodes[i].children.iter().copied());
        }
    }

    pub fn value(&self, element: ElementId) -> Result<String> {
        let node = self.node(element)?;
        node.value
            .clone()
            .ok_or_else(|| GradeError::Document(format!("element {} is not a form control", element)))
    }

    pub fn set_value(&mut self, element: ElementId, value: &str) -> Result<()> {
        let input_type = self.input_type(element.0);
        let sanitized = sanitize_value(&input_type, value);
        let node = self.node_mut(element)?;
        if node.value.is_none() {
            return Err(GradeError::Document(format!(
                "element {} is not a form control",
                element
            )));
        }
        node.value = Some(sanitized);
        Ok(())
    }

    fn input_type(&self, index: usize) -> String {
        match self.tag(index) {
            Some("input") => self
                .attr(index, "type")
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string()),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    /// HTML constraint validation of one control
    pub fn validity(&self, element: ElementId) -> Result<ValidityState> {
        let node = self.node(element)?;
        let index = element.0;
        let Some(value) = node.value.clone() else {
            return Ok(ValidityState::valid());
        };
        if self.attr(index, "disabled").is_some() {
            return Ok(ValidityState::valid());
        }

        let kind = self.input_type(index);
        if NON_VALIDATING_TYPES.contains(&kind.as_str()) {
            return Ok(ValidityState::valid());
        }

        let mut validity = ValidityState::default();
        let required = self.attr(index, "required").is_some();
        let readonly = self.attr(index, "readonly").is_some();

        if required && !readonly {
            validity.value_missing = match kind.as_str() {
                "checkbox" | "radio" => self.attr(index, "checked").is_none(),
                _ => value.is_empty(),
            };
        }

        if !value.is_empty() {
            match kind.as_str() {
                "email" => validity.type_mismatch = !is_simple_email(&value),
                "url" => validity.type_mismatch = !is_url_like(&value),
                _ => {}
            }

            if TEXT_LIKE_TYPES.contains(&kind.as_str()) || kind == "textarea" {
                let len = value.chars().count() as i64;
                if let Some(min) = self.int_attr(index, "minlength") {
                    validity.too_short = min >= 0 && len < min;
                }
                if let Some(max) = self.int_attr(index, "maxlength") {
                    validity.too_long = max >= 0 && len > max;
                }
            }

            if TEXT_LIKE_TYPES.contains(&kind.as_str()) {
                if let Some(pattern) = self.attr(index, "pattern").filter(|p| !p.is_empty()) {
                    // Browsers ignore patterns that fail to compile
                    if let Ok(re) = Regex::new(&format!("^(?:{})$", pattern)) {
                        validity.pattern_mismatch = !re.is_match(&value);
                    }
                }
            }

            match kind.as_str() {
                "number" | "range" => self.check_numeric_range(index, &value, &mut validity),
                "date" | "time" => self.check_ordered_range(index, &value, &mut validity),
                _ => {}
            }
        }

        validity.valid = validity.reasons().is_empty();
        validity.validation_message = self.validation_message(index, &kind, &validity);
        Ok(validity)
    }

    fn int_attr(&self, index: usize, name: &str) -> Option<i64> {
        self.attr(index, name).and_then(|v| v.trim().parse().ok())
    }

    fn float_attr(&self, index: usize, name: &str) -> Option<f64> {
        self.attr(index, name)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    fn check_numeric_range(&self, index: usize, value: &str, validity: &mut ValidityState) {
        let Some(number) = value.trim().parse::<f64>().ok().filter(|v| v.is_finite()) else {
            return;
        };
        let min = self.float_attr(index, "min");
        if let Some(min) = min {
            validity.range_underflow = number < min;
        }
        if let Some(max) = self.float_attr(index, "max") {
            validity.range_overflow = number > max;
        }
        let step_attr = self.attr(index, "step").unwrap_or("");
        if !step_attr.eq_ignore_ascii_case("any") {
            let step = step_attr
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(1.0);
            let ratio = (number - min.unwrap_or(0.0)) / step;
            validity.step_mismatch = (ratio - ratio.round()).abs() > 1e-7;
        }
    }

    /// Date and time values in canonical form compare lexically
    fn check_ordered_range(&self, index: usize, value: &str, validity: &mut ValidityState) {
        if let Some(min) = self.attr(index, "min").filter(|m| !m.is_empty()) {
            validity.range_underflow = value < min;
        }
        if let Some(max) = self.attr(index, "max").filter(|m| !m.is_empty()) {
            validity.range_overflow = value > max;
        }
    }

    fn validation_message(&self, index: usize, kind: &str, validity: &ValidityState) -> String {
        if validity.value_missing {
            return match kind {
                "checkbox" => "Please check this box if you want to proceed.".to_string(),
                "select" => "Please select an item in the list.".to_string(),
                _ => "Please fill out this field.".to_string(),
            };
        }
        if validity.type_mismatch {
            return match kind {
                "email" => "Please enter an email address.".to_string(),
                _ => "Please enter a URL.".to_string(),
            };
        }
        if validity.pattern_mismatch {
            return "Please match the requested format.".to_string();
        }
        if validity.too_long {
            let max = self.attr(index, "maxlength").unwrap_or_default();
            return format!("Please shorten this text to {} characters or less.", max);
        }
        if validity.too_short {
            let min = self.attr(index, "minlength").unwrap_or_default();
            return format!("Please lengthen this text to {} characters or more.", min);
        }
        if validity.range_underflow {
            let min = self.attr(index, "min").unwrap_or_default();
            return format!("Value must be greater than or equal to {}.", min);
        }
        if validity.range_overflow {
            let max = self.attr(index, "max").unwrap_or_default();
            return format!("Value must be less than or equal to {}.", max);
        }
        if validity.step_mismatch {
            return "Please enter a valid value.".to_string();
        }
        String::new()
    }
}

/// Value sanitization applied by browsers when a script writes a value
fn sanitize_value(input_type: &str, raw: &str) -> String {
    match input_type {
        "number" | "range" => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => raw.trim().to_string(),
            _ => String::new(),
        },
        "date" => if is_valid_date(raw) { raw.to_string() } else { String::new() },
        "time" => if is_valid_time(raw) { raw.to_string() } else { String::new() },
        "email" | "url" => raw.trim().replace(['\r', '\n'], ""),
        "tel" | "text" | "search" | "password" => raw.replace(['\r', '\n'], ""),
        _ => raw.to_string(),
    }
}

fn is_valid_date(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() != 3 || parts[0].len() < 4 || parts[1].len() != 2 || parts[2].len() != 2 {
        return false;
    }
    let (Ok(year), Ok(month), Ok(day)) = (
        parts[0].parse::<u32>(),
        parts[1].parse::<u32>(),
        parts[2].parse::<u32>(),
    ) else {
        return false;
    };
    let days_in_month = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => return false,
    };
    year > 0 && (1..=days_in_month).contains(&day)
}

fn is_valid_time(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.len() < 2) {
        return false;
    }
    let hour = parts[0].parse::<u32>().ok().filter(|h| *h < 24);
    let minute = parts[1].parse::<u32>().ok().filter(|m| *m < 60);
    let second_ok = parts
        .get(2)
        .map(|s| s.parse::<f64>().map(|v| (0.0..60.0).contains(&v)).unwrap_or(false))
        .unwrap_or(true);
    hour.is_some() && minute.is_some() && second_ok
}

fn is_simple_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c));
    let domain_ok = !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    local_ok && domain_ok
}

fn is_url_like(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };
    let scheme_ok = scheme
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c));
    if !scheme_ok {
        return false;
    }
    match rest.strip_prefix("//") {
        Some(authority) => !authority.split('/').next().unwrap_or("").is_empty(),
        None => !rest.is_empty(),
    }
}

impl LiveDocument for MemoryDocument {
    fn locate_scope(&self, scope: &FormScope) -> Result<Option<ElementId>> {
        let dom = &self.dom;
        match scope {
            FormScope::Page => Ok(dom
                .all_elements()
                .into_iter()
                .find(|&i| dom.tag(i) == Some("body"))
                .or(Some(dom.root))
                .map(ElementId)),
            FormScope::Form(handle) => {
                let forms: Vec<usize> = dom
                    .all_elements()
                    .into_iter()
                    .filter(|&i| dom.tag(i) == Some("form"))
                    .collect();
                if let Some(id) = &handle.id {
                    if let Some(found) = forms.iter().copied().find(|&i| dom.attr(i, "id") == Some(id)) {
                        return Ok(Some(ElementId(found)));
                    }
                }
                Ok(forms.get(handle.index).copied().map(ElementId))
            }
        }
    }

    fn element_by_id(&self, id: &str) -> Result<Option<ElementId>> {
        Ok(self.dom.element_by_id(id))
    }

    fn parent(&self, element: ElementId) -> Result<Option<ElementId>> {
        Ok(self.dom.node(element)?.parent.map(ElementId))
    }

    fn descendants(&self, element: ElementId) -> Result<Vec<ElementId>> {
        self.dom.node(element)?;
        Ok(self.dom.descendants_of(element.0).into_iter().map(ElementId).collect())
    }

    fn elements_with_attribute(&self, name: &str) -> Result<Vec<ElementId>> {
        Ok(self
            .dom
            .all_elements()
            .into_iter()
            .filter(|&i| self.dom.attr(i, name).is_some())
            .map(ElementId)
            .collect())
    }

    fn tag_name(&self, element: ElementId) -> Result<String> {
        self.dom.node(element)?;
        Ok(self.dom.tag(element.0).unwrap_or_default().to_string())
    }

    fn attribute(&self, element: ElementId, name: &str) -> Result<Option<String>> {
        self.dom.attribute(element, name)
    }

    fn class_list(&self, element: ElementId) -> Result<Vec<String>> {
        self.dom.classes(element)
    }

    fn text_content(&self, element: ElementId) -> Result<String> {
        self.dom.text(element)
    }

    fn value(&self, element: ElementId) -> Result<String> {
        self.dom.value(element)
    }

    fn set_value(&mut self, element: ElementId, value: &str) -> Result<()> {
        self.dom.set_value(element, value)
    }

    fn dispatch(&mut self, element: ElementId, event: DomEvent) -> Result<()> {
        self.dom.node(element)?;
        for listener in self
            .listeners
            .iter_mut()
            .filter(|l| l.target == element && l.event == event)
        {
            (listener.reaction)(&mut self.dom, element)?;
        }
        Ok(())
    }

    fn validity(&self, element: ElementId) -> Result<ValidityState> {
        self.dom.validity(element)
    }

    fn matches_invalid_state(&self, element: ElementId) -> Result<bool> {
        if !self.dom.invalid_styling {
            return Ok(false);
        }
        let flagged = self.dom.attr(element.0, "aria-invalid") == Some("true");
        Ok(flagged || !self.dom.validity(element)?.valid)
    }

    fn settle(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
