// SPDX-License-Identifier: PMPL-1.0-or-later
//! Scenario-driven error-support probing.
//!
//! The probe writes deliberately invalid values into form fields of a live
//! document and reads back whether the page communicated the error through
//! any of four independent channels:
//!
//! - native constraint validation ([`signals::NativeSignal`])
//! - assistive semantics: `aria-invalid`, `aria-describedby`, `role="alert"`
//! - structural proximity: error-message elements near the field
//! - visual state: error classes and `:invalid` styling
//!
//! Layering, leaves first: [`signals`] collects one scenario, [`runner`]
//! folds the scenarios of one field, [`form`] discovers fields and folds
//! them into a form result.

pub mod form;
pub mod runner;
pub mod scenarios;
pub mod signals;

use crate::config::ProbeConfig;
use crate::document::ElementId;
use crate::error::{GradeError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// One testable input discovered in a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(skip)]
    pub element: ElementId,
    /// `#id`, `[name="..."]` or a positional selector
    pub selector: String,
    /// Declared input type, or the tag name for textarea/select
    pub field_type: String,
    pub required: bool,
    pub pattern: Option<String>,
    pub min_length: Option<u32>,
    /// Only bounded limits; the browser's unbounded sentinel is dropped
    pub max_length: Option<u32>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub step: Option<String>,
}

/// Outer bound on a dynamic analysis pass
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Self { started: Instant::now(), budget }
    }

    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    /// `Err(DeadlineExceeded)` once the budget is spent
    pub fn check(&self) -> Result<()> {
        if self.expired() {
            Err(GradeError::DeadlineExceeded(self.budget))
        } else {
            Ok(())
        }
    }
}

/// Knobs shared by every layer of the probe
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Blocking wait after the notifications of each scenario
    pub settle_delay: Duration,
    pub max_scenarios_per_field: usize,
    pub deadline: Option<Deadline>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            max_scenarios_per_field: 3,
            deadline: None,
        }
    }
}

impl ProbeOptions {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            max_scenarios_per_field: config.max_scenarios_per_field,
            deadline: None,
        }
    }

    /// Start the outer deadline clock now
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Deadline::start(budget));
        self
    }

    pub(crate) fn check_deadline(&self) -> Result<()> {
        match &self.deadline {
            Some(deadline) => deadline.check(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_expiry() {
        let spent = Deadline::start(Duration::ZERO);
        assert!(spent.expired());
        assert!(matches!(spent.check(), Err(GradeError::DeadlineExceeded(_))));

        let fresh = Deadline::start(Duration::from_secs(60));
        assert!(fresh.check().is_ok());
    }

    #[test]
    fn test_options_from_config() {
        let config = ProbeConfig {
            settle_delay_ms: 0,
            max_scenarios_per_field: 2,
            deadline_secs: 5,
        };
        let options = ProbeOptions::from_config(&config);
        assert_eq!(options.settle_delay, Duration::ZERO);
        assert_eq!(options.max_scenarios_per_field, 2);
        assert!(options.deadline.is_none());
        assert!(options.check_deadline().is_ok());
    }
}
