// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessgrade - accessibility quality scoring for web pages
//!
//! Accessgrade measures how well a page supports users with disabilities
//! and folds the measurements into a single graded score.
//!
//! ## Error support
//!
//! Forms are probed the way a user would meet them: invalid values are
//! typed into every constrained field and the page's reaction is read
//! from four channels (native validity, ARIA, nearby error text, visual
//! error state). That dynamic result is blended with a static reading of
//! the markup.
//!
//! ## Analyzers
//!
//! - **Keyboard** (2.1.1): interactive elements reachable by keyboard
//! - **Structured navigation** (1.3.1): heading outline without skipped levels
//! - **Instruction clarity** (3.3.2): short, plain, jargon-free instructions
//! - **Input assistance** (1.3.5/3.3.5): autocomplete and hints on form fields
//! - **Localization** (3.1.1/3.1.2): languages the page is offered in
//!
//! Alt text, contrast and media metrics are accepted as external inputs.
//!
//! ## Scoring
//!
//! Sub-metrics fold into perceptibility, operability and understandability,
//! which fold into a main score that is blended with localization. The
//! final score is classified on a golden-ratio quality ladder.

pub mod analyzers;
pub mod config;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod page;
pub mod probe;
pub mod recommend;
pub mod report;
pub mod scanner;
pub mod scoring;

pub use error::{GradeError, Result};
pub use evaluator::{Evaluation, Evaluator};
