// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for accessgrade

use crate::document::ElementId;
use thiserror::Error;

/// Main error type for accessgrade
#[derive(Error, Debug)]
pub enum GradeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Element {0} is no longer attached to the document")]
    StaleElement(ElementId),

    #[error("Document operation failed: {0}")]
    Document(String),

    #[error("Dynamic analysis deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, GradeError>;
