// SPDX-License-Identifier: PMPL-1.0-or-later
//! Directory scanner for evaluating saved HTML pages in bulk.
//!
//! Walks directory trees, picks up HTML snapshots and evaluates each one
//! through an in-memory live document.

use crate::document::memory::MemoryDocument;
use crate::error::Result;
use crate::evaluator::{Evaluation, Evaluator};
use crate::page::PageData;
use crate::scoring::SubMetrics;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// File extensions to scan
const SCANNABLE_EXTENSIONS: &[&str] = &["html", "htm"];

/// One evaluated file of a batch scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedPage {
    pub path: PathBuf,
    pub evaluation: Evaluation,
}

/// Evaluate every HTML page under `dir`
pub fn scan_directory(dir: &Path, evaluator: &Evaluator) -> Result<Vec<ScannedPage>> {
    let exclude = &evaluator.config().exclude;
    let mut pages = Vec::new();

    info!("Scanning directory: {}", dir.display());

    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // Skip excluded directories, never the root itself
            if e.depth() > 0 && e.file_type().is_dir() {
                let name = e.file_name().to_str().unwrap_or("");
                return !exclude.iter().any(|x| x == name);
            }
            true
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_scannable(entry.path()) {
            continue;
        }

        match evaluate_file(entry.path(), evaluator, &SubMetrics::new()) {
            Ok(evaluation) => pages.push(ScannedPage {
                path: entry.path().to_path_buf(),
                evaluation,
            }),
            Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    info!("Evaluated {} page(s)", pages.len());
    Ok(pages)
}

/// Evaluate a single saved HTML page
pub fn evaluate_file(path: &Path, evaluator: &Evaluator, external: &SubMetrics) -> Result<Evaluation> {
    let html = std::fs::read_to_string(path)?;
    let url = format!("file://{}", path.display());
    let page = PageData::from_html(&url, &html);
    let mut document = MemoryDocument::parse(&html);
    Ok(evaluator.evaluate(&page, &mut document, external))
}

fn is_scannable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SCANNABLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
