use std::path::Path;

use serde::Serialize;

use crate::catalog::{Catalog, ScrapeStatus};
use crate::error::PersistenceError;
use crate::extract::normalize::bare_host;
use crate::ledger::ProgressLedger;
use crate::store::write_json_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    Video,
    Crowdfunding,
    AppStore,
    Other,
}

impl ReviewKind {
    pub fn classify(url: &str) -> Self {
        let host = bare_host(url).unwrap_or_default();
        match host.as_str() {
            h if h.contains("youtube.com") || h == "youtu.be" => ReviewKind::Video,
            h if h.contains("kickstarter.com") || h.contains("indiegogo.com") => {
                ReviewKind::Crowdfunding
            }
            h if h.contains("apps.apple.com") || h.contains("play.google.com") => {
                ReviewKind::AppStore
            }
            _ => ReviewKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    pub index: usize,
    pub name: String,
    pub url: String,
    pub kind: ReviewKind,
}

/// Errored indices that a manual pass flagged, in ledger order.
pub fn review_queue(catalog: &Catalog, ledger: &ProgressLedger) -> Vec<ReviewEntry> {
    ledger
        .errors()
        .iter()
        .filter_map(|e| catalog.get(e.index))
        .filter(|item| item.scrape_status == ScrapeStatus::Manual)
        .map(|item| ReviewEntry {
            index: item.index,
            name: item.name.clone(),
            url: item.url.clone(),
            kind: ReviewKind::classify(&item.url),
        })
        .collect()
}

pub fn write_review_queue(path: &Path, entries: &[ReviewEntry]) -> Result<(), PersistenceError> {
    write_json_atomic(path, entries, "review queue")
}

pub fn export_error_indices(
    path: &Path,
    ledger: &ProgressLedger,
) -> Result<usize, PersistenceError> {
    let indices = ledger.error_indices();
    write_json_atomic(path, &indices, "error indices")?;
    Ok(indices.len())
}
