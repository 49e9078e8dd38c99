//! One pass over a selected set of catalog indices.
//!
//! Per item: select → (specialized | fetch → cascade | fallback table) →
//! update catalog item → update ledger → persist both. State is saved before
//! the next index is touched, so an interrupted pass loses at most the item
//! in flight and a restart never refetches a completed index.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::catalog::{Catalog, ScrapeStatus};
use crate::checkpoint::Checkpointer;
use crate::error::PersistenceError;
use crate::extract::{self, Extracted};
use crate::fallback::{DomainFallbackTable, FallbackMatch};
use crate::fetch::PageFetcher;
use crate::ledger::ProgressLedger;
use crate::specialized::SpecializedExtractors;
use crate::store::StateStore;

pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// Every index not yet completed; fetch and run the cascade.
    Primary,
    /// Errored indices; fetch again.
    Retry,
    /// Errored indices; specialized extractors, then the domain table.
    Fallback,
    /// Errored indices a specialized extractor recognises.
    Specialized,
    /// Errored indices; flag what is left for a human.
    Manual,
}

impl PassMode {
    pub fn label(&self) -> &'static str {
        match self {
            PassMode::Primary => "scrape",
            PassMode::Retry => "retry",
            PassMode::Fallback => "fallback",
            PassMode::Specialized => "specialized",
            PassMode::Manual => "manual",
        }
    }

    fn selects_errored(&self) -> bool {
        !matches!(self, PassMode::Primary)
    }
}

/// Index window: indices below `start` are ignored, at most `limit` are
/// processed (all remaining when `None`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    pub start: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub batch_size: usize,
    pub delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub mode: PassMode,
    pub selected: usize,
    /// Image and/or price recorded; index completed.
    pub succeeded: usize,
    /// Nothing found but resolved for good (`no-image`, `unavailable`).
    pub resolved_empty: usize,
    /// Left in `errors` for a later pass, with a `skipped` entry.
    pub deferred: usize,
    /// Fetch or HTTP failure recorded in `errors`.
    pub failed: usize,
    pub fetches: usize,
    pub checkpoint_failures: usize,
}

impl PassSummary {
    fn new(mode: PassMode, selected: usize) -> Self {
        PassSummary {
            mode,
            selected,
            succeeded: 0,
            resolved_empty: 0,
            deferred: 0,
            failed: 0,
            fetches: 0,
            checkpoint_failures: 0,
        }
    }

    pub fn print(&self) {
        println!(
            "{}: {} selected, {} succeeded, {} resolved without image, {} skipped, {} errors.",
            self.mode.label(),
            self.selected,
            self.succeeded,
            self.resolved_empty,
            self.deferred,
            self.failed,
        );
        if self.checkpoint_failures > 0 {
            println!("{} checkpoint(s) failed.", self.checkpoint_failures);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemOutcome {
    Success {
        image_url: Option<String>,
        price: Option<String>,
        status: ScrapeStatus,
        via: &'static str,
    },
    Resolved {
        status: ScrapeStatus,
    },
    Deferred {
        status: Option<ScrapeStatus>,
        reason: &'static str,
    },
    Failed {
        reason: String,
    },
}

/// Enforces the delay between consecutive fetches. Nothing is waited before
/// the first fetch or after the last one.
struct Pacer {
    delay: Duration,
    fetches: usize,
}

impl Pacer {
    async fn before_fetch(&mut self) {
        if self.fetches > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.fetches += 1;
    }
}

/// Checkpoint bookkeeping: indices processed since the last checkpoint.
struct Batch {
    size: usize,
    first: Option<usize>,
    last: usize,
    count: usize,
}

impl Batch {
    fn push(&mut self, index: usize) -> bool {
        self.first.get_or_insert(index);
        self.last = index;
        self.count += 1;
        self.count >= self.size
    }

    fn take_description(&mut self, mode: PassMode) -> Option<String> {
        let first = self.first.take()?;
        let description = format!(
            "Enriched items {}-{} ({} items, {} pass)",
            first,
            self.last,
            self.count,
            mode.label()
        );
        self.count = 0;
        Some(description)
    }
}

pub struct EnrichmentRunner<'a, F, S, C> {
    fetcher: &'a F,
    store: &'a S,
    checkpointer: &'a C,
    specialized: SpecializedExtractors,
    fallback: DomainFallbackTable,
    options: RunOptions,
}

impl<'a, F, S, C> EnrichmentRunner<'a, F, S, C>
where
    F: PageFetcher,
    S: StateStore,
    C: Checkpointer,
{
    pub fn new(fetcher: &'a F, store: &'a S, checkpointer: &'a C, options: RunOptions) -> Self {
        EnrichmentRunner {
            fetcher,
            store,
            checkpointer,
            specialized: SpecializedExtractors::default(),
            fallback: DomainFallbackTable::default(),
            options,
        }
    }

    /// Indices this pass will visit, in processing order. Completed indices
    /// are never selected, whatever the mode.
    pub fn select(
        &self,
        mode: PassMode,
        catalog: &Catalog,
        ledger: &ProgressLedger,
        selection: Selection,
    ) -> Vec<usize> {
        let candidates: Vec<usize> = if mode.selects_errored() {
            ledger
                .error_indices()
                .into_iter()
                .filter(|&i| i >= selection.start)
                .filter(|&i| match catalog.get(i) {
                    Some(item) => {
                        mode != PassMode::Specialized || self.specialized.matches(&item.url)
                    }
                    None => {
                        warn!("Ledger error for index {} outside catalog, ignoring", i);
                        false
                    }
                })
                .collect()
        } else {
            (selection.start..catalog.len()).collect()
        };

        candidates
            .into_iter()
            .filter(|&i| !ledger.is_done(i))
            .take(selection.limit.unwrap_or(usize::MAX))
            .collect()
    }

    pub async fn run(
        &self,
        mode: PassMode,
        catalog: &mut Catalog,
        ledger: &mut ProgressLedger,
        selection: Selection,
    ) -> Result<PassSummary, PersistenceError> {
        let indices = self.select(mode, catalog, ledger, selection);
        let mut summary = PassSummary::new(mode, indices.len());
        if indices.is_empty() {
            return Ok(summary);
        }
        info!("{} pass over {} items", mode.label(), indices.len());

        let pb = ProgressBar::new(indices.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }

        let mut pacer = Pacer {
            delay: self.options.delay,
            fetches: 0,
        };
        let mut batch = Batch {
            size: self.options.batch_size.max(1),
            first: None,
            last: 0,
            count: 0,
        };

        for index in indices {
            if ledger.is_done(index) {
                continue;
            }
            let Some(item) = catalog.get(index) else {
                continue;
            };
            let (name, url) = (item.name.clone(), item.url.clone());
            info!("[{}] {}", index, name);

            let outcome = self.process(mode, &url, &mut pacer).await;
            self.apply(index, &name, outcome, catalog, ledger, &mut summary);

            self.store.save_catalog(catalog)?;
            ledger.persist(self.store)?;
            pb.inc(1);

            if batch.push(index) {
                self.checkpoint(&mut batch, mode, &mut summary).await;
            }
        }
        self.checkpoint(&mut batch, mode, &mut summary).await;
        summary.fetches = pacer.fetches;

        pb.finish_and_clear();
        info!(
            "{} pass done: {} ok, {} empty, {} skipped, {} errors",
            mode.label(),
            summary.succeeded,
            summary.resolved_empty,
            summary.deferred,
            summary.failed
        );
        Ok(summary)
    }

    async fn checkpoint(&self, batch: &mut Batch, mode: PassMode, summary: &mut PassSummary) {
        let Some(description) = batch.take_description(mode) else {
            return;
        };
        if let Err(e) = self.checkpointer.checkpoint(&description).await {
            warn!("{} ({}), continuing", e, description);
            summary.checkpoint_failures += 1;
        }
    }

    async fn process(&self, mode: PassMode, url: &str, pacer: &mut Pacer) -> ItemOutcome {
        match mode {
            PassMode::Primary => match self.scrape(url, pacer).await {
                Ok((found, via)) if !found.is_empty() => success(found, ScrapeStatus::Scraped, via),
                Ok(_) => ItemOutcome::Resolved {
                    status: ScrapeStatus::NoImage,
                },
                Err(reason) => ItemOutcome::Failed { reason },
            },
            PassMode::Retry => match self.scrape(url, pacer).await {
                Ok((found, via)) if !found.is_empty() => success(found, ScrapeStatus::Scraped, via),
                Ok(_) => ItemOutcome::Deferred {
                    status: None,
                    reason: "No image found",
                },
                Err(reason) => ItemOutcome::Failed { reason },
            },
            PassMode::Fallback => {
                if let Some(outcome) = self.specialized_success(url, ScrapeStatus::Fallback) {
                    return outcome;
                }
                match self.fallback.lookup(url) {
                    Some(FallbackMatch::Image(image_url)) => ItemOutcome::Success {
                        image_url: Some(image_url),
                        price: None,
                        status: ScrapeStatus::Fallback,
                        via: "domain-fallback",
                    },
                    Some(FallbackMatch::Unsupported) => ItemOutcome::Resolved {
                        status: ScrapeStatus::Unavailable,
                    },
                    None => ItemOutcome::Deferred {
                        status: None,
                        reason: "No fallback rule",
                    },
                }
            }
            PassMode::Specialized => self
                .specialized_success(url, ScrapeStatus::Fallback)
                .unwrap_or(ItemOutcome::Deferred {
                    status: None,
                    reason: "No specialized extractor",
                }),
            PassMode::Manual => self
                .specialized_success(url, ScrapeStatus::Manual)
                .unwrap_or(ItemOutcome::Deferred {
                    status: Some(ScrapeStatus::Manual),
                    reason: "Flagged for manual review",
                }),
        }
    }

    fn specialized_success(&self, url: &str, status: ScrapeStatus) -> Option<ItemOutcome> {
        let (via, image_url) = self.specialized.extract_image(url)?;
        Some(ItemOutcome::Success {
            image_url: Some(image_url),
            price: None,
            status,
            via,
        })
    }

    /// Specialized extractors first; otherwise fetch and run the cascade.
    /// `Err` carries the ledger reason.
    async fn scrape(
        &self,
        url: &str,
        pacer: &mut Pacer,
    ) -> Result<(Extracted, &'static str), String> {
        if let Some((via, image_url)) = self.specialized.extract_image(url) {
            let found = Extracted {
                image_url: Some(image_url),
                price: None,
            };
            return Ok((found, via));
        }

        pacer.before_fetch().await;
        let page = self.fetcher.fetch(url).await.map_err(|e| e.to_string())?;
        if page.status != 200 {
            return Err(format!("HTTP {}", page.status));
        }
        Ok((extract::extract(&page.body, url), "cascade"))
    }

    fn apply(
        &self,
        index: usize,
        name: &str,
        outcome: ItemOutcome,
        catalog: &mut Catalog,
        ledger: &mut ProgressLedger,
        summary: &mut PassSummary,
    ) {
        let Some(item) = catalog.get_mut(index) else {
            return;
        };
        match outcome {
            ItemOutcome::Success {
                image_url,
                price,
                status,
                via,
            } => {
                info!(
                    "  image ({}): {}, price: {}",
                    via,
                    image_url.as_deref().unwrap_or("none"),
                    price.as_deref().unwrap_or("none")
                );
                if image_url.is_some() {
                    item.image_url = image_url;
                }
                if price.is_some() {
                    item.current_price = price;
                }
                item.mark(status);
                ledger.record_success(index);
                summary.succeeded += 1;
            }
            ItemOutcome::Resolved { status } => {
                info!("  nothing found, marked {}", status.as_str());
                item.mark(status);
                ledger.record_success(index);
                summary.resolved_empty += 1;
            }
            ItemOutcome::Deferred { status, reason } => {
                info!("  skipped: {}", reason);
                if let Some(status) = status {
                    item.mark(status);
                }
                ledger.record_skip(index, name, reason);
                summary.deferred += 1;
            }
            ItemOutcome::Failed { reason } => {
                warn!("  failed: {}", reason);
                item.scrape_status = ScrapeStatus::Error;
                ledger.record_error(index, name, &reason);
                summary.failed += 1;
            }
        }
    }
}

fn success(found: Extracted, status: ScrapeStatus, via: &'static str) -> ItemOutcome {
    ItemOutcome::Success {
        image_url: found.image_url,
        price: found.price,
        status,
        via,
    }
}
