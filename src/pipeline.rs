//! Row traversal and the page loop.

use crate::aggregate::{Aggregator, RunResult};
use crate::config::Config;
use crate::driver::Driver;
use crate::modal::{ModalManager, Stage};
use crate::row::RowMetaReader;
use crate::wait::{wait_until, PollPolicy};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vacancy_parser::Record;

/// Shared flag checked between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one row.
#[derive(Debug)]
pub enum RowOutcome {
    Extracted(Record),
    Failed { stage: Stage, error: Error },
}

impl RowOutcome {
    pub fn is_extracted(&self) -> bool {
        matches!(self, RowOutcome::Extracted(_))
    }
}

/// Where a traversal got to, kept across the error boundary.
#[derive(Debug, Clone, Copy)]
struct Progress {
    stage: Stage,
    overlay_requested: bool,
}

/// One harvest over the pages of a list.
///
/// Holds the driver by unique borrow, so no other traversal can touch the
/// page or its overlay while the pipeline runs.
pub struct Pipeline<'a, D: ?Sized> {
    driver: &'a D,
    config: &'a Config,
    cancel: CancelToken,
}

impl<'a, D: Driver + ?Sized> Pipeline<'a, D> {
    pub fn new(driver: &'a mut D, config: &'a Config) -> Self {
        Self {
            driver,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Use a token shared with whoever may cancel the run.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn modal(&self) -> ModalManager<'a, D> {
        ModalManager::new(self.driver, &self.config.selectors, &self.config.timing)
    }

    /// Open, verify, read and close the row at `index`.
    ///
    /// Errors never escape: they become a [`RowOutcome::Failed`] naming the
    /// stage that failed. If the overlay may have been opened it is closed.
    pub async fn process_row(&self, index: usize) -> RowOutcome {
        let mut progress = Progress {
            stage: Stage::ReadMeta,
            overlay_requested: false,
        };
        match self.traverse(index, &mut progress).await {
            Ok(record) => RowOutcome::Extracted(record),
            Err(error) => {
                warn!(row = index + 1, stage = %progress.stage, "row failed: {}", error);
                if progress.overlay_requested {
                    self.modal().close().await;
                }
                RowOutcome::Failed {
                    stage: progress.stage,
                    error,
                }
            }
        }
    }

    async fn traverse(&self, index: usize, progress: &mut Progress) -> Result<Record> {
        let modal = self.modal();

        progress.stage = Stage::ReadMeta;
        let row = RowMetaReader::new(self.driver, &self.config.selectors)
            .read(index)
            .await;

        progress.stage = Stage::OpenModal;
        let expected = row.expected_title.clone().ok_or_else(|| Error::ModalOpen {
            row: index + 1,
            reason: "row has no title to verify the overlay against".into(),
        })?;
        modal.prepare(index).await?;
        modal.open_menu(index).await?;
        modal.request_details(index).await?;
        progress.overlay_requested = true;
        modal.await_overlay(index).await?;

        progress.stage = Stage::AwaitContentMatch;
        let reads = modal.await_content_match(&expected).await?;
        debug!(row = index + 1, reads, "overlay shows {}", expected);

        progress.stage = Stage::ExtractFields;
        let record = modal
            .extract()
            .await?
            .with_row_meta(row.status_label, row.assignee_name);

        progress.stage = Stage::CloseModal;
        modal.close().await;

        Ok(record)
    }

    /// Walk every page until the list, the record cap or the page cap runs
    /// out. `total_hint` is the row count seen when the list first loaded.
    pub async fn run(&self, total_hint: usize) -> Result<RunResult> {
        let cap = self.config.extraction.record_cap();
        let max_pages = self.config.extraction.max_pages;
        let mut agg = Aggregator::new(total_hint);
        let mut cancelled = false;

        'pages: loop {
            let count = match self.driver.count(&self.config.selectors.rows).await {
                Ok(n) => n,
                Err(e) => {
                    warn!(page = agg.current_page(), "counting rows failed: {}", e);
                    0
                }
            };
            info!(page = agg.current_page(), rows = count, "processing page");
            if count == 0 {
                break;
            }

            for index in 0..count {
                if cap.is_some_and(|cap| agg.succeeded() >= cap) {
                    info!("record cap reached");
                    break 'pages;
                }
                if self.cancel.is_cancelled() {
                    warn!("harvest cancelled");
                    cancelled = true;
                    break 'pages;
                }

                agg.visit();
                info!(
                    "[{}/{}] page {} row {}",
                    agg.visited(),
                    agg.total_expected(),
                    agg.current_page(),
                    index + 1
                );
                let outcome = self.process_row(index).await;
                let extracted = outcome.is_extracted();
                agg.record(outcome);
                if extracted {
                    self.driver.pause(self.config.timing.row_delay_ms).await;
                }
            }

            if cap.is_some_and(|cap| agg.succeeded() >= cap) {
                info!("record cap reached");
                break;
            }
            if max_pages.is_some_and(|max| agg.current_page() >= max) {
                info!("page cap reached");
                break;
            }
            if !self.advance_page().await {
                info!("no more pages");
                break;
            }
            agg.next_page();
        }

        if cancelled && agg.succeeded() == 0 {
            return Err(Error::Cancelled);
        }
        agg.finish()
    }

    /// Click the next-page control and wait for rows. `false` means there is
    /// no next page.
    pub async fn advance_page(&self) -> bool {
        match self.try_advance().await {
            Ok(advanced) => advanced,
            Err(e) => {
                warn!("page change failed: {}", e);
                false
            }
        }
    }

    async fn try_advance(&self) -> Result<bool> {
        let timing = &self.config.timing;
        let first_row = self.config.selectors.row_at(0);
        for sel in &self.config.selectors.next_page {
            if !self.driver.exists(sel).await? {
                continue;
            }
            if self.driver.is_disabled(sel).await? {
                debug!("next control {} is disabled", sel);
                return Ok(false);
            }
            let before = self.driver.outer_html(&first_row).await?;
            if !self.driver.click(sel).await? {
                continue;
            }
            debug!("clicked next control {}", sel);
            self.driver.pause(timing.page_settle_ms).await;
            if !self
                .driver
                .wait_for_visible(&self.config.selectors.rows, timing.navigation_timeout_ms)
                .await?
            {
                return Ok(false);
            }
            return Ok(self.first_row_changed(&first_row, before).await);
        }
        Ok(false)
    }

    /// A next control that leaves the first row untouched did not turn the
    /// page; following it again would walk the same rows forever.
    async fn first_row_changed(&self, first_row: &str, before: Option<String>) -> bool {
        let policy = PollPolicy::within(self.config.timing.navigation_timeout_ms, 250);
        let before = before.as_deref();
        let poll = wait_until(policy, move |_| async move {
            let now = self.driver.outer_html(first_row).await?;
            Ok((now.as_deref() != before).then_some(()))
        })
        .await;
        if !poll.is_ready() {
            warn!("next control did not change the rows, treating this as the last page");
        }
        poll.is_ready()
    }
}
