//! Run totals.

use crate::pipeline::RowOutcome;
use crate::{Error, Result};
use std::collections::BTreeMap;
use vacancy_parser::Record;

/// Outcome of one harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub total_expected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub records: Vec<Record>,
    /// Last page visited, 1-based.
    pub current_page: u32,
}

impl RunResult {
    /// Records per status label.
    pub fn status_distribution(&self) -> BTreeMap<String, usize> {
        let mut dist = BTreeMap::new();
        for record in &self.records {
            *dist.entry(record.status_label.clone()).or_insert(0) += 1;
        }
        dist
    }

    /// Share of expected rows extracted, 0.0 when nothing was expected.
    pub fn success_rate(&self) -> f64 {
        if self.total_expected == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total_expected as f64
        }
    }

    /// Rounded percentage, e.g. `"67%"`.
    pub fn success_rate_label(&self) -> String {
        format!("{}%", (self.success_rate() * 100.0).round() as u64)
    }
}

/// Collects row outcomes into a [`RunResult`].
#[derive(Debug)]
pub struct Aggregator {
    total_hint: usize,
    visited: usize,
    failed: usize,
    records: Vec<Record>,
    current_page: u32,
}

impl Aggregator {
    pub fn new(total_hint: usize) -> Self {
        Self {
            total_hint,
            visited: 0,
            failed: 0,
            records: Vec::new(),
            current_page: 1,
        }
    }

    /// Count a row about to be processed.
    pub fn visit(&mut self) {
        self.visited += 1;
    }

    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Extracted(record) => self.records.push(record),
            RowOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn next_page(&mut self) {
        self.current_page += 1;
    }

    pub fn visited(&self) -> usize {
        self.visited
    }

    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// The first page's row count, raised to the rows visited so far.
    pub fn total_expected(&self) -> usize {
        self.total_hint.max(self.visited)
    }

    /// Final result; no record at all is an error.
    pub fn finish(self) -> Result<RunResult> {
        if self.records.is_empty() {
            return Err(Error::ExtractionExhausted {
                failed: self.failed,
            });
        }
        Ok(RunResult {
            total_expected: self.total_expected(),
            succeeded: self.records.len(),
            failed: self.failed,
            records: self.records,
            current_page: self.current_page,
        })
    }
}
