//! Date Range Filter: keeps rows whose date lies in an inclusive window.

use std::fmt;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::{
    data::{DateOrder, parse_naive_date},
    normalize::NormalizedDataset,
};

/// Inclusive `[start, end]` window. Always satisfies `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Builds a window, swapping the bounds when they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start > end {
            debug!("Date window {start} > {end}; swapping bounds");
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// The window spanning everything `dataset` contains, if anything.
    pub fn observed(dataset: &NormalizedDataset) -> Option<Self> {
        dataset
            .date_range()
            .map(|(start, end)| Self::new(start, end))
    }

    /// Resolves optional user bounds, defaulting each to the observed range.
    /// Returns `None` only when a bound is missing and the dataset is empty.
    pub fn resolve(
        dataset: &NormalizedDataset,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Option<Self> {
        let observed = dataset.date_range();
        let start = start.or(observed.map(|(lo, _)| lo))?;
        let end = end.or(observed.map(|(_, hi)| hi))?;
        Some(Self::new(start, end))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

pub fn parse_window_bound(value: &str, order: DateOrder) -> Result<NaiveDate> {
    parse_naive_date(value, order).map_err(|_| anyhow!("Invalid window date '{value}'"))
}

/// Returns the rows of `dataset` whose date falls inside `window`.
pub fn filter_by_window(dataset: &NormalizedDataset, window: &DateWindow) -> NormalizedDataset {
    let filtered = dataset.subset(|record| window.contains(record.date));
    debug!(
        "Date window {window} kept {} of {} row(s)",
        filtered.len(),
        dataset.len()
    );
    filtered
}
