// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling per-key run history.
//!
//! Each classification key has a bounded window of [`RunSummary`] entries, oldest first. Every
//! pipeline invocation appends one entry per key it saw, evicting the oldest entries once the
//! window is full. The most recent few entries are rendered as a trend block in that key's
//! report.
//!
//! Whole-run totals are recorded the same way under [`HistoryKey::overall`].
//!
//! Stores are not safe against concurrent invocations updating the same key unless the
//! implementation says otherwise. [`FileHistoryStore`] serializes writers with a per-key lock
//! file.

mod file;
mod memory;

pub use file::*;
pub use memory::*;

use crate::{
    classify::{ClassificationKey, OutcomeTotals},
    errors::HistoryError,
};
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The default maximum number of entries retained per key.
pub const DEFAULT_MAX_ENTRIES: usize = 20;

/// The default number of entries shown in a report's trend block.
pub const DEFAULT_RECENT_ENTRIES: usize = 3;

/// A store of history windows, keyed by [`HistoryKey`].
pub trait HistoryStore {
    /// Appends `summary` to the window for `key`, evicting the oldest entries beyond the maximum
    /// window length, and persists the result.
    ///
    /// Returns the most recent entries of the updated window, oldest first.
    fn record(&self, key: &HistoryKey, summary: RunSummary) -> Result<Vec<RunSummary>, HistoryError>;

    /// Returns the full window for `key`.
    ///
    /// Missing, unreadable or corrupt history is returned as an empty window.
    fn read(&self, key: &HistoryKey) -> HistoryWindow;
}

/// Bounds applied by a history store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryOptions {
    /// The maximum number of entries retained per key.
    pub max_entries: usize,

    /// The number of entries returned by [`HistoryStore::record`].
    pub recent_entries: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            recent_entries: DEFAULT_RECENT_ENTRIES,
        }
    }
}

/// The key a history window is stored under.
///
/// Whole-run totals live outside the classification key namespace, so no classification key can
/// share a window with them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum HistoryKey {
    /// The window for a classification key.
    Classified(String),

    /// The window for whole-run totals.
    Overall,
}

/// Bytes kept as-is in file stems. Everything else, including `_`, `.` and `%`, is
/// percent-encoded, so distinct keys always get distinct file names.
const FILE_STEM_KEEP: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-');

impl HistoryKey {
    /// The file stem for whole-run totals. Encoded classification keys never contain `.`.
    const OVERALL_STEM: &'static str = ".overall";

    /// The key for whole-run totals.
    pub fn overall() -> Self {
        Self::Overall
    }

    /// Returns true if this is the key for whole-run totals.
    pub fn is_overall(&self) -> bool {
        matches!(self, Self::Overall)
    }

    /// Returns the classification key, or `None` for whole-run totals.
    pub fn classification_key(&self) -> Option<&str> {
        match self {
            Self::Classified(key) => Some(key),
            Self::Overall => None,
        }
    }

    /// Returns a file name stem for this key.
    ///
    /// Classification keys are percent-encoded, keeping only ASCII alphanumerics and `-`. The
    /// encoding is reversible and never yields hidden files or path separators. The empty key is
    /// `%`, which no other key encodes to.
    pub fn file_stem(&self) -> String {
        match self {
            Self::Classified(key) if key.is_empty() => "%".to_owned(),
            Self::Classified(key) => utf8_percent_encode(key, FILE_STEM_KEEP).to_string(),
            Self::Overall => Self::OVERALL_STEM.to_owned(),
        }
    }
}

impl From<&ClassificationKey> for HistoryKey {
    fn from(key: &ClassificationKey) -> Self {
        Self::Classified(key.as_str().to_owned())
    }
}

impl From<Option<String>> for HistoryKey {
    fn from(key: Option<String>) -> Self {
        key.map_or(Self::Overall, Self::Classified)
    }
}

impl From<HistoryKey> for Option<String> {
    fn from(key: HistoryKey) -> Self {
        match key {
            HistoryKey::Classified(key) => Some(key),
            HistoryKey::Overall => None,
        }
    }
}

impl fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classified(key) => f.write_str(key),
            Self::Overall => f.write_str("overall"),
        }
    }
}

/// Outcome counts for one key in one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// When the summary was recorded.
    pub timestamp: DateTime<Utc>,

    /// The number of passed tests.
    pub passed: usize,

    /// The number of failed tests.
    pub failed: usize,

    /// The total number of tests, including skipped ones.
    pub total: usize,
}

impl RunSummary {
    /// Creates a summary from outcome totals.
    pub fn from_totals(timestamp: DateTime<Utc>, totals: &OutcomeTotals) -> Self {
        Self {
            timestamp,
            passed: totals.passed,
            failed: totals.failed,
            total: totals.total,
        }
    }
}

/// A bounded, time-ordered sequence of run summaries, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryWindow {
    entries: Vec<RunSummary>,
}

impl HistoryWindow {
    /// Creates a window from entries, oldest first.
    pub fn new(entries: Vec<RunSummary>) -> Self {
        Self { entries }
    }

    /// Returns all entries, oldest first.
    pub fn entries(&self) -> &[RunSummary] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the window has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry, then evicts the oldest entries until at most `max_entries` remain.
    pub fn push_bounded(&mut self, summary: RunSummary, max_entries: usize) {
        self.entries.push(summary);
        if self.entries.len() > max_entries {
            let excess = self.entries.len() - max_entries;
            self.entries.drain(..excess);
        }
    }

    /// Returns the last `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> &[RunSummary] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    /// Returns trend statistics over the whole window.
    pub fn trend(&self) -> TrendStats {
        TrendStats::from_entries(&self.entries)
    }
}

/// Statistics derived from a sequence of run summaries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrendStats {
    /// The number of runs covered.
    pub runs: usize,

    /// The fraction of tests that passed across all runs, between 0 and 1.
    ///
    /// 0 if no tests ran.
    pub pass_rate: f64,

    /// The mean number of failures per run.
    ///
    /// 0 if there are no runs.
    pub average_failures: f64,
}

impl TrendStats {
    /// Computes statistics over the given entries.
    pub fn from_entries(entries: &[RunSummary]) -> Self {
        let (passed, failed, total) = entries.iter().fold((0, 0, 0), |(p, f, t), entry| {
            (p + entry.passed, f + entry.failed, t + entry.total)
        });

        let pass_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64
        };
        let average_failures = if entries.is_empty() {
            0.0
        } else {
            failed as f64 / entries.len() as f64
        };

        Self {
            runs: entries.len(),
            pass_rate,
            average_failures,
        }
    }

    /// Returns the pass rate as a percentage.
    pub fn pass_percent(&self) -> f64 {
        self.pass_rate * 100.0
    }
}
