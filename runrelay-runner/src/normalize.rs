// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of raw results into canonical test outcomes.

use crate::{
    classify::{ClassificationKey, ClassificationPattern},
    errors::NormalizeError,
};
use indexmap::IndexSet;
use robot_results::RawOutcome;
use serde::Serialize;
use std::fmt;

/// The canonical outcome of a test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was skipped.
    Skipped,
}

impl Outcome {
    /// Maps a raw status to an outcome.
    ///
    /// Both Robot Framework's short forms (`PASS`) and the results summary's long forms
    /// (`passed`) are accepted, in any case. Returns `None` for anything else.
    pub fn from_raw(status: &str) -> Option<Self> {
        const KNOWN: &[(&str, Outcome)] = &[
            ("pass", Outcome::Passed),
            ("passed", Outcome::Passed),
            ("fail", Outcome::Failed),
            ("failed", Outcome::Failed),
            ("skip", Outcome::Skipped),
            ("skipped", Outcome::Skipped),
        ];

        KNOWN
            .iter()
            .find(|(raw, _)| raw.eq_ignore_ascii_case(status))
            .map(|&(_, outcome)| outcome)
    }

    /// Returns the lowercase name used by the test-management service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns the capitalized name used in rendered reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A canonical test outcome.
///
/// Created once per raw outcome by [`normalize`], and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOutcome {
    /// The position of this test within the run, starting at 1.
    ///
    /// Stable within a run, and used as the test-management case ID.
    pub identifier: u32,

    /// The name shown in reports.
    pub display_name: String,

    /// The outcome.
    pub outcome: Outcome,

    /// The status message reported alongside the outcome, typically a failure reason.
    pub message: String,

    /// Every classification key found in the test's tags, in tag order and without duplicates.
    pub classification_keys: IndexSet<ClassificationKey>,

    /// Names of the suites enclosing this test, outermost first.
    pub suite_path: Vec<String>,
}

impl TestOutcome {
    /// Returns the first classification key, in tag order.
    pub fn first_key(&self) -> Option<&ClassificationKey> {
        self.classification_keys.first()
    }
}

/// Normalizes raw outcomes into canonical outcomes.
///
/// Every tag matching `pattern` becomes a classification key. Fails on the first raw status that
/// doesn't map to an [`Outcome`]: a run containing statuses we don't understand can't be
/// summarized faithfully.
pub fn normalize(
    raw: &[RawOutcome],
    pattern: &ClassificationPattern,
) -> Result<Vec<TestOutcome>, NormalizeError> {
    raw.iter()
        .map(|raw| normalize_one(raw, pattern))
        .collect()
}

fn normalize_one(
    raw: &RawOutcome,
    pattern: &ClassificationPattern,
) -> Result<TestOutcome, NormalizeError> {
    let outcome =
        Outcome::from_raw(raw.status.trim()).ok_or_else(|| NormalizeError::UnrecognizedStatus {
            case_id: raw.case_id,
            test_name: raw.name.clone(),
            status: raw.status.clone(),
        })?;

    let classification_keys = pattern.extract(&raw.tags);
    if classification_keys.is_empty() {
        tracing::debug!(
            "no classification key found in tags for case {} ({})",
            raw.case_id,
            raw.name,
        );
    } else {
        tracing::debug!(
            "case {} ({}) classified as {}",
            raw.case_id,
            raw.name,
            itertools::join(&classification_keys, ", "),
        );
    }

    Ok(TestOutcome {
        identifier: raw.case_id,
        display_name: raw.name.clone(),
        outcome,
        message: raw.message.clone(),
        classification_keys,
        suite_path: raw.suite_path.clone(),
    })
}
