// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grouping of test outcomes by classification key.
//!
//! Two projections are produced from the same outcomes:
//!
//! * **All matches**: an outcome belongs to the group of every key it carries. Used for the
//!   per-key reports, where each tracked issue should see every test that references it.
//! * **First match**: an outcome belongs to the group of its first key only. Used for the
//!   consolidated report, which lists each test exactly once.

use crate::normalize::{Outcome, TestOutcome};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

/// An external tracking identifier extracted from a test's tags, for example `DEMO-7`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationKey(String);

impl ClassificationKey {
    /// Creates a new key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ClassificationKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The pattern tags must match to be treated as classification keys.
///
/// The pattern is matched against each tag as a whole string, so it should normally be anchored
/// (`^DEMO-[0-9]+$`).
#[derive(Clone, Debug)]
pub struct ClassificationPattern {
    regex: Regex,
}

impl ClassificationPattern {
    /// Compiles a pattern from a regular expression.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Returns the regular expression source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns true if the tag is a classification key.
    pub fn is_match(&self, tag: &str) -> bool {
        self.regex.is_match(tag)
    }

    /// Returns every matching tag, in order and without duplicates.
    pub fn extract<S: AsRef<str>>(&self, tags: &[S]) -> IndexSet<ClassificationKey> {
        tags.iter()
            .map(|tag| tag.as_ref().trim())
            .filter(|tag| self.is_match(tag))
            .map(ClassificationKey::new)
            .collect()
    }
}

/// Counts of outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTotals {
    /// The number of passed tests.
    pub passed: usize,

    /// The number of failed tests.
    pub failed: usize,

    /// The number of skipped tests.
    pub skipped: usize,

    /// The total number of tests.
    pub total: usize,
}

impl OutcomeTotals {
    /// Computes totals over the given outcomes.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a TestOutcome>) -> Self {
        let mut totals = Self::default();
        for outcome in outcomes {
            totals.add(outcome.outcome);
        }
        totals
    }

    /// Adds a single outcome.
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
        self.total += 1;
    }

    /// Returns the percentage of tests that passed, rounded to two decimal places.
    ///
    /// Returns 0 if there are no tests.
    pub fn pass_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let percent = self.passed as f64 / self.total as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }
}

impl fmt::Display for OutcomeTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped of {} ({:.2}% passed)",
            self.passed,
            self.failed,
            self.skipped,
            self.total,
            self.pass_percent(),
        )
    }
}

/// Outcomes sharing a classification key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassificationGroup<'a> {
    /// The key.
    pub key: ClassificationKey,

    /// The outcomes, in input order.
    pub members: Vec<&'a TestOutcome>,
}

impl<'a> ClassificationGroup<'a> {
    fn new(key: ClassificationKey) -> Self {
        Self {
            key,
            members: Vec::new(),
        }
    }

    /// Returns outcome counts for this group.
    pub fn totals(&self) -> OutcomeTotals {
        OutcomeTotals::from_outcomes(self.members.iter().copied())
    }

    /// Returns the members with the given outcome, in input order.
    pub fn members_with(&self, outcome: Outcome) -> impl Iterator<Item = &'a TestOutcome> + '_ {
        self.members
            .iter()
            .copied()
            .filter(move |member| member.outcome == outcome)
    }
}

/// Groups of outcomes, keyed by classification key in order of first appearance.
pub type GroupMap<'a> = IndexMap<ClassificationKey, ClassificationGroup<'a>>;

/// The result of [`group_outcomes`].
#[derive(Clone, Debug)]
pub struct GroupedOutcomes<'a> {
    /// Counts across every outcome, classified or not.
    pub totals: OutcomeTotals,

    /// Each outcome assigned to every key it carries.
    pub all_matches: GroupMap<'a>,

    /// Each outcome assigned to its first key only.
    pub first_match: GroupMap<'a>,

    /// Outcomes with no classification key.
    pub unclassified: Vec<&'a TestOutcome>,
}

impl GroupedOutcomes<'_> {
    /// Returns true if no outcome carried a classification key.
    pub fn is_unclassified(&self) -> bool {
        self.all_matches.is_empty()
    }
}

/// Groups outcomes by classification key.
pub fn group_outcomes(outcomes: &[TestOutcome]) -> GroupedOutcomes<'_> {
    let mut all_matches = GroupMap::new();
    let mut first_match = GroupMap::new();
    let mut unclassified = Vec::new();

    for outcome in outcomes {
        let Some(first_key) = outcome.first_key() else {
            unclassified.push(outcome);
            continue;
        };

        first_match
            .entry(first_key.clone())
            .or_insert_with(|| ClassificationGroup::new(first_key.clone()))
            .members
            .push(outcome);

        for key in &outcome.classification_keys {
            all_matches
                .entry(key.clone())
                .or_insert_with(|| ClassificationGroup::new(key.clone()))
                .members
                .push(outcome);
        }
    }

    GroupedOutcomes {
        totals: OutcomeTotals::from_outcomes(outcomes),
        all_matches,
        first_match,
        unclassified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use robot_results::RawOutcome;
    use std::collections::BTreeSet;
    use test_strategy::proptest;

    fn outcome(identifier: u32, outcome: Outcome, keys: &[&str]) -> TestOutcome {
        TestOutcome {
            identifier,
            display_name: format!("test {identifier}"),
            outcome,
            message: String::new(),
            classification_keys: keys.iter().map(|key| ClassificationKey::new(*key)).collect(),
            suite_path: Vec::new(),
        }
    }

    fn member_ids(group: &ClassificationGroup<'_>) -> Vec<u32> {
        group.members.iter().map(|member| member.identifier).collect()
    }

    fn demo_pattern() -> ClassificationPattern {
        ClassificationPattern::new("^DEMO-[0-9]+$").expect("valid pattern")
    }

    #[test]
    fn pattern_matching() {
        let pattern = demo_pattern();
        assert!(pattern.is_match("DEMO-7"));
        assert!(pattern.is_match("DEMO-1234"));
        assert!(!pattern.is_match("DEMO-"));
        assert!(!pattern.is_match("DEMO-7a"));
        assert!(!pattern.is_match("XDEMO-7"));
        assert!(!pattern.is_match("demo-7"));

        assert_eq!(
            pattern
                .extract(&[" DEMO-7 ", "smoke", "DEMO-8", "DEMO-7"])
                .iter()
                .map(ClassificationKey::as_str)
                .collect::<Vec<_>>(),
            vec!["DEMO-7", "DEMO-8"],
            "tags are trimmed, kept in order and deduplicated"
        );
    }

    #[test]
    fn example_run() {
        let mut login = RawOutcome::new(1, "Login test", "PASS");
        login.add_tag("DEMO-7");
        let mut transfer = RawOutcome::new(2, "Transfer test", "FAIL");
        transfer.add_tag("DEMO-8");
        let unrelated = RawOutcome::new(3, "Unrelated test", "PASS");

        let outcomes = normalize(
            &[login, transfer, unrelated],
            &demo_pattern(),
        )
        .expect("statuses are known");
        let grouped = group_outcomes(&outcomes);

        assert_eq!(
            grouped.totals,
            OutcomeTotals {
                passed: 2,
                failed: 1,
                skipped: 0,
                total: 3
            }
        );

        let demo_7 = &grouped.all_matches["DEMO-7"];
        assert_eq!(demo_7.totals().passed, 1);
        assert_eq!(demo_7.totals().total, 1);

        let demo_8 = &grouped.all_matches["DEMO-8"];
        assert_eq!(demo_8.totals().failed, 1);
        assert_eq!(demo_8.totals().total, 1);
        assert_eq!(
            demo_8
                .members_with(Outcome::Failed)
                .map(|member| member.display_name.as_str())
                .collect::<Vec<_>>(),
            vec!["Transfer test"]
        );

        assert_eq!(grouped.unclassified.len(), 1);
        assert_eq!(grouped.unclassified[0].display_name, "Unrelated test");
    }

    #[test]
    fn all_matches_and_first_match_differ() {
        let outcomes = vec![
            outcome(1, Outcome::Passed, &["DEMO-2", "DEMO-1"]),
            outcome(2, Outcome::Failed, &["DEMO-1"]),
            outcome(3, Outcome::Skipped, &[]),
            outcome(4, Outcome::Passed, &["DEMO-1", "DEMO-2"]),
        ];
        let grouped = group_outcomes(&outcomes);

        let all: Vec<_> = grouped
            .all_matches
            .values()
            .map(|group| (group.key.as_str(), member_ids(group)))
            .collect();
        assert_eq!(all, vec![("DEMO-2", vec![1, 4]), ("DEMO-1", vec![1, 2, 4])]);

        let first: Vec<_> = grouped
            .first_match
            .values()
            .map(|group| (group.key.as_str(), member_ids(group)))
            .collect();
        assert_eq!(first, vec![("DEMO-2", vec![1]), ("DEMO-1", vec![2, 4])]);

        assert_eq!(grouped.totals.total, 4);
        assert_eq!(grouped.totals.skipped, 1);
    }

    #[test]
    fn nothing_classified() {
        let outcomes = vec![
            outcome(1, Outcome::Passed, &[]),
            outcome(2, Outcome::Failed, &[]),
        ];
        let grouped = group_outcomes(&outcomes);
        assert!(grouped.is_unclassified());
        assert!(grouped.first_match.is_empty());
        assert_eq!(grouped.unclassified.len(), 2);
        assert_eq!(grouped.totals.total, 2);
    }

    #[test]
    fn pass_percent() {
        assert_eq!(OutcomeTotals::default().pass_percent(), 0.0);

        let totals = OutcomeTotals {
            passed: 2,
            failed: 1,
            skipped: 0,
            total: 3,
        };
        assert_eq!(totals.pass_percent(), 66.67);
        assert_eq!(
            totals.to_string(),
            "2 passed, 1 failed, 0 skipped of 3 (66.67% passed)"
        );
    }

    fn arb_outcomes() -> impl Strategy<Value = Vec<TestOutcome>> {
        let arb_outcome = prop_oneof![
            Just(Outcome::Passed),
            Just(Outcome::Failed),
            Just(Outcome::Skipped),
        ];
        let arb_keys = prop::collection::vec(0u8..6, 0..4);
        prop::collection::vec((arb_outcome, arb_keys), 0..32).prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(index, (outcome, keys))| TestOutcome {
                    identifier: index as u32 + 1,
                    display_name: format!("test {index}"),
                    outcome,
                    message: String::new(),
                    classification_keys: keys
                        .into_iter()
                        .map(|key| ClassificationKey::new(format!("DEMO-{key}")))
                        .collect(),
                    suite_path: Vec::new(),
                })
                .collect()
        })
    }

    #[proptest]
    fn grouping_is_complete(#[strategy(arb_outcomes())] outcomes: Vec<TestOutcome>) {
        let grouped = group_outcomes(&outcomes);

        let expected: BTreeSet<(u32, ClassificationKey)> = outcomes
            .iter()
            .flat_map(|outcome| {
                outcome
                    .classification_keys
                    .iter()
                    .map(|key| (outcome.identifier, key.clone()))
            })
            .collect();
        let actual: BTreeSet<(u32, ClassificationKey)> = grouped
            .all_matches
            .values()
            .flat_map(|group| {
                group
                    .members
                    .iter()
                    .map(|member| (member.identifier, group.key.clone()))
            })
            .collect();
        prop_assert_eq!(actual, expected);

        // Each classified outcome appears exactly once in the first-match projection.
        let first_match_count: usize = grouped
            .first_match
            .values()
            .map(|group| group.members.len())
            .sum();
        prop_assert_eq!(
            first_match_count + grouped.unclassified.len(),
            outcomes.len()
        );
        prop_assert!(
            grouped
                .unclassified
                .iter()
                .all(|outcome| outcome.classification_keys.is_empty())
        );
        prop_assert_eq!(grouped.totals.total, outcomes.len());

        // Members keep input order.
        for group in grouped.all_matches.values() {
            let ids = member_ids(group);
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            prop_assert_eq!(ids, sorted);
        }
    }
}
