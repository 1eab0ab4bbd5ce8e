// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::document::{Document, Inline};
use crate::{
    classify::{ClassificationGroup, ClassificationKey, GroupedOutcomes},
    history::{RunSummary, TrendStats},
    normalize::Outcome,
    remote::RunId,
};

const TITLE_LEVEL: u8 = 3;
const SECTION_LEVEL: u8 = 4;

/// Options controlling report rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// The title shared by every report, for example `Qase Test Run Summary`.
    ///
    /// Each report's title line extends this with the key it covers, and the result doubles as
    /// the marker used to find the report again on later runs.
    pub title: String,

    /// The run the results belong to.
    pub run: Option<RunLink>,

    /// Whether to append resource links.
    pub include_links: bool,

    /// Resource links, such as a downloadable report artifact.
    pub links: Vec<Link>,
}

impl RenderOptions {
    /// Creates options with the given title, no run and no links.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            run: None,
            include_links: false,
            links: Vec::new(),
        }
    }

    /// Returns the title line of the report for `key`.
    pub fn group_title(&self, key: &ClassificationKey) -> String {
        format!("{} ({key})", self.title)
    }

    /// Returns the title line of the consolidated report.
    pub fn consolidated_title(&self) -> String {
        format!("{} (all issues)", self.title)
    }
}

/// A reference to the test-management run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLink {
    /// The run identifier.
    pub run_id: RunId,

    /// A URL for the run, if one is known.
    pub url: Option<String>,
}

/// A labelled hyperlink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// The link text.
    pub label: String,

    /// The link target.
    pub url: String,
}

/// Renders the report for a single classification key.
///
/// Sections appear in a fixed order: title, run reference, passed, failed and skipped tests,
/// trend, links. Empty sections are omitted.
pub fn render_group_report(
    group: &ClassificationGroup<'_>,
    recent_history: &[RunSummary],
    options: &RenderOptions,
) -> Document {
    let mut document = Document::new();
    document.heading(TITLE_LEVEL, options.group_title(&group.key));
    push_run_reference(&mut document, options);

    for outcome in [Outcome::Passed, Outcome::Failed, Outcome::Skipped] {
        let names: Vec<_> = group
            .members_with(outcome)
            .map(|member| vec![Inline::text(member.display_name.as_str())])
            .collect();
        if !names.is_empty() {
            document.heading(SECTION_LEVEL, outcome.label());
            document.bullet_list(names);
        }
    }

    push_trend(&mut document, recent_history);
    push_links(&mut document, options);
    document
}

/// Renders the consolidated report covering every classification key.
///
/// Each test is listed once, under the key it was attributed to by the first-match projection.
pub fn render_consolidated_report(
    grouped: &GroupedOutcomes<'_>,
    recent_history: &[RunSummary],
    options: &RenderOptions,
) -> Document {
    let mut document = Document::new();
    document.heading(TITLE_LEVEL, options.consolidated_title());
    push_run_reference(&mut document, options);
    document.paragraph([
        Inline::strong("Totals:"),
        Inline::text(format!(" {}", grouped.totals)),
    ]);

    for group in grouped.first_match.values() {
        document.heading(SECTION_LEVEL, group.key.as_str());
        document.bullet_list(group.members.iter().map(|member| {
            vec![Inline::text(format!(
                "{} \u{2013} {}",
                member.display_name, member.outcome
            ))]
        }));
    }

    match grouped.unclassified.len() {
        0 => {}
        1 => {
            document.paragraph([Inline::text("1 test had no classification key.")]);
        }
        count => {
            document.paragraph([Inline::text(format!(
                "{count} tests had no classification key."
            ))]);
        }
    }

    push_trend(&mut document, recent_history);
    push_links(&mut document, options);
    document
}

fn push_run_reference(document: &mut Document, options: &RenderOptions) {
    let Some(run) = &options.run else {
        return;
    };
    let label = format!("#{}", run.run_id);
    let reference = match &run.url {
        Some(url) => Inline::link(label, url.as_str()),
        None => Inline::text(label),
    };
    document.paragraph([Inline::strong("Run:"), Inline::text(" "), reference]);
}

fn push_trend(document: &mut Document, recent_history: &[RunSummary]) {
    if recent_history.is_empty() {
        return;
    }

    let stats = TrendStats::from_entries(recent_history);
    document.heading(SECTION_LEVEL, "Trend");
    document.paragraph([Inline::text(format!(
        "Pass rate {:.1}%, average failures {:.2} over the last {} {}",
        stats.pass_percent(),
        stats.average_failures,
        stats.runs,
        if stats.runs == 1 { "run" } else { "runs" },
    ))]);
    document.bullet_list(recent_history.iter().map(|entry| {
        vec![Inline::text(format!(
            "{}: {} passed, {} failed",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.passed,
            entry.failed,
        ))]
    }));
}

fn push_links(document: &mut Document, options: &RenderOptions) {
    if !options.include_links || options.links.is_empty() {
        return;
    }

    document.heading(SECTION_LEVEL, "Links");
    document.bullet_list(
        options
            .links
            .iter()
            .map(|link| vec![Inline::link(link.label.as_str(), link.url.as_str())]),
    );
}
