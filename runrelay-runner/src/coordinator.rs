// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One full pass over a run's results.
//!
//! The [`RunCoordinator`] normalizes raw outcomes, resolves the test-management run, uploads
//! results, groups outcomes by classification key, updates history, and renders and publishes
//! a report per key followed by a consolidated report.
//!
//! Normalization failures and a missing run identifier abort the pass before anything is
//! published. Every later failure is confined to the stage or key it occurred in: it is
//! collected into [`RunReport::failures`] and the pass carries on.

use crate::{
    classify::{OutcomeTotals, group_outcomes},
    config::RunRelayConfig,
    errors::{CoordinatorError, ReportScope, RunFailure},
    history::{HistoryKey, HistoryStore, RunSummary},
    normalize::{TestOutcome, normalize},
    publish::{IssueTracker, Publisher, ThreadId, UpsertOutcome},
    remote::{RunId, RunSpec, TestManagement, result_entities},
    render::{
        Document, RenderOptions, RunLink, render_consolidated_report, render_group_report,
    },
};
use chrono::{DateTime, SubsecRound, Utc};
use robot_results::RawOutcome;

/// Runs the pipeline over a set of raw results.
pub struct RunCoordinator<'a> {
    config: &'a RunRelayConfig,
    history: &'a dyn HistoryStore,
    tracker: Option<&'a dyn IssueTracker>,
    test_management: Option<&'a dyn TestManagement>,
    project: Option<String>,
    timestamp: DateTime<Utc>,
}

impl<'a> RunCoordinator<'a> {
    /// Creates a coordinator that records history in `history` and neither publishes nor talks
    /// to a test-management service.
    pub fn new(config: &'a RunRelayConfig, history: &'a dyn HistoryStore) -> Self {
        Self {
            config,
            history,
            tracker: None,
            test_management: None,
            project: config.qase().project.clone(),
            timestamp: Utc::now().trunc_subsecs(0),
        }
    }

    /// Publishes reports to `tracker`.
    pub fn set_tracker(&mut self, tracker: &'a dyn IssueTracker) -> &mut Self {
        self.tracker = Some(tracker);
        self
    }

    /// Creates runs in and uploads results to `project` in `client`.
    pub fn set_test_management(
        &mut self,
        client: &'a dyn TestManagement,
        project: impl Into<String>,
    ) -> &mut Self {
        self.test_management = Some(client);
        self.project = Some(project.into());
        self
    }

    /// Sets the test-management project used in report links. Defaults to `qase.project` from
    /// the config.
    pub fn set_project(&mut self, project: impl Into<String>) -> &mut Self {
        self.project = Some(project.into());
        self
    }

    /// Sets the time recorded in history entries. Defaults to when the coordinator was created.
    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) -> &mut Self {
        self.timestamp = timestamp;
        self
    }

    /// Runs one pass over `raw`.
    ///
    /// If `run_id` is `None`, a run is created in the test-management service, if one is set.
    pub fn run(
        &self,
        raw: &[RawOutcome],
        run_id: Option<RunId>,
    ) -> Result<RunReport, CoordinatorError> {
        let outcomes = normalize(raw, self.config.classification_pattern())?;
        let run_id = self.resolve_run_id(run_id)?;
        let mut failures = Vec::new();

        if let Some(failure) = self.upload_results(run_id, &outcomes) {
            failures.push(failure);
        }

        let grouped = group_outcomes(&outcomes);
        if grouped.is_unclassified() {
            tracing::info!(
                "no classification keys found in {} results, skipping per-key reports",
                outcomes.len(),
            );
        }

        let options = self.render_options(run_id);
        let publisher = self.tracker.map(Publisher::new);
        let mut reports = Vec::with_capacity(grouped.all_matches.len() + 1);

        for group in grouped.all_matches.values() {
            let scope = ReportScope::Key(group.key.clone());
            let totals = group.totals();
            let recent_history =
                self.record_history(HistoryKey::from(&group.key), &totals, &scope, &mut failures);
            let document = render_group_report(group, &recent_history, &options);

            let mut report = RenderedReport {
                scope,
                totals,
                thread: self.config.publish().thread_for(&group.key),
                marker: options.group_title(&group.key),
                document,
                published: None,
            };
            report.publish(publisher.as_ref(), &mut failures);
            reports.push(report);
        }

        let scope = ReportScope::Consolidated;
        let recent_history = self.record_history(
            HistoryKey::overall(),
            &grouped.totals,
            &scope,
            &mut failures,
        );
        let mut consolidated = RenderedReport {
            scope,
            totals: grouped.totals,
            thread: self.config.publish().consolidated_thread(),
            marker: options.consolidated_title(),
            document: render_consolidated_report(&grouped, &recent_history, &options),
            published: None,
        };
        consolidated.publish(publisher.as_ref(), &mut failures);
        reports.push(consolidated);

        Ok(RunReport {
            run_id,
            totals: grouped.totals,
            unclassified: grouped.unclassified.len(),
            reports,
            failures,
        })
    }

    fn resolve_run_id(&self, run_id: Option<RunId>) -> Result<RunId, CoordinatorError> {
        if let Some(run_id) = run_id {
            return Ok(run_id);
        }

        let (Some(client), Some(project)) = (self.test_management, &self.project) else {
            return Err(CoordinatorError::MissingRunIdentifier);
        };

        let run = self.config.run();
        let spec = RunSpec {
            title: run.title.clone(),
            description: run.description.clone(),
            environment: run.environment.clone(),
            is_autotest: true,
        };
        client
            .create_run(project, &spec)
            .map_err(|error| CoordinatorError::RunCreate {
                project: project.clone(),
                error,
            })
    }

    fn upload_results(
        &self,
        run_id: RunId,
        outcomes: &[TestOutcome],
    ) -> Option<RunFailure> {
        let (Some(client), Some(project)) = (self.test_management, &self.project) else {
            return None;
        };
        if outcomes.is_empty() {
            tracing::info!("no results to upload to run {run_id}");
            return None;
        }

        let entities = result_entities(outcomes);
        match client.bulk_upload_results(project, run_id, &entities) {
            Ok(()) => None,
            Err(error) => Some(RunFailure::Upload {
                project: project.clone(),
                run_id,
                error,
            }),
        }
    }

    fn record_history(
        &self,
        key: HistoryKey,
        totals: &OutcomeTotals,
        scope: &ReportScope,
        failures: &mut Vec<RunFailure>,
    ) -> Vec<RunSummary> {
        let summary = RunSummary::from_totals(self.timestamp, totals);
        match self.history.record(&key, summary) {
            Ok(recent) => recent,
            Err(error) => {
                tracing::warn!("[{scope}] rendering without history");
                failures.push(RunFailure::History {
                    key: scope.clone(),
                    error,
                });
                Vec::new()
            }
        }
    }

    fn render_options(&self, run_id: RunId) -> RenderOptions {
        let links = self.config.links();
        let project = self.project.as_deref();
        RenderOptions {
            title: self.config.publish().marker.clone(),
            run: Some(RunLink {
                run_id,
                url: links.run_url(project, run_id),
            }),
            include_links: links.include,
            links: links.artifact_links(project, run_id),
        }
    }
}

/// A report rendered during a pass, and what happened when it was published.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    /// What the report covers.
    pub scope: ReportScope,

    /// Outcome counts for the tests the report covers.
    pub totals: OutcomeTotals,

    /// The thread the report is routed to, if any.
    pub thread: Option<ThreadId>,

    /// The text identifying the report among the thread's comments.
    pub marker: String,

    /// The rendered report.
    pub document: Document,

    /// The result of publishing, if the report was published successfully.
    pub published: Option<UpsertOutcome>,
}

impl RenderedReport {
    fn publish(&mut self, publisher: Option<&Publisher<'_>>, failures: &mut Vec<RunFailure>) {
        let (Some(publisher), Some(thread)) = (publisher, &self.thread) else {
            return;
        };
        match publisher.upsert(thread, &self.document, &self.marker) {
            Ok(outcome) => self.published = Some(outcome),
            Err(error) => failures.push(RunFailure::Publish {
                key: self.scope.clone(),
                error,
            }),
        }
    }
}

/// The result of a [`RunCoordinator`] pass.
#[derive(Debug)]
pub struct RunReport {
    /// The test-management run the results belong to.
    pub run_id: RunId,

    /// Counts across every outcome.
    pub totals: OutcomeTotals,

    /// The number of outcomes without a classification key.
    pub unclassified: usize,

    /// Per-key reports in order of first appearance, followed by the consolidated report.
    pub reports: Vec<RenderedReport>,

    /// Failures collected during the pass.
    pub failures: Vec<RunFailure>,
}

impl RunReport {
    /// Returns true if every stage succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the consolidated report.
    pub fn consolidated(&self) -> Option<&RenderedReport> {
        self.reports
            .iter()
            .find(|report| report.scope == ReportScope::Consolidated)
    }

    /// Returns the per-key reports.
    pub fn group_reports(&self) -> impl Iterator<Item = &RenderedReport> {
        self.reports
            .iter()
            .filter(|report| report.scope != ReportScope::Consolidated)
    }
}
