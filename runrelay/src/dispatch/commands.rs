// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.

use super::common::{ConfigOpts, ResultsOpts, ServiceOpts};
use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputWriter, StdoutStyles},
};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;
use runrelay_runner::{
    classify::{ClassificationKey, OutcomeTotals},
    coordinator::{RunCoordinator, RunReport},
    exit_codes::RunRelayExitCode,
    history::{FileHistoryStore, HistoryKey, HistoryWindow},
    normalize::normalize,
    remote::{ResultsPayload, RunId, result_entities},
};
use std::io::{self, Write};
use swrite::{SWrite, swrite, swriteln};

/// Options for `runrelay publish`.
#[derive(Debug, Args)]
pub(crate) struct PublishOpts {
    #[clap(flatten)]
    results: ResultsOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(flatten)]
    services: ServiceOpts,

    /// Test-management run to attach results to [default: create a new run].
    #[arg(long, value_name = "ID", env = "QASE_RUN_ID")]
    run_id: Option<u64>,

    /// Print reports as Markdown instead of publishing them.
    ///
    /// No service is contacted and history is not written. A run ID is still required.
    #[arg(long)]
    dry_run: bool,
}

impl PublishOpts {
    pub(crate) fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let config = self.config_opts.make_config()?;
        let results = self.results.read()?;

        let mut history = FileHistoryStore::new(&config.history().dir, config.history().options());
        history.set_read_only(self.dry_run);

        let (qase, jira) = if self.dry_run {
            (None, None)
        } else {
            (
                self.services.qase_client(&config)?,
                self.services.jira_client(&config)?,
            )
        };

        let mut coordinator = RunCoordinator::new(&config, &history);
        if let Some(project) = self.services.qase_project(&config) {
            coordinator.set_project(project);
        }
        if let Some((client, project)) = &qase {
            coordinator.set_test_management(client, project.clone());
        }
        match &jira {
            Some(client) => {
                coordinator.set_tracker(client);
            }
            None if !self.dry_run => {
                tracing::warn!(
                    "JIRA_EMAIL and JIRA_API_TOKEN are not set, reports will not be published"
                );
            }
            None => {}
        }

        let report = coordinator.run(&results.outcomes, self.run_id.map(RunId::new))?;

        if self.dry_run {
            let mut writer = output_writer.stdout_writer();
            write_reports(&report, &output.stdout_styles(), &mut writer)
                .and_then(|()| writer.flush())
                .map_err(ExpectedError::write_output)?;
        }

        tracing::info!(
            "run {}: {} ({} reports, {} unclassified)",
            report.run_id,
            report.totals,
            report.reports.len(),
            report.unclassified,
        );

        if report.is_success() {
            Ok(RunRelayExitCode::OK)
        } else {
            Err(ExpectedError::RunFailures {
                failures: report.failures,
            })
        }
    }
}

/// Options for `runrelay summary`.
#[derive(Debug, Args)]
pub(crate) struct SummaryOpts {
    #[clap(flatten)]
    results: ResultsOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,
}

impl SummaryOpts {
    pub(crate) fn exec(self, output_writer: &mut OutputWriter) -> Result<i32> {
        let config = self.config_opts.make_config()?;
        let totals = match self.results.read() {
            Ok(results) => {
                let outcomes = normalize(&results.outcomes, config.classification_pattern())?;
                OutcomeTotals::from_outcomes(&outcomes)
            }
            Err(error) if error.is_not_found() => {
                tracing::warn!(
                    "results file `{}` does not exist, reporting empty totals",
                    error.path()
                );
                OutcomeTotals::default()
            }
            Err(error) => return Err(error.into()),
        };

        let mut writer = output_writer.stdout_writer();
        writer
            .write_all(format_summary(&totals).as_bytes())
            .and_then(|()| writer.flush())
            .map_err(ExpectedError::write_output)?;
        Ok(RunRelayExitCode::OK)
    }
}

/// Options for `runrelay entities`.
#[derive(Debug, Args)]
pub(crate) struct EntitiesOpts {
    #[clap(flatten)]
    results: ResultsOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,
}

impl EntitiesOpts {
    pub(crate) fn exec(self, output_writer: &mut OutputWriter) -> Result<i32> {
        let config = self.config_opts.make_config()?;
        let results = self.results.read()?;
        let outcomes = normalize(&results.outcomes, config.classification_pattern())?;
        let entities = result_entities(&outcomes);

        let mut writer = output_writer.stdout_writer();
        serde_json::to_writer_pretty(&mut writer, &ResultsPayload { results: &entities })
            .map_err(io::Error::from)
            .and_then(|()| writeln!(writer))
            .and_then(|()| writer.flush())
            .map_err(ExpectedError::write_output)?;
        Ok(RunRelayExitCode::OK)
    }
}

/// Subcommands for `runrelay history`.
#[derive(Debug, Subcommand)]
pub(crate) enum HistoryCommand {
    /// Print the stored runs and trend for a classification key.
    Show {
        /// The classification key to show.
        #[arg(required_unless_present = "overall")]
        key: Option<String>,

        /// Show whole-run totals instead of a classification key.
        #[arg(long, conflicts_with = "key")]
        overall: bool,

        #[clap(flatten)]
        config_opts: ConfigOpts,
    },
}

impl HistoryCommand {
    pub(crate) fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self {
            Self::Show {
                key,
                overall,
                config_opts,
            } => {
                let config = config_opts.make_config()?;
                let store =
                    FileHistoryStore::new(&config.history().dir, config.history().options());
                let key = match key {
                    Some(key) if !overall => HistoryKey::from(&ClassificationKey::new(key)),
                    _ => HistoryKey::overall(),
                };
                if output.verbose {
                    tracing::info!("reading history from `{}`", store.history_path(&key));
                }
                let window = store.try_read(&key)?;

                let mut writer = output_writer.stdout_writer();
                writer
                    .write_all(
                        format_history(&key, &window, &output.stdout_styles()).as_bytes(),
                    )
                    .and_then(|()| writer.flush())
                    .map_err(ExpectedError::write_output)?;
                Ok(RunRelayExitCode::OK)
            }
        }
    }
}

fn write_reports(
    report: &RunReport,
    styles: &StdoutStyles,
    writer: &mut dyn Write,
) -> io::Result<()> {
    for (index, rendered) in report.reports.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }
        let destination = match &rendered.thread {
            Some(thread) => format!("thread {thread}"),
            None => "not routed".to_owned(),
        };
        let heading = format!("--- {} ({destination}) ---", rendered.scope);
        writeln!(writer, "{}", heading.style(styles.heading))?;
        writeln!(writer)?;
        write!(writer, "{}", rendered.document)?;
    }
    Ok(())
}

fn format_summary(totals: &OutcomeTotals) -> String {
    let mut out = String::new();
    swriteln!(out, "TOTAL={}", totals.total);
    swriteln!(out, "PASSED={}", totals.passed);
    swriteln!(out, "FAILED={}", totals.failed);
    swriteln!(out, "SKIPPED={}", totals.skipped);
    swriteln!(out, "PASS_PERCENT={:.2}", totals.pass_percent());
    out
}

fn format_history(key: &HistoryKey, window: &HistoryWindow, styles: &StdoutStyles) -> String {
    let mut out = String::new();
    swrite!(out, "{}", key.style(styles.heading));
    if window.is_empty() {
        swriteln!(out, ": no history recorded");
        return out;
    }

    let runs = if window.len() == 1 { "run" } else { "runs" };
    swriteln!(out, ": {} {runs}", window.len());
    for entry in window.entries() {
        swriteln!(
            out,
            "  {}  {} passed  {} failed  {} total",
            entry
                .timestamp
                .format("%Y-%m-%d %H:%M:%S UTC")
                .style(styles.dimmed),
            entry.passed.style(styles.passed),
            entry.failed.style(styles.failed),
            entry.total,
        );
    }

    let trend = window.trend();
    swriteln!(
        out,
        "trend: pass rate {:.1}%, average failures {:.2}",
        trend.pass_percent(),
        trend.average_failures,
    );
    out
}
