// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the run coordinator, against in-memory services.

mod fakes;

use crate::fakes::{FakeTestManagement, FakeTracker};
use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use chrono::{DateTime, TimeZone, Utc};
use color_eyre::eyre::{Result, ensure};
use indoc::indoc;
use pretty_assertions::assert_eq;
use robot_results::{RawResults, ResultsFormat};
use runrelay_runner::{
    classify::ClassificationKey,
    config::RunRelayConfig,
    coordinator::RunCoordinator,
    errors::{CoordinatorError, RemoteError, ReportScope, RunFailure},
    history::{FileHistoryStore, HistoryKey, HistoryStore, MemoryHistoryStore},
    normalize::Outcome,
    publish::{TrackerOperation, UpsertOutcome},
    remote::RunId,
};

static FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../robot-results/tests/fixtures");

fn read_fixture(file_name: &str) -> RawResults {
    let path = Utf8Path::new(FIXTURES_DIR).join(file_name);
    RawResults::from_path(&path, ResultsFormat::from_path(&path))
        .unwrap_or_else(|error| panic!("reading fixture {path} succeeds: {error}"))
}

fn config() -> RunRelayConfig {
    RunRelayConfig::from_toml_str(
        Utf8Path::new("runrelay.toml"),
        indoc! {r#"
            [publish]
            consolidated-thread = "DEMO-1"

            [qase]
            project = "DEMO"
        "#},
    )
    .expect("test config is valid")
}

fn key(key: &str) -> ClassificationKey {
    ClassificationKey::new(key)
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

#[test]
fn publish_then_republish() -> Result<()> {
    let config = config();
    let history = MemoryHistoryStore::new(config.history().options());
    let tracker = FakeTracker::default();
    let results = read_fixture("output.xml");

    let mut coordinator = RunCoordinator::new(&config, &history);
    coordinator.set_tracker(&tracker).set_timestamp(at(1));
    let first = coordinator.run(&results.outcomes, Some(RunId::new(42)))?;

    ensure!(first.is_success(), "first pass failed: {:?}", first.failures);
    assert_eq!(tracker.threads(), vec!["DEMO-1", "DEMO-7", "DEMO-8", "DEMO-9"]);
    for report in &first.reports {
        assert!(
            matches!(report.published, Some(UpsertOutcome::Created(_))),
            "{} was created: {:?}",
            report.scope,
            report.published,
        );
    }

    assert_eq!(
        tracker.documents("DEMO-8")[0].to_string(),
        indoc! {"
            ### Qase Test Run Summary (DEMO-8)

            **Run:** [#42](https://app.qase.io/run/DEMO/dashboard/42)

            #### Failed

            - Transfer test

            #### Skipped

            - Refund test

            #### Trend

            Pass rate 0.0%, average failures 1.00 over the last 1 run

            - 2026-03-01 09:30:00 UTC: 0 passed, 1 failed
        "}
    );

    // A second pass updates every report in place.
    coordinator.set_timestamp(at(2));
    let second = coordinator.run(&results.outcomes, Some(RunId::new(43)))?;
    ensure!(second.is_success(), "second pass failed: {:?}", second.failures);
    for report in &second.reports {
        assert!(
            matches!(report.published, Some(UpsertOutcome::Updated(_))),
            "{} was updated: {:?}",
            report.scope,
            report.published,
        );
    }

    for thread in ["DEMO-1", "DEMO-7", "DEMO-8", "DEMO-9"] {
        let documents = tracker.documents(thread);
        assert_eq!(documents.len(), 1, "one managed comment on {thread}");
        assert!(
            documents[0].contains("#43"),
            "{thread} shows the latest run:\n{}",
            documents[0]
        );
    }

    let consolidated = &tracker.documents("DEMO-1")[0];
    assert!(consolidated.contains("Qase Test Run Summary (all issues)"));
    assert!(consolidated.contains("2 passed, 1 failed, 1 skipped of 4 (50.00% passed)"));
    assert!(consolidated.contains("1 test had no classification key."));
    assert!(consolidated.contains("2026-03-02 09:30:00 UTC: 2 passed, 1 failed"));

    let demo_7 = history.read(&HistoryKey::from(&key("DEMO-7")));
    assert_eq!(demo_7.len(), 2);

    Ok(())
}

#[test]
fn failing_thread_does_not_stop_others() -> Result<()> {
    let config = config();
    let history = MemoryHistoryStore::new(config.history().options());
    let tracker = FakeTracker::with_missing(&["DEMO-8"]);
    let results = read_fixture("output.xml");

    let mut coordinator = RunCoordinator::new(&config, &history);
    coordinator.set_tracker(&tracker);
    let report = coordinator.run(&results.outcomes, Some(RunId::new(42)))?;

    assert_eq!(report.failures.len(), 1);
    let RunFailure::Publish { key: scope, error } = &report.failures[0] else {
        panic!("expected a publish failure, got {:?}", report.failures[0]);
    };
    assert_eq!(scope, &ReportScope::Key(key("DEMO-8")));
    assert_eq!(error.operation(), TrackerOperation::ListComments);
    assert!(matches!(error.remote_error(), RemoteError::NotFound));
    assert_eq!(report.failures[0].to_string(), "[DEMO-8] failed to publish report");

    // Every other report was attempted, in order, after the failure.
    assert_eq!(
        tracker.calls(),
        vec![
            "list DEMO-7",
            "create DEMO-7",
            "list DEMO-8",
            "list DEMO-9",
            "create DEMO-9",
            "list DEMO-1",
            "create DEMO-1",
        ]
    );
    assert_eq!(tracker.threads(), vec!["DEMO-1", "DEMO-7", "DEMO-9"]);

    // History is recorded even when publishing fails.
    assert_eq!(history.read(&HistoryKey::from(&key("DEMO-8"))).len(), 1);

    Ok(())
}

#[test]
fn creates_run_and_uploads_results() -> Result<()> {
    let config = config();
    let history = MemoryHistoryStore::new(config.history().options());
    let test_management = FakeTestManagement::default();
    let results = read_fixture("qase_summary.json");

    let mut coordinator = RunCoordinator::new(&config, &history);
    coordinator.set_test_management(&test_management, "DEMO");
    let report = coordinator.run(&results.outcomes, None)?;

    ensure!(report.is_success(), "pass failed: {:?}", report.failures);
    assert_eq!(report.run_id, RunId::new(101));

    let runs = test_management.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, "DEMO");
    assert_eq!(runs[0].1.title, "Automated Run from CI");
    assert!(runs[0].1.is_autotest);

    let uploads = test_management.uploads();
    assert_eq!(uploads.len(), 1);
    let (project, run_id, entities) = &uploads[0];
    assert_eq!(project, "DEMO");
    assert_eq!(*run_id, RunId::new(101));
    let statuses: Vec<_> = entities
        .iter()
        .map(|entity| (entity.case_id, entity.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (1, Outcome::Passed),
            (2, Outcome::Failed),
            (3, Outcome::Skipped),
            (4, Outcome::Passed),
        ]
    );
    assert_eq!(entities[1].comment, "Balance was 0 but should have been 100");

    // Nothing is published without a tracker, but reports are still rendered.
    let consolidated = report.consolidated().expect("consolidated report exists");
    assert!(consolidated.published.is_none());
    assert!(consolidated.document.contains("#101"));

    Ok(())
}

#[test]
fn upload_failure_is_isolated() -> Result<()> {
    let config = config();
    let history = MemoryHistoryStore::new(config.history().options());
    let tracker = FakeTracker::default();
    let test_management = FakeTestManagement::failing_upload();
    let results = read_fixture("output.xml");

    let mut coordinator = RunCoordinator::new(&config, &history);
    coordinator
        .set_tracker(&tracker)
        .set_test_management(&test_management, "DEMO");
    let report = coordinator.run(&results.outcomes, Some(RunId::new(5)))?;

    assert!(test_management.runs().is_empty(), "given run is reused");
    assert_eq!(report.failures.len(), 1);
    assert!(
        matches!(
            &report.failures[0],
            RunFailure::Upload { run_id, error: RemoteError::Status { status: 500, .. }, .. }
                if *run_id == RunId::new(5)
        ),
        "{:?}",
        report.failures[0]
    );
    assert_eq!(tracker.threads(), vec!["DEMO-1", "DEMO-7", "DEMO-8", "DEMO-9"]);

    Ok(())
}

#[test]
fn run_creation_failure_aborts() {
    let config = config();
    let history = MemoryHistoryStore::new(config.history().options());
    let tracker = FakeTracker::default();
    let test_management = FakeTestManagement::failing_create();
    let results = read_fixture("output.xml");

    let mut coordinator = RunCoordinator::new(&config, &history);
    coordinator
        .set_tracker(&tracker)
        .set_test_management(&test_management, "DEMO");
    let error = coordinator
        .run(&results.outcomes, None)
        .expect_err("run creation fails");

    assert!(
        matches!(&error, CoordinatorError::RunCreate { project, .. } if project == "DEMO"),
        "{error:?}"
    );
    assert!(tracker.calls().is_empty(), "nothing was published");
}

#[test]
fn file_history_accumulates_across_passes() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let config = config();
    let store = FileHistoryStore::new(dir.path().join("history"), config.history().options());
    let results = read_fixture("output.xml");

    for day in 1..=25 {
        let mut coordinator = RunCoordinator::new(&config, &store);
        coordinator.set_timestamp(at(day));
        let report = coordinator.run(&results.outcomes, Some(RunId::new(u64::from(day))))?;
        ensure!(report.is_success(), "pass {day} failed: {:?}", report.failures);
    }

    let window = store.read(&HistoryKey::overall());
    assert_eq!(window.len(), 20);
    assert_eq!(window.entries()[0].timestamp, at(6));
    assert_eq!(window.entries()[19].timestamp, at(25));

    // A dry pass computes history without persisting it.
    let mut dry_store = store.clone();
    dry_store.set_read_only(true);
    let mut coordinator = RunCoordinator::new(&config, &dry_store);
    coordinator.set_timestamp(at(26));
    let report = coordinator.run(&results.outcomes, Some(RunId::new(26)))?;
    let consolidated = report.consolidated().expect("consolidated report exists");
    assert!(consolidated.document.contains("2026-03-26 09:30:00 UTC"));
    assert_eq!(
        store.read(&HistoryKey::overall()).entries()[19].timestamp,
        at(25),
        "dry pass did not persist"
    );

    Ok(())
}
