// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use runrelay_runner::{
    errors::RemoteError,
    publish::{Comment, CommentId, IssueTracker, ThreadId},
    remote::{ResultEntity, RunId, RunSpec, TestManagement},
    render::Document,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

/// An in-memory issue tracker. Every thread exists unless marked missing.
#[derive(Debug, Default)]
pub(crate) struct FakeTracker {
    state: Mutex<TrackerState>,
    missing: BTreeSet<ThreadId>,
}

#[derive(Debug, Default)]
struct TrackerState {
    // Oldest first.
    threads: BTreeMap<ThreadId, Vec<(CommentId, Document)>>,
    next_id: u64,
    calls: Vec<String>,
}

impl FakeTracker {
    pub(crate) fn with_missing(threads: &[&str]) -> Self {
        Self {
            missing: threads.iter().map(|thread| ThreadId::new(*thread)).collect(),
            ..Default::default()
        }
    }

    /// Returns the documents on a thread, oldest first.
    pub(crate) fn documents(&self, thread: &str) -> Vec<Document> {
        let state = self.state.lock().unwrap();
        state
            .threads
            .get(&ThreadId::new(thread))
            .map(|comments| comments.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the threads with at least one comment.
    pub(crate) fn threads(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .threads
            .iter()
            .filter(|(_, comments)| !comments.is_empty())
            .map(|(thread, _)| thread.to_string())
            .collect()
    }

    /// Returns a log of calls, in the form `operation thread`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn check(&self, thread: &ThreadId, operation: &str) -> Result<(), RemoteError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("{operation} {thread}"));
        if self.missing.contains(thread) {
            Err(RemoteError::NotFound)
        } else {
            Ok(())
        }
    }
}

impl IssueTracker for FakeTracker {
    fn list_comments(&self, thread: &ThreadId) -> Result<Vec<Comment>, RemoteError> {
        self.check(thread, "list")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .threads
            .get(thread)
            .into_iter()
            .flatten()
            .rev()
            .map(|(id, document)| Comment {
                id: id.clone(),
                body: document.plain_text(),
            })
            .collect())
    }

    fn create_comment(&self, thread: &ThreadId, body: &Document) -> Result<CommentId, RemoteError> {
        self.check(thread, "create")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = CommentId::new(format!("c{}", state.next_id));
        state
            .threads
            .entry(thread.clone())
            .or_default()
            .push((id.clone(), body.clone()));
        Ok(id)
    }

    fn update_comment(
        &self,
        thread: &ThreadId,
        comment: &CommentId,
        body: &Document,
    ) -> Result<(), RemoteError> {
        self.check(thread, "update")?;
        let mut state = self.state.lock().unwrap();
        let existing = state
            .threads
            .get_mut(thread)
            .and_then(|comments| comments.iter_mut().find(|(id, _)| id == comment))
            .ok_or(RemoteError::NotFound)?;
        existing.1 = body.clone();
        Ok(())
    }
}

/// An in-memory test-management service.
#[derive(Debug, Default)]
pub(crate) struct FakeTestManagement {
    fail_create: bool,
    fail_upload: bool,
    state: Mutex<TestManagementState>,
}

#[derive(Debug, Default)]
struct TestManagementState {
    runs: Vec<(String, RunSpec)>,
    uploads: Vec<(String, RunId, Vec<ResultEntity>)>,
}

impl FakeTestManagement {
    pub(crate) fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Default::default()
        }
    }

    pub(crate) fn failing_upload() -> Self {
        Self {
            fail_upload: true,
            ..Default::default()
        }
    }

    pub(crate) fn runs(&self) -> Vec<(String, RunSpec)> {
        self.state.lock().unwrap().runs.clone()
    }

    pub(crate) fn uploads(&self) -> Vec<(String, RunId, Vec<ResultEntity>)> {
        self.state.lock().unwrap().uploads.clone()
    }
}

impl TestManagement for FakeTestManagement {
    fn create_run(&self, project: &str, spec: &RunSpec) -> Result<RunId, RemoteError> {
        if self.fail_create {
            return Err(RemoteError::Unauthorized { status: 401 });
        }
        let mut state = self.state.lock().unwrap();
        state.runs.push((project.to_owned(), spec.clone()));
        Ok(RunId::new(100 + state.runs.len() as u64))
    }

    fn bulk_upload_results(
        &self,
        project: &str,
        run_id: RunId,
        results: &[ResultEntity],
    ) -> Result<(), RemoteError> {
        if self.fail_upload {
            return Err(RemoteError::Status {
                status: 500,
                body: "internal error".to_owned(),
            });
        }
        self.state
            .lock()
            .unwrap()
            .uploads
            .push((project.to_owned(), run_id, results.to_vec()));
        Ok(())
    }
}
