// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent publishing of reports to issue-tracker threads.
//!
//! A report is published as a *managed comment*: a comment whose text contains a marker that
//! stays the same across runs. Publishing looks for an existing comment with the marker and
//! replaces it, and only creates a new comment if none is found.
//!
//! The list-then-write sequence is not atomic. Two invocations publishing to the same thread at
//! the same time can both create a comment, so callers must serialize publishes per thread.

use crate::{
    errors::{PublishError, RemoteError},
    render::Document,
};
use std::fmt;

/// Identifies a comment thread in an issue tracker, for example an issue key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(String);

impl ThreadId {
    /// Creates a new thread identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a comment within a thread. Opaque to runrelay.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommentId(String);

impl CommentId {
    /// Creates a new comment identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A comment as listed by an issue tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    /// The comment's identifier.
    pub id: CommentId,

    /// The comment's text, without formatting.
    pub body: String,
}

/// An operation against an issue tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerOperation {
    /// Listing the comments on a thread.
    ListComments,

    /// Creating a comment.
    CreateComment,

    /// Replacing a comment's body.
    UpdateComment,
}

impl fmt::Display for TrackerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListComments => write!(f, "list comments"),
            Self::CreateComment => write!(f, "create comment"),
            Self::UpdateComment => write!(f, "update comment"),
        }
    }
}

/// An issue tracker that reports can be published to.
pub trait IssueTracker {
    /// Lists the comments on a thread, most recent first if the tracker supports ordering.
    fn list_comments(&self, thread: &ThreadId) -> Result<Vec<Comment>, RemoteError>;

    /// Creates a comment on a thread.
    fn create_comment(&self, thread: &ThreadId, body: &Document) -> Result<CommentId, RemoteError>;

    /// Replaces the body of an existing comment.
    fn update_comment(
        &self,
        thread: &ThreadId,
        comment: &CommentId,
        body: &Document,
    ) -> Result<(), RemoteError>;
}

/// A rendered report, ready to be published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedReport {
    /// The thread to publish to.
    pub thread: ThreadId,

    /// The text identifying this report among the thread's comments.
    pub marker: String,

    /// The report.
    pub document: Document,
}

/// What [`Publisher::upsert`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No comment carried the marker, so a new one was created.
    Created(CommentId),

    /// An existing comment carrying the marker was replaced.
    Updated(CommentId),
}

impl UpsertOutcome {
    /// Returns the comment that was created or updated.
    pub fn comment_id(&self) -> &CommentId {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(id) => write!(f, "created comment {id}"),
            Self::Updated(id) => write!(f, "updated comment {id}"),
        }
    }
}

/// Publishes reports to an [`IssueTracker`].
pub struct Publisher<'a> {
    tracker: &'a dyn IssueTracker,
}

impl<'a> Publisher<'a> {
    /// Creates a publisher for the given tracker.
    pub fn new(tracker: &'a dyn IssueTracker) -> Self {
        Self { tracker }
    }

    /// Publishes a rendered report.
    pub fn publish(&self, report: &PublishedReport) -> Result<UpsertOutcome, PublishError> {
        self.upsert(&report.thread, &report.document, &report.marker)
    }

    /// Replaces the first comment on `thread` containing `marker` with `document`, or creates a
    /// new comment if there is none.
    pub fn upsert(
        &self,
        thread: &ThreadId,
        document: &Document,
        marker: &str,
    ) -> Result<UpsertOutcome, PublishError> {
        let comments = self.tracker.list_comments(thread).map_err(|error| {
            PublishError::new(thread.clone(), TrackerOperation::ListComments, error)
        })?;

        let existing = comments.into_iter().find(|comment| comment.body.contains(marker));
        let outcome = match existing {
            Some(comment) => {
                self.tracker
                    .update_comment(thread, &comment.id, document)
                    .map_err(|error| {
                        PublishError::new(thread.clone(), TrackerOperation::UpdateComment, error)
                    })?;
                UpsertOutcome::Updated(comment.id)
            }
            None => {
                let id = self
                    .tracker
                    .create_comment(thread, document)
                    .map_err(|error| {
                        PublishError::new(thread.clone(), TrackerOperation::CreateComment, error)
                    })?;
                UpsertOutcome::Created(id)
            }
        };

        tracing::info!("{thread}: {outcome}");
        Ok(outcome)
    }
}
