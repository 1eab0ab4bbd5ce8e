// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by runrelay.

use crate::{
    classify::ClassificationKey,
    history::HistoryKey,
    publish::{ThreadId, TrackerOperation},
    remote::RunId,
};
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{fmt, io, time::Duration};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse runrelay config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of [`ConfigParseError`] that occurred.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building or deserializing the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// The classification pattern is not a valid regular expression.
    #[error("invalid classification pattern `{pattern}`")]
    InvalidPattern {
        /// The pattern that failed to compile.
        pattern: String,

        /// The underlying error.
        #[source]
        error: regex::Error,
    },

    /// The history bounds are inconsistent.
    #[error(
        "invalid history bounds: max-entries is {max_entries} and recent-entries is \
         {recent_entries} (max-entries must be at least 1 and at least recent-entries)"
    )]
    InvalidHistoryBounds {
        /// The configured maximum window length.
        max_entries: usize,

        /// The configured number of entries shown in reports.
        recent_entries: usize,
    },
}

/// An error that occurred while normalizing raw outcomes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum NormalizeError {
    /// A raw status did not map to passed, failed or skipped.
    #[error(
        "unrecognized status `{status}` for test `{test_name}` (case {case_id})\n\
         (known values: PASS, FAIL, SKIP, passed, failed, skipped)"
    )]
    UnrecognizedStatus {
        /// The position of the test within the run.
        case_id: u32,

        /// The name of the test.
        test_name: String,

        /// The raw status that was not recognized.
        status: String,
    },
}

/// An error that occurred while reading stored history.
///
/// These errors are never fatal: the history for the key is treated as empty.
#[derive(Debug, Error)]
pub enum HistoryReadError {
    /// The history file exists but could not be read.
    #[error("history for `{key}` at `{path}` is unreadable")]
    Unreadable {
        /// The key being read.
        key: HistoryKey,

        /// The path to the history file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The history file could not be parsed.
    #[error("history for `{key}` at `{path}` is corrupt")]
    Corrupt {
        /// The key being read.
        key: HistoryKey,

        /// The path to the history file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The history file was recorded for a different key.
    #[error("history file `{path}` for `{key}` was recorded for `{found}`")]
    KeyMismatch {
        /// The key being read.
        key: HistoryKey,

        /// The path to the history file.
        path: Utf8PathBuf,

        /// The key stored in the file.
        found: HistoryKey,
    },
}

/// An error that occurred while writing history.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    /// The history directory could not be created.
    #[error("failed to create history directory `{dir}`")]
    DirCreate {
        /// The directory that could not be created.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The lock file for a key could not be opened or locked.
    #[error("failed to lock history for `{key}` at `{path}`")]
    FileLock {
        /// The key being written.
        key: HistoryKey,

        /// The path to the lock file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Another process held the lock for too long.
    #[error("timed out after {timeout:?} waiting for history lock `{path}` for `{key}`")]
    FileLockTimeout {
        /// The key being written.
        key: HistoryKey,

        /// The path to the lock file.
        path: Utf8PathBuf,

        /// The time spent waiting.
        timeout: Duration,
    },

    /// The history file could not be written.
    #[error("failed to write history for `{key}` to `{path}`")]
    Write {
        /// The key being written.
        key: HistoryKey,

        /// The path to the history file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<io::Error>,
    },
}

/// An error returned by a remote service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// The request could not be sent, or no response was received.
    #[error("request failed")]
    Transport {
        /// The underlying error.
        #[source]
        error: Box<ureq::Error>,
    },

    /// The target does not exist.
    #[error("not found (HTTP 404)")]
    NotFound,

    /// The credentials were rejected.
    #[error("not authorized (HTTP {status})")]
    Unauthorized {
        /// The HTTP status code.
        status: u16,
    },

    /// Any other non-success status.
    #[error("unexpected HTTP status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,

        /// The start of the response body.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("malformed response")]
    MalformedResponse {
        /// The underlying error.
        #[source]
        error: Box<ureq::Error>,
    },

    /// The response body decoded, but did not contain what was expected.
    #[error("unexpected response: {message}")]
    UnexpectedResponse {
        /// A description of what was wrong.
        message: String,
    },
}

impl RemoteError {
    pub(crate) fn transport(error: ureq::Error) -> Self {
        Self::Transport {
            error: Box::new(error),
        }
    }

    pub(crate) fn malformed_response(error: ureq::Error) -> Self {
        Self::MalformedResponse {
            error: Box::new(error),
        }
    }
}

/// An error that occurred while publishing a document to an issue tracker thread.
#[derive(Debug, Error)]
#[error("failed to {operation} on thread `{thread}`")]
pub struct PublishError {
    thread: ThreadId,
    operation: TrackerOperation,
    #[source]
    error: RemoteError,
}

impl PublishError {
    pub(crate) fn new(thread: ThreadId, operation: TrackerOperation, error: RemoteError) -> Self {
        Self {
            thread,
            operation,
            error,
        }
    }

    /// Returns the thread that was being published to.
    pub fn thread(&self) -> &ThreadId {
        &self.thread
    }

    /// Returns the tracker operation that failed.
    pub fn operation(&self) -> TrackerOperation {
        self.operation
    }

    /// Returns the underlying remote error.
    pub fn remote_error(&self) -> &RemoteError {
        &self.error
    }
}

/// An error that aborts a run coordinator invocation before anything is published.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoordinatorError {
    /// A raw outcome could not be normalized.
    #[error("failed to normalize test results")]
    Normalize(#[from] NormalizeError),

    /// No run identifier was supplied and none could be created.
    #[error("no test-management run identifier is available")]
    MissingRunIdentifier,

    /// Creating a run in the test-management service failed.
    #[error("failed to create a test run in project `{project}`")]
    RunCreate {
        /// The test-management project.
        project: String,

        /// The underlying error.
        #[source]
        error: RemoteError,
    },
}

/// A failure isolated to a single stage or group of a run.
///
/// These are collected by the run coordinator, which keeps going after each one.
#[derive(Debug, Error)]
pub enum RunFailure {
    /// Uploading results to the test-management service failed.
    #[error("[upload] failed to upload results to run {run_id} in project `{project}`")]
    Upload {
        /// The test-management project.
        project: String,

        /// The run results were being uploaded to.
        run_id: RunId,

        /// The underlying error.
        #[source]
        error: RemoteError,
    },

    /// Writing history for a group failed.
    #[error("[{key}] failed to record history")]
    History {
        /// The group being recorded.
        key: ReportScope,

        /// The underlying error.
        #[source]
        error: HistoryError,
    },

    /// Publishing a report failed.
    #[error("[{key}] failed to publish report")]
    Publish {
        /// The report being published.
        key: ReportScope,

        /// The underlying error.
        #[source]
        error: PublishError,
    },
}

/// The report a [`RunFailure`] is about: a single classification key, or the consolidated
/// report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportScope {
    /// The report for a single classification key.
    Key(ClassificationKey),

    /// The consolidated report covering all keys.
    Consolidated,
}

impl fmt::Display for ReportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Consolidated => write!(f, "consolidated"),
        }
    }
}
