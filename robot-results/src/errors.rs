// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurs while reading a results file.
///
/// Returned by [`RawResults::from_path`](crate::RawResults::from_path).
#[derive(Debug, Error)]
pub enum ResultsReadError {
    /// The results file could not be opened or read.
    #[error("failed to read results file `{path}`")]
    Io {
        /// The path that was being read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The results file is not well-formed Robot Framework XML.
    #[error("failed to parse Robot Framework XML at `{path}`")]
    Xml {
        /// The path that was being read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_xml::Error,
    },

    /// The results file is not a valid JSON results summary.
    #[error("failed to parse JSON results at `{path}`")]
    Json {
        /// The path that was being read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

impl ResultsReadError {
    /// Returns the path of the file that failed to be read.
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::Io { path, .. } | Self::Xml { path, .. } | Self::Json { path, .. } => path,
        }
    }

    /// Returns true if the results file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { error, .. } if error.kind() == io::ErrorKind::NotFound)
    }
}

/// An error returned while parsing a [`ResultsFormat`](crate::ResultsFormat) from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for results format: {input}\n(known values: {})",
    crate::ResultsFormat::variants().join(", "),
)]
pub struct ResultsFormatParseError {
    input: String,
}

impl ResultsFormatParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}
