// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ResultsFormatParseError, ResultsReadError, read_json::read_results_json,
    read_xml::read_robot_xml,
};
use camino::Utf8Path;
use std::{
    fmt,
    fs::File,
    io::{self, BufReader},
    str::FromStr,
};

/// A single test outcome, as reported by the test-execution engine.
///
/// The status is kept verbatim: Robot Framework uses `PASS`, `FAIL` and `SKIP`, while the JSON
/// results summary uses lowercase words. Mapping these to a canonical outcome is up to the
/// consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawOutcome {
    /// The position of this test within the run, starting at 1.
    pub case_id: u32,

    /// The name of the test.
    pub name: String,

    /// The raw status string.
    pub status: String,

    /// The status message, typically a failure reason. Empty if not present.
    pub message: String,

    /// Tags attached to the test, in document order.
    pub tags: Vec<String>,

    /// Names of the suites enclosing this test, outermost first.
    pub suite_path: Vec<String>,
}

impl RawOutcome {
    /// Creates a new `RawOutcome` with no message, tags or suites.
    pub fn new(case_id: u32, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            case_id,
            name: name.into(),
            status: status.into(),
            message: String::new(),
            tags: Vec::new(),
            suite_path: Vec::new(),
        }
    }

    /// Sets the status message.
    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = message.into();
        self
    }

    /// Adds a tag.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds several tags.
    pub fn add_tags(&mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the enclosing suite names.
    pub fn set_suite_path(
        &mut self,
        suite_path: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.suite_path = suite_path.into_iter().map(Into::into).collect();
        self
    }
}

/// All outcomes read from a single results file, in the order they were encountered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResults {
    /// The outcomes.
    pub outcomes: Vec<RawOutcome>,
}

impl RawResults {
    /// Reads results from the file at `path`, in the given format.
    pub fn from_path(path: &Utf8Path, format: ResultsFormat) -> Result<Self, ResultsReadError> {
        let file = File::open(path).map_err(|error| ResultsReadError::Io {
            path: path.to_owned(),
            error,
        })?;
        let reader = BufReader::new(file);

        match format {
            ResultsFormat::RobotXml => {
                Self::from_robot_xml(reader).map_err(|error| ResultsReadError::Xml {
                    path: path.to_owned(),
                    error,
                })
            }
            ResultsFormat::Json => {
                Self::from_json(reader).map_err(|error| ResultsReadError::Json {
                    path: path.to_owned(),
                    error,
                })
            }
        }
    }

    /// Reads Robot Framework `output.xml` from the given reader.
    pub fn from_robot_xml(reader: impl io::BufRead) -> quick_xml::Result<Self> {
        let outcomes = read_robot_xml(reader)?;
        Ok(Self { outcomes })
    }

    /// Reads a JSON results summary from the given reader.
    pub fn from_json(reader: impl io::Read) -> serde_json::Result<Self> {
        let outcomes = read_results_json(reader)?;
        Ok(Self { outcomes })
    }

    /// Returns the number of outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if there are no outcomes.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// The format of a results file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultsFormat {
    /// Robot Framework `output.xml`.
    RobotXml,

    /// A JSON results summary.
    Json,
}

impl ResultsFormat {
    /// Guesses the format from a file's extension, defaulting to Robot Framework XML.
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::RobotXml,
        }
    }

    /// Returns the string values accepted by [`FromStr`].
    pub fn variants() -> &'static [&'static str] {
        &["robot-xml", "json"]
    }
}

impl FromStr for ResultsFormat {
    type Err = ResultsFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "robot-xml" => Ok(Self::RobotXml),
            "json" => Ok(Self::Json),
            other => Err(ResultsFormatParseError::new(other)),
        }
    }
}

impl fmt::Display for ResultsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RobotXml => write!(f, "robot-xml"),
            Self::Json => write!(f, "json"),
        }
    }
}
