// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use itertools::Itertools;
use owo_colors::OwoColorize;
use robot_results::ResultsReadError;
use runrelay_runner::{
    errors::{
        ConfigParseError, CoordinatorError, HistoryReadError, NormalizeError, RunFailure,
    },
    exit_codes::RunRelayExitCode,
};
use std::error::Error;
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected failure: bad input, bad configuration or an unreachable service.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("missing credentials")]
    MissingCredentials {
        service: &'static str,
        missing: Vec<&'static str>,
    },
    #[error("results read error")]
    ResultsReadError {
        #[from]
        err: ResultsReadError,
    },
    #[error("normalize error")]
    NormalizeError {
        #[from]
        err: NormalizeError,
    },
    #[error("coordinator error")]
    CoordinatorError { err: CoordinatorError },
    #[error("{} stages failed", failures.len())]
    RunFailures { failures: Vec<RunFailure> },
    #[error("history read error")]
    HistoryReadError {
        #[from]
        err: HistoryReadError,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn missing_credentials(service: &'static str, missing: Vec<&'static str>) -> Self {
        Self::MissingCredentials { service, missing }
    }

    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. }
            | Self::MissingCredentials { .. }
            | Self::HistoryReadError { .. } => RunRelayExitCode::SETUP_ERROR,
            Self::ResultsReadError { .. } => RunRelayExitCode::RESULTS_READ_FAILED,
            Self::NormalizeError { .. } => RunRelayExitCode::UNRECOGNIZED_STATUS,
            Self::CoordinatorError { err } => match err {
                CoordinatorError::Normalize(_) => RunRelayExitCode::UNRECOGNIZED_STATUS,
                CoordinatorError::MissingRunIdentifier => RunRelayExitCode::MISSING_RUN_IDENTIFIER,
                _ => RunRelayExitCode::PUBLISH_FAILED,
            },
            Self::RunFailures { .. } => RunRelayExitCode::PUBLISH_FAILED,
            Self::WriteOutputError { .. } => RunRelayExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::ConfigParseError { err } => {
                tracing::error!(
                    "failed to parse runrelay config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::MissingCredentials { service, missing } => {
                tracing::error!(
                    "{service} credentials are incomplete: {} not set",
                    missing
                        .iter()
                        .map(|name| name.style(styles.bold).to_string())
                        .join(", ")
                );
                None
            }
            Self::ResultsReadError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::NormalizeError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::CoordinatorError { err } => {
                match err {
                    CoordinatorError::MissingRunIdentifier => {
                        tracing::error!(
                            "no test-management run identifier is available\n\
                             {}",
                            "(hint: pass --run-id, or set QASE_API_TOKEN and a Qase project \
                             to create a run)"
                                .style(styles.warning_text)
                        );
                    }
                    other => tracing::error!("{other}"),
                }
                err.source()
            }
            Self::RunFailures { failures } => {
                for failure in failures {
                    tracing::error!("{failure}");
                    log_causes(failure.source());
                }
                tracing::error!(
                    "{} of the run's stages failed, see above for details",
                    failures.len().style(styles.bold)
                );
                None
            }
            Self::HistoryReadError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::WriteOutputError { err } => {
                tracing::error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

impl From<CoordinatorError> for ExpectedError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::Normalize(err) => Self::NormalizeError { err },
            err => Self::CoordinatorError { err },
        }
    }
}

fn log_causes(mut next_error: Option<&(dyn Error + 'static)>) {
    while let Some(err) = next_error {
        tracing::error!(target: NO_HEADING_TARGET, "  caused by: {}", err);
        next_error = err.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use runrelay_runner::config::RunRelayConfig;

    #[test]
    fn exit_codes() {
        let normalize = NormalizeError::UnrecognizedStatus {
            case_id: 3,
            test_name: "Refund test".to_owned(),
            status: "BLOCKED".to_owned(),
        };
        assert_eq!(
            ExpectedError::from(CoordinatorError::Normalize(normalize.clone())).process_exit_code(),
            RunRelayExitCode::UNRECOGNIZED_STATUS,
        );
        assert!(matches!(
            ExpectedError::from(CoordinatorError::Normalize(normalize)),
            ExpectedError::NormalizeError { .. }
        ));
        assert_eq!(
            ExpectedError::from(CoordinatorError::MissingRunIdentifier).process_exit_code(),
            RunRelayExitCode::MISSING_RUN_IDENTIFIER,
        );
        assert_eq!(
            ExpectedError::RunFailures { failures: vec![] }.process_exit_code(),
            RunRelayExitCode::PUBLISH_FAILED,
        );
        assert_eq!(
            ExpectedError::missing_credentials("Jira", vec!["JIRA_EMAIL"]).process_exit_code(),
            RunRelayExitCode::SETUP_ERROR,
        );

        let config_error = RunRelayConfig::from_toml_str(
            Utf8Path::new("runrelay.toml"),
            "[history]\nmax-entries = 0\n",
        )
        .expect_err("max-entries of 0 is rejected");
        assert_eq!(
            ExpectedError::from(config_error).process_exit_code(),
            RunRelayExitCode::SETUP_ERROR,
        );
    }
}
