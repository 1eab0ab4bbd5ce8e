// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level application and command routing.

use super::commands::{EntitiesOpts, HistoryCommand, PublishOpts, SummaryOpts};
use crate::{
    Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use clap::{Parser, Subcommand};

/// Relay CI test results to a test-management service and an issue tracker.
///
/// runrelay groups test results by the issue keys found in test tags, keeps a rolling history
/// of earlier runs per key, and keeps one report comment per issue up to date.
#[derive(Debug, Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct RunRelayApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl RunRelayApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Publish(opts) => opts.exec(output, output_writer),
            Command::Summary(opts) => opts.exec(output_writer),
            Command::Entities(opts) => opts.exec(output_writer),
            Command::History { command } => command.exec(output, output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload results, update history and publish reports to the issue tracker.
    ///
    /// Results are uploaded to the test-management run given by --run-id, or to a new run if
    /// a Qase token and project are available. Reports are then published to one thread per
    /// classification key, and a consolidated report to the configured consolidated thread.
    Publish(Box<PublishOpts>),
    /// Print totals for a results file as shell-friendly KEY=VALUE lines.
    Summary(SummaryOpts),
    /// Print the bulk results payload for a results file as JSON.
    Entities(EntitiesOpts),
    /// Inspect stored run history.
    History {
        #[clap(subcommand)]
        command: HistoryCommand,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_app() {
        RunRelayApp::command().debug_assert();
    }

    #[test]
    fn output_env_vars() {
        let command = RunRelayApp::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .and_then(|env| env.to_str())
                .map(str::to_owned)
        };
        assert_eq!(env_of("color").as_deref(), Some("RUNRELAY_COLOR"));
        assert_eq!(env_of("verbose").as_deref(), Some("RUNRELAY_VERBOSE"));
    }

    #[test]
    fn parse_valid() {
        let valid: &[&str] = &[
            "runrelay publish",
            "runrelay publish --results results/output.xml --run-id 42",
            "runrelay publish --results out.json --format json --dry-run --run-id 7",
            "runrelay publish --config-file ci/runrelay.toml",
            "runrelay --color never publish",
            "runrelay summary --results results/output.xml",
            "runrelay summary -v",
            "runrelay entities --results qase_summary.json --format json",
            "runrelay history show DEMO-7",
            "runrelay history show --overall --config-file ci/runrelay.toml",
        ];

        for valid_args in valid {
            if let Err(error) = RunRelayApp::try_parse_from(shell_words(valid_args)) {
                panic!("{valid_args} should have successfully parsed, but didn't: {error}");
            }
        }
    }

    #[test]
    fn parse_invalid() {
        let invalid: &[(&str, clap::error::ErrorKind)] = &[
            (
                "runrelay publish --run-id abc",
                clap::error::ErrorKind::ValueValidation,
            ),
            (
                "runrelay summary --format yaml",
                clap::error::ErrorKind::ValueValidation,
            ),
            (
                "runrelay history show",
                clap::error::ErrorKind::MissingRequiredArgument,
            ),
            (
                "runrelay history show DEMO-7 --overall",
                clap::error::ErrorKind::ArgumentConflict,
            ),
            (
                "runrelay --color sometimes summary",
                clap::error::ErrorKind::InvalidValue,
            ),
        ];

        for (args, kind) in invalid {
            match RunRelayApp::try_parse_from(shell_words(args)) {
                Ok(_) => panic!("{args} should have errored out but successfully parsed"),
                Err(error) => assert_eq!(
                    error.kind(),
                    *kind,
                    "{args} should error with the right kind: {error}"
                ),
            }
        }
    }

    fn shell_words(args: &str) -> Vec<&str> {
        args.split_whitespace().collect()
    }
}
