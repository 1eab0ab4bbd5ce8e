// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Options shared between subcommands.

use crate::{ExpectedError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use robot_results::{RawResults, ResultsFormat, ResultsReadError};
use runrelay_runner::{
    config::RunRelayConfig,
    remote::{JiraClient, QaseClient},
};

/// Configuration options.
#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
pub(crate) struct ConfigOpts {
    /// Config file [default: .config/runrelay.toml in the current directory].
    #[arg(long, value_name = "PATH")]
    pub(crate) config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    /// Creates a runrelay config with the given options, relative to the current directory.
    pub(crate) fn make_config(&self) -> Result<RunRelayConfig> {
        RunRelayConfig::from_sources(Utf8Path::new("."), self.config_file.as_deref())
            .map_err(ExpectedError::from)
    }
}

/// Options selecting the results file to read.
#[derive(Debug, Args)]
#[command(next_help_heading = "Results options")]
pub(crate) struct ResultsOpts {
    /// Path to the results file.
    #[arg(
        long,
        value_name = "PATH",
        env = "RUNRELAY_RESULTS",
        default_value = "results/output.xml"
    )]
    pub(crate) results: Utf8PathBuf,

    /// Results file format: robot-xml, json [default: from the file extension].
    #[arg(long, value_name = "FORMAT")]
    pub(crate) format: Option<ResultsFormat>,
}

impl ResultsOpts {
    pub(crate) fn format(&self) -> ResultsFormat {
        self.format
            .unwrap_or_else(|| ResultsFormat::from_path(&self.results))
    }

    pub(crate) fn read(&self) -> Result<RawResults, ResultsReadError> {
        tracing::debug!("reading {} results from {}", self.format(), self.results);
        RawResults::from_path(&self.results, self.format())
    }
}

/// Service endpoints and credentials. Tokens should be passed through the environment.
#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Service options")]
pub(crate) struct ServiceOpts {
    /// Qase API token.
    #[arg(long, env = "QASE_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    qase_api_token: Option<String>,

    /// Qase project code [default: `qase.project` from config].
    #[arg(long, env = "QASE_PROJECT_CODE", value_name = "CODE")]
    qase_project: Option<String>,

    /// Jira site URL [default: `jira.base-url` from config].
    #[arg(long, env = "JIRA_BASE_URL", value_name = "URL")]
    jira_base_url: Option<String>,

    /// Jira account email.
    #[arg(long, env = "JIRA_EMAIL", value_name = "EMAIL")]
    jira_email: Option<String>,

    /// Jira API token.
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    jira_api_token: Option<String>,
}

impl ServiceOpts {
    /// Returns the Qase project code, from the command line or the config.
    pub(crate) fn qase_project(&self, config: &RunRelayConfig) -> Option<String> {
        self.qase_project
            .clone()
            .or_else(|| config.qase().project.clone())
    }

    /// Returns a Qase client and project, if a token is available.
    pub(crate) fn qase_client(&self, config: &RunRelayConfig) -> Result<Option<(QaseClient, String)>> {
        let Some(token) = &self.qase_api_token else {
            return Ok(None);
        };
        let Some(project) = self.qase_project(config) else {
            return Err(ExpectedError::missing_credentials(
                "Qase",
                vec!["QASE_PROJECT_CODE"],
            ));
        };
        let client = QaseClient::new(&config.qase().api_base, token.clone());
        Ok(Some((client, project)))
    }

    /// Returns a Jira client if any Jira setting is available, failing if only some are.
    pub(crate) fn jira_client(&self, config: &RunRelayConfig) -> Result<Option<JiraClient>> {
        let base_url = self
            .jira_base_url
            .as_deref()
            .or(config.jira().base_url.as_deref());
        // Jira is in use as soon as either credential is set.
        match (base_url, &self.jira_email, &self.jira_api_token) {
            (Some(base_url), Some(email), Some(token)) => {
                Ok(Some(JiraClient::new(base_url, email, token)))
            }
            (_, None, None) => Ok(None),
            (base_url, email, token) => {
                let missing = [
                    ("JIRA_BASE_URL", base_url.is_none()),
                    ("JIRA_EMAIL", email.is_none()),
                    ("JIRA_API_TOKEN", token.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                Err(ExpectedError::missing_credentials("Jira", missing))
            }
        }
    }
}
