// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! runrelay configuration.
//!
//! Configuration is layered: the default config embedded in the binary, then the repository's
//! `.config/runrelay.toml` (or a file passed in explicitly). Credentials are never read from
//! config files.

use crate::{
    classify::{ClassificationKey, ClassificationPattern},
    errors::{ConfigParseError, ConfigParseErrorKind},
    history::HistoryOptions,
    publish::ThreadId,
    remote::RunId,
    render::Link,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, File, FileFormat};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Overall configuration for runrelay.
#[derive(Clone, Debug)]
pub struct RunRelayConfig {
    run: RunConfig,
    history: HistoryConfig,
    pattern: ClassificationPattern,
    publish: PublishConfig,
    links: LinksConfig,
    qase: QaseConfig,
    jira: JiraConfig,
}

impl RunRelayConfig {
    /// The default location of the config within a directory.
    pub const CONFIG_PATH: &'static str = ".config/runrelay.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from `.config/runrelay.toml`
    /// in `root` if it exists.
    pub fn from_sources(root: &Utf8Path, file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        Self::build_and_deserialize(builder)
            .map_err(|kind| ConfigParseError::new(config_file, kind))
    }

    /// Reads the config from a TOML string layered over the default config.
    pub fn from_toml_str(config_file: &Utf8Path, contents: &str) -> Result<Self, ConfigParseError> {
        let builder =
            Self::make_default_config().add_source(File::from_str(contents, FileFormat::Toml));
        Self::build_and_deserialize(builder)
            .map_err(|kind| ConfigParseError::new(config_file, kind))
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        Self::build_and_deserialize(Self::make_default_config())
            .expect("default config is always valid")
    }

    /// Returns settings for runs created in the test-management service.
    pub fn run(&self) -> &RunConfig {
        &self.run
    }

    /// Returns history settings.
    pub fn history(&self) -> &HistoryConfig {
        &self.history
    }

    /// Returns the pattern tags must match to be classification keys.
    pub fn classification_pattern(&self) -> &ClassificationPattern {
        &self.pattern
    }

    /// Returns publishing settings.
    pub fn publish(&self) -> &PublishConfig {
        &self.publish
    }

    /// Returns link settings.
    pub fn links(&self) -> &LinksConfig {
        &self.links
    }

    /// Returns Qase settings.
    pub fn qase(&self) -> &QaseConfig {
        &self.qase
    }

    /// Returns Jira settings.
    pub fn jira(&self) -> &JiraConfig {
        &self.jira
    }

    fn make_default_config() -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigParseErrorKind> {
        let config = builder
            .build()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let deserialized: RunRelayConfigDeserialize =
            serde_ignored::deserialize(config, |path| {
                ignored.insert(path.to_string());
            })
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        for key in &ignored {
            tracing::warn!("ignoring unknown configuration key `{key}`");
        }

        deserialized.into_config()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunRelayConfigDeserialize {
    run: RunConfig,
    history: HistoryConfig,
    classification: ClassificationConfigDeserialize,
    publish: PublishConfig,
    links: LinksConfig,
    qase: QaseConfig,
    jira: JiraConfig,
}

impl RunRelayConfigDeserialize {
    fn into_config(self) -> Result<RunRelayConfig, ConfigParseErrorKind> {
        let pattern = ClassificationPattern::new(&self.classification.pattern).map_err(|error| {
            ConfigParseErrorKind::InvalidPattern {
                pattern: self.classification.pattern.clone(),
                error,
            }
        })?;

        let HistoryConfig {
            max_entries,
            recent_entries,
            ..
        } = self.history;
        if max_entries == 0 || recent_entries > max_entries {
            return Err(ConfigParseErrorKind::InvalidHistoryBounds {
                max_entries,
                recent_entries,
            });
        }

        Ok(RunRelayConfig {
            run: self.run,
            history: self.history,
            pattern,
            publish: self.publish,
            links: self.links,
            qase: self.qase,
            jira: self.jira,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClassificationConfigDeserialize {
    pattern: String,
}

/// Settings for runs created in the test-management service.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    /// The run title.
    pub title: String,

    /// The run description.
    pub description: String,

    /// The environment recorded on the run.
    #[serde(default)]
    pub environment: Option<String>,
}

/// History settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HistoryConfig {
    /// The directory history files are stored in, relative to the invocation directory.
    pub dir: Utf8PathBuf,

    /// The maximum number of runs retained per key.
    pub max_entries: usize,

    /// The number of recent runs shown in trend blocks.
    pub recent_entries: usize,
}

impl HistoryConfig {
    /// Returns the bounds to apply to history stores.
    pub fn options(&self) -> HistoryOptions {
        HistoryOptions {
            max_entries: self.max_entries,
            recent_entries: self.recent_entries,
        }
    }
}

/// Publishing settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PublishConfig {
    /// The title shared by every published report.
    pub marker: String,

    /// Whether each key's report is published to the issue with that key.
    pub per_key_threads: bool,

    /// The thread the consolidated report is published to.
    #[serde(default)]
    pub consolidated_thread: Option<String>,

    /// Threads to use instead of the key itself, by key.
    #[serde(default)]
    pub thread_overrides: IndexMap<String, String>,
}

impl PublishConfig {
    /// Returns the thread the report for `key` is published to, if any.
    ///
    /// Overrides take precedence. Otherwise the key itself is the thread if per-key threads are
    /// enabled.
    pub fn thread_for(&self, key: &ClassificationKey) -> Option<ThreadId> {
        // Issue keys are case-insensitive.
        let overridden = self
            .thread_overrides
            .iter()
            .find(|(from, _)| from.eq_ignore_ascii_case(key.as_str()));
        if let Some((_, thread)) = overridden {
            return Some(ThreadId::new(thread.as_str()));
        }
        self.per_key_threads.then(|| ThreadId::new(key.as_str()))
    }

    /// Returns the thread the consolidated report is published to, if any.
    pub fn consolidated_thread(&self) -> Option<ThreadId> {
        self.consolidated_thread
            .as_deref()
            .filter(|thread| !thread.is_empty())
            .map(ThreadId::new)
    }
}

/// Link settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinksConfig {
    /// Whether artifact links are appended to reports.
    pub include: bool,

    /// A URL template for test-management runs.
    #[serde(default)]
    pub run_url: Option<String>,

    /// URL templates for build artifacts.
    #[serde(default)]
    pub artifacts: Vec<ArtifactLinkConfig>,
}

impl LinksConfig {
    /// Returns the URL of a run, if a template is configured.
    pub fn run_url(&self, project: Option<&str>, run_id: RunId) -> Option<String> {
        self.run_url
            .as_deref()
            .filter(|template| !template.is_empty())
            .map(|template| expand_template(template, project, run_id))
    }

    /// Returns artifact links with placeholders expanded.
    pub fn artifact_links(&self, project: Option<&str>, run_id: RunId) -> Vec<Link> {
        self.artifacts
            .iter()
            .map(|artifact| Link {
                label: artifact.label.clone(),
                url: expand_template(&artifact.url, project, run_id),
            })
            .collect()
    }
}

/// A link to a build artifact.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArtifactLinkConfig {
    /// The link text.
    pub label: String,

    /// The URL template.
    pub url: String,
}

/// Qase settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QaseConfig {
    /// The base URL of the Qase API.
    pub api_base: String,

    /// The project code.
    #[serde(default)]
    pub project: Option<String>,
}

/// Jira settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JiraConfig {
    /// The Jira site URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn expand_template(template: &str, project: Option<&str>, run_id: RunId) -> String {
    template
        .replace("{project}", project.unwrap_or_default())
        .replace("{run_id}", &run_id.to_string())
}
