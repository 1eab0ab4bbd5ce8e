// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    REQUEST_TIMEOUT,
    http::{USER_AGENT, build_agent, check_status},
};
use crate::{
    errors::RemoteError,
    normalize::{Outcome, TestOutcome},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use ureq::Agent;

/// The default Qase API base URL.
pub const DEFAULT_QASE_API_BASE: &str = "https://api.qase.io/v1";

/// Identifies a run in the test-management service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    /// Creates a new run identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the identifier as an integer.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata for a new run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSpec {
    /// The run title.
    pub title: String,

    /// The run description.
    pub description: String,

    /// The environment the run executed in, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Whether the run was automated.
    pub is_autotest: bool,
}

/// One test result, as uploaded to the test-management service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultEntity {
    /// The test case.
    pub case_id: u32,

    /// The outcome.
    pub status: Outcome,

    /// A comment attached to the result, typically the failure message.
    pub comment: String,
}

impl ResultEntity {
    /// Creates an entity for a test outcome.
    pub fn from_outcome(outcome: &TestOutcome) -> Self {
        Self {
            case_id: outcome.identifier,
            status: outcome.outcome,
            comment: outcome.message.clone(),
        }
    }
}

/// Builds result entities for every outcome, in order.
pub fn result_entities(outcomes: &[TestOutcome]) -> Vec<ResultEntity> {
    outcomes.iter().map(ResultEntity::from_outcome).collect()
}

/// The request body for a bulk upload.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ResultsPayload<'a> {
    /// The results.
    pub results: &'a [ResultEntity],
}

/// A test-management service that runs and their results can be sent to.
pub trait TestManagement {
    /// Creates a run in `project`.
    fn create_run(&self, project: &str, spec: &RunSpec) -> Result<RunId, RemoteError>;

    /// Uploads results to an existing run.
    fn bulk_upload_results(
        &self,
        project: &str,
        run_id: RunId,
        results: &[ResultEntity],
    ) -> Result<(), RemoteError>;
}

/// A [`TestManagement`] implementation backed by the Qase API.
pub struct QaseClient {
    agent: Agent,
    api_base: String,
    token: String,
}

impl QaseClient {
    /// Creates a client for the API at `api_base`, authenticating with `token`.
    pub fn new(api_base: &str, token: impl Into<String>) -> Self {
        Self {
            agent: build_agent(REQUEST_TIMEOUT),
            api_base: api_base.trim_end_matches('/').to_owned(),
            token: token.into(),
        }
    }
}

impl TestManagement for QaseClient {
    fn create_run(&self, project: &str, spec: &RunSpec) -> Result<RunId, RemoteError> {
        let response = self
            .agent
            .post(&format!("{}/run/{project}", self.api_base))
            .header("Token", &self.token)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_json(spec)
            .map_err(RemoteError::transport)?;
        let mut response = check_status(response)?;
        let created: QaseResponse<CreatedRun> = response
            .body_mut()
            .read_json()
            .map_err(RemoteError::malformed_response)?;

        let run = created.into_result("run creation")?;
        tracing::info!("created run {} in project {project}", run.id);
        Ok(RunId::new(run.id))
    }

    fn bulk_upload_results(
        &self,
        project: &str,
        run_id: RunId,
        results: &[ResultEntity],
    ) -> Result<(), RemoteError> {
        let response = self
            .agent
            .post(&format!("{}/result/{project}/{run_id}/bulk", self.api_base))
            .header("Token", &self.token)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_json(ResultsPayload { results })
            .map_err(RemoteError::transport)?;
        check_status(response)?;
        tracing::info!(
            "uploaded {} results to run {run_id} in project {project}",
            results.len()
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct QaseResponse<T> {
    #[serde(default)]
    status: bool,
    result: Option<T>,
}

impl<T> QaseResponse<T> {
    fn into_result(self, what: &str) -> Result<T, RemoteError> {
        match (self.status, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(RemoteError::UnexpectedResponse {
                message: format!("{what} response did not report success"),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedRun {
    id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassificationKey;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn entities_payload() {
        let outcomes = vec![
            TestOutcome {
                identifier: 1,
                display_name: "Login test".to_owned(),
                outcome: Outcome::Passed,
                message: String::new(),
                classification_keys: [ClassificationKey::new("DEMO-7")].into_iter().collect(),
                suite_path: Vec::new(),
            },
            TestOutcome {
                identifier: 2,
                display_name: "Transfer test".to_owned(),
                outcome: Outcome::Failed,
                message: "Balance was 0".to_owned(),
                classification_keys: Default::default(),
                suite_path: Vec::new(),
            },
        ];

        let entities = result_entities(&outcomes);
        let payload = serde_json::to_value(ResultsPayload {
            results: &entities,
        })
        .expect("payload serializes");
        assert_eq!(
            payload,
            json!({
                "results": [
                    { "case_id": 1, "status": "passed", "comment": "" },
                    { "case_id": 2, "status": "failed", "comment": "Balance was 0" },
                ]
            })
        );
    }

    #[test]
    fn run_spec_omits_missing_environment() {
        let mut spec = RunSpec {
            title: "Automated Run from CI".to_owned(),
            description: "Triggered by CI pipeline.".to_owned(),
            environment: None,
            is_autotest: true,
        };
        assert_eq!(
            serde_json::to_value(&spec).expect("spec serializes"),
            json!({
                "title": "Automated Run from CI",
                "description": "Triggered by CI pipeline.",
                "is_autotest": true,
            })
        );

        spec.environment = Some("staging".to_owned());
        assert_eq!(
            serde_json::to_value(&spec).expect("spec serializes")["environment"],
            "staging"
        );
    }

    #[test]
    fn created_run_response() {
        let response: QaseResponse<CreatedRun> =
            serde_json::from_str(r#"{"status": true, "result": {"id": 17}}"#)
                .expect("response parses");
        assert_eq!(response.into_result("run creation").expect("success").id, 17);

        let response: QaseResponse<CreatedRun> =
            serde_json::from_str(r#"{"status": false, "errorMessage": "nope"}"#)
                .expect("response parses");
        let error = response.into_result("run creation").expect_err("failure");
        assert_eq!(
            error.to_string(),
            "unexpected response: run creation response did not report success"
        );
    }
}
