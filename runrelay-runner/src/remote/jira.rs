// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    REQUEST_TIMEOUT,
    http::{USER_AGENT, build_agent, check_status},
};
use crate::{
    errors::RemoteError,
    publish::{Comment, CommentId, IssueTracker, ThreadId},
    render::Document,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::{Value, json};
use ureq::Agent;

const PAGE_SIZE: usize = 100;

/// An [`IssueTracker`] backed by the Jira Cloud REST API (version 3).
///
/// Issues are threads, and reports are sent as Atlassian Document Format comments.
pub struct JiraClient {
    agent: Agent,
    base_url: String,
    authorization: String,
}

impl JiraClient {
    /// Creates a client for the Jira site at `base_url`, authenticating with an account email
    /// and API token.
    pub fn new(base_url: &str, email: &str, api_token: &str) -> Self {
        let credentials = STANDARD.encode(format!("{email}:{api_token}"));
        Self {
            agent: build_agent(REQUEST_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_owned(),
            authorization: format!("Basic {credentials}"),
        }
    }

    fn comments_url(&self, thread: &ThreadId) -> String {
        format!("{}/rest/api/3/issue/{thread}/comment", self.base_url)
    }
}

impl IssueTracker for JiraClient {
    fn list_comments(&self, thread: &ThreadId) -> Result<Vec<Comment>, RemoteError> {
        let url = self.comments_url(thread);
        let mut comments = Vec::new();

        loop {
            let start_at = comments.len().to_string();
            let response = self
                .agent
                .get(&url)
                .header("Authorization", &self.authorization)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .query("orderBy", "-created")
                .query("startAt", &start_at)
                .query("maxResults", PAGE_SIZE.to_string())
                .call()
                .map_err(RemoteError::transport)?;
            let mut response = check_status(response)?;
            let page: CommentPage = response
                .body_mut()
                .read_json()
                .map_err(RemoteError::malformed_response)?;

            let page_len = page.comments.len();
            comments.extend(page.comments.into_iter().map(|comment| Comment {
                id: CommentId::new(comment.id),
                body: adf_plain_text(&comment.body),
            }));

            if page_len == 0 || comments.len() >= page.total {
                break;
            }
        }

        tracing::debug!("listed {} comments on {thread}", comments.len());
        Ok(comments)
    }

    fn create_comment(&self, thread: &ThreadId, body: &Document) -> Result<CommentId, RemoteError> {
        let response = self
            .agent
            .post(&self.comments_url(thread))
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_json(json!({ "body": body.to_adf() }))
            .map_err(RemoteError::transport)?;
        let mut response = check_status(response)?;
        let created: CreatedComment = response
            .body_mut()
            .read_json()
            .map_err(RemoteError::malformed_response)?;
        Ok(CommentId::new(created.id))
    }

    fn update_comment(
        &self,
        thread: &ThreadId,
        comment: &CommentId,
        body: &Document,
    ) -> Result<(), RemoteError> {
        let url = format!("{}/{comment}", self.comments_url(thread));
        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_json(json!({ "body": body.to_adf() }))
            .map_err(RemoteError::transport)?;
        check_status(response)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentPage {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    comments: Vec<ListedComment>,
}

#[derive(Debug, Deserialize)]
struct ListedComment {
    id: String,
    #[serde(default)]
    body: Value,
}

#[derive(Debug, Deserialize)]
struct CreatedComment {
    id: String,
}

/// Flattens an Atlassian Document Format body to plain text, one line per block.
///
/// Older API versions return bodies as plain strings, which are returned as-is.
fn adf_plain_text(body: &Value) -> String {
    fn walk(node: &Value, out: &mut String) {
        match node {
            Value::String(text) => out.push_str(text),
            Value::Array(nodes) => nodes.iter().for_each(|node| walk(node, out)),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    out.push_str(text);
                }
                if let Some(content) = map.get("content") {
                    walk(content, out);
                    let is_doc = map.get("type").and_then(Value::as_str) == Some("doc");
                    if !is_doc && !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }

    let mut out = String::new();
    walk(body, &mut out);
    out.trim_end().to_owned()
}
