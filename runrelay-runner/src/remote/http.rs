// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::RemoteError;
use std::time::Duration;
use ureq::{Agent, Body, http::Response};

pub(super) const USER_AGENT: &str = concat!("runrelay/", env!("CARGO_PKG_VERSION"));

const BODY_EXCERPT_CHARS: usize = 200;

/// Builds an agent that returns non-2xx responses instead of erroring, so that the status can be
/// classified by [`check_status`].
pub(super) fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Maps a non-2xx response to an error.
pub(super) fn check_status(mut response: Response<Body>) -> Result<Response<Body>, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        404 => Err(RemoteError::NotFound),
        status @ (401 | 403) => Err(RemoteError::Unauthorized { status }),
        status => {
            // The body is only used for the error message.
            let body = response.body_mut().read_to_string().unwrap_or_default();
            Err(RemoteError::Status {
                status,
                body: excerpt(&body),
            })
        }
    }
}

/// Returns the start of `body` on a single line.
fn excerpt(body: &str) -> String {
    let flattened = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= BODY_EXCERPT_CHARS {
        return flattened;
    }
    let mut excerpt: String = flattened.chars().take(BODY_EXCERPT_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_excerpt() {
        assert_eq!(excerpt("  {\"error\":\n  \"bad\"}\n"), "{\"error\": \"bad\"}");
        assert_eq!(excerpt(""), "");
    }

    #[test]
    fn long_excerpt() {
        let body = "x".repeat(500);
        let excerpt = excerpt(&body);
        assert_eq!(excerpt.len(), BODY_EXCERPT_CHARS + 3);
        assert!(excerpt.ends_with("..."));
    }
}
