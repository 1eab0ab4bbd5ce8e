// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clients for external services.
//!
//! All calls are blocking, with a fixed overall timeout per request and no retries. Every
//! failure is reported as a [`RemoteError`](crate::errors::RemoteError).

mod http;
mod jira;
mod qase;

pub use jira::*;
pub use qase::*;

use std::time::Duration;

/// The overall timeout applied to each request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
