// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay the results of a CI test run to a test-management service and an issue tracker.
//!
//! `runrelay publish` reads a Robot Framework `output.xml` (or a JSON results summary), uploads
//! the results to a test-management run, and keeps one report comment per issue up to date,
//! with a rolling history of earlier runs.
//!
//! Configuration lives in `.config/runrelay.toml`. Credentials are read from the environment.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
