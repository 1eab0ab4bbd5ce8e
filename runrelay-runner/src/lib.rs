// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [runrelay](https://crates.io/crates/runrelay).
//!
//! runrelay takes the results of an automated test run, groups them by the issue-tracker keys
//! found in test tags, keeps a rolling per-key history across runs, and publishes a report to
//! each issue. Reports are updated in place on later runs rather than appended.
//!
//! The main entry point is [`coordinator::RunCoordinator`].

pub mod classify;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod exit_codes;
pub mod history;
pub mod normalize;
pub mod publish;
pub mod remote;
pub mod render;
