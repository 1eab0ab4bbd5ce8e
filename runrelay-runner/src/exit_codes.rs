// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `runrelay` failures.
///
/// `runrelay` invocations may fail for a variety of reasons. This structure documents the exit
/// codes that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum RunRelayExitCode {}

impl RunRelayExitCode {
    /// No errors occurred and runrelay exited normally.
    pub const OK: i32 = 0;

    /// At least one report or the result upload failed to publish. Other reports were still
    /// attempted.
    pub const PUBLISH_FAILED: i32 = 100;

    /// The results file could not be read or parsed.
    pub const RESULTS_READ_FAILED: i32 = 101;

    /// A test in the results file had a status that runrelay does not recognize.
    pub const UNRECOGNIZED_STATUS: i32 = 102;

    /// No test-management run identifier was available, so nothing was published.
    pub const MISSING_RUN_IDENTIFIER: i32 = 103;

    /// A user issue happened while setting up a runrelay invocation: invalid configuration,
    /// missing credentials or invalid arguments.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
