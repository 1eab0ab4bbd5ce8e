// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read test-execution results produced by Robot Framework.
//!
//! Two input formats are supported:
//!
//! * Robot Framework's `output.xml`, read as a stream with [`quick_xml`].
//! * A JSON results summary of the form
//!   `{"results": [{"case_id": 1, "name": "...", "status": "passed", "tags": [...]}]}`.
//!
//! Both produce the same [`RawOutcome`] entries. No interpretation of statuses or tags happens
//! here: raw statuses are passed through verbatim so that downstream consumers can decide how to
//! treat values they don't recognize.

mod errors;
mod outcome;
mod read_json;
mod read_xml;

pub use errors::*;
pub use outcome::*;

// Re-export `quick_xml::Result` so it can be used by downstream consumers.
pub use quick_xml::Result;
