// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report rendering.
//!
//! Rendering is pure: reports are built from outcomes, a history slice and options, without
//! reading the clock or performing I/O.

mod document;
mod report;

pub use document::*;
pub use report::*;
