// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read a JSON results summary.

use crate::RawOutcome;
use serde::Deserialize;
use std::io;

#[derive(Debug, Deserialize)]
struct ResultsSummary {
    results: Vec<ResultEntry>,
}

#[derive(Debug, Deserialize)]
struct ResultEntry {
    #[serde(default)]
    case_id: Option<u32>,
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    suite_path: Vec<String>,
}

fn default_name() -> String {
    "Unnamed Test".to_owned()
}

pub(crate) fn read_results_json(reader: impl io::Read) -> serde_json::Result<Vec<RawOutcome>> {
    let summary: ResultsSummary = serde_json::from_reader(reader)?;

    let outcomes = summary
        .results
        .into_iter()
        .enumerate()
        .map(|(index, entry)| RawOutcome {
            case_id: entry.case_id.unwrap_or((index + 1) as u32),
            name: entry.name,
            status: entry.status,
            message: entry.message,
            tags: entry.tags,
            suite_path: entry.suite_path,
        })
        .collect();
    Ok(outcomes)
}
