// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Line ranges sent to the oracle alongside code payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::statement::StatementType;

/// Inclusive line range of one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

impl LineRange {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// Key used by recorded oracle documents, e.g. `"12-14"`
    pub fn key(&self) -> String {
        format!("{}-{}", self.start_line, self.end_line)
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_line, self.end_line)
    }
}

/// Line range of a DML statement, tagged with its statement type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmlRange {
    pub start_line: u32,
    pub end_line: u32,
    #[serde(rename = "type")]
    pub statement_type: StatementType,
}

impl DmlRange {
    pub fn range(&self) -> LineRange {
        LineRange::new(self.start_line, self.end_line)
    }
}
