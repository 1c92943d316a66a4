// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Code analysis payloads
//!
//! Request and response shapes for the general code analysis call and the
//! variable declaration call. Responses are decoded leniently: the oracle is
//! a text model, so missing lists, `null` fields and empty records are all
//! accepted and treated as "nothing found".

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::range::LineRange;
use crate::serde_util::null_as_default;

/// Input of the general analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAnalysisRequest {
    /// Code text with `"<line>: "` prefixes, children already summarised
    pub code: String,
    /// Ranges to analyse, one output record expected per range
    pub ranges: Vec<LineRange>,
    /// Number of ranges
    pub count: usize,
}

impl CodeAnalysisRequest {
    pub fn new(code: impl Into<String>, ranges: Vec<LineRange>) -> Self {
        let count = ranges.len();
        Self {
            code: code.into(),
            ranges,
            count,
        }
    }
}

/// Output of the general analysis call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeAnalysis {
    /// One record per requested range, in request order
    #[serde(default, deserialize_with = "null_as_default")]
    pub analysis: Vec<Option<RangeAnalysis>>,
}

impl CodeAnalysis {
    pub fn new(records: Vec<RangeAnalysis>) -> Self {
        Self {
            analysis: records.into_iter().map(Some).collect(),
        }
    }
}

/// Analysis of one line range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeAnalysis {
    #[serde(default)]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub end_line: Option<u32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub table_names: Vec<String>,
    /// Called procedures, `NAME` or `PACKAGE.NAME`
    #[serde(default, deserialize_with = "null_as_default")]
    pub calls: Vec<String>,
    /// Variables referenced inside the range
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: Vec<String>,
}

impl RangeAnalysis {
    pub fn new(range: LineRange, summary: impl Into<String>) -> Self {
        Self {
            start_line: Some(range.start_line),
            end_line: Some(range.end_line),
            summary: Some(summary.into()),
            ..Default::default()
        }
    }

    pub fn with_calls(mut self, calls: Vec<&str>) -> Self {
        self.calls = calls.into_iter().map(String::from).collect();
        self
    }

    pub fn with_variables(mut self, variables: Vec<&str>) -> Self {
        self.variables = variables.into_iter().map(String::from).collect();
        self
    }

    pub fn with_table_names(mut self, tables: Vec<&str>) -> Self {
        self.table_names = tables.into_iter().map(String::from).collect();
        self
    }

    /// A record with no field at all; one carrying only its range is not empty
    pub fn is_empty(&self) -> bool {
        self.start_line.is_none()
            && self.end_line.is_none()
            && self.summary.is_none()
            && self.calls.is_empty()
            && self.variables.is_empty()
            && self.table_names.is_empty()
    }
}

/// Output of the variable declaration call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: Vec<DeclaredVariable>,
}

/// One declared variable or parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredVariable {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub var_type: Option<String>,
    #[serde(default)]
    pub parameter_type: Option<String>,
    /// Initial value, kept as whatever JSON the oracle produced
    #[serde(default)]
    pub value: Option<Value>,
}
