// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Oracle payload types
//!
//! This module re-exports the request and response types from the
//! `sql-understanding-ir` crate so oracle implementors only need this crate.

use std::collections::BTreeMap;

// Re-export all payload types from the ir crate
pub use sql_understanding_ir::{
    CodeAnalysis, CodeAnalysisRequest, TableAnalysis, TableAnalysisRequest, TableSummary,
    TableSummaryRequest, VariableAnalysis,
};

/// Summary fragments of one procedure, keyed by `<TYPE>_<start>_<end>`
pub type ProcedureFragments = BTreeMap<String, String>;
