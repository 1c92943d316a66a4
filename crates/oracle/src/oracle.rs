// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Oracle trait for code understanding
//!
//! This module defines the async Oracle trait used to obtain structured
//! annotations for statement ranges, tables and procedures.

use crate::error::OracleResult;
use crate::metadata::{
    CodeAnalysis, CodeAnalysisRequest, ProcedureFragments, TableAnalysis, TableAnalysisRequest,
    TableSummary, TableSummaryRequest, VariableAnalysis,
};

/// Oracle trait for code understanding
///
/// Implementations may call a hosted model, a local one, or replay recorded
/// answers. No retry or timeout is applied by callers: an error returned here
/// is final for that call.
///
/// # Examples
///
/// ```rust,ignore
/// use sql_understanding_oracle::{CodeAnalysisRequest, Oracle};
///
/// async fn summaries(oracle: &impl Oracle, code: &str, ranges: Vec<LineRange>) -> Vec<String> {
///     let request = CodeAnalysisRequest::new(code, ranges);
///     match oracle.analyze_code(&request).await {
///         Ok(Some(result)) => result.analysis.into_iter().flatten().filter_map(|r| r.summary).collect(),
///         _ => Vec::new(),
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    /// Summarise each requested range of the (compacted) code
    ///
    /// # Returns
    ///
    /// One record per requested range, in request order. Records may be
    /// missing or empty.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::CallFailed` if the service call fails.
    async fn analyze_code(&self, request: &CodeAnalysisRequest) -> OracleResult<Option<CodeAnalysis>>;

    /// Extract tables, columns, database links and foreign keys from DML code
    async fn analyze_tables(
        &self,
        request: &TableAnalysisRequest,
    ) -> OracleResult<Option<TableAnalysis>>;

    /// Consolidate the summary fragments of one procedure
    ///
    /// # Arguments
    ///
    /// * `fragments` - Fragment key (`<TYPE>_<start>_<end>`) to summary text
    async fn summarize_procedure(&self, fragments: &ProcedureFragments) -> OracleResult<Option<String>>;

    /// Consolidate the description fragments collected for one table
    async fn summarize_table(
        &self,
        request: &TableSummaryRequest,
    ) -> OracleResult<Option<TableSummary>>;

    /// Describe the variables declared by a DECLARE, SPEC or PACKAGE_VARIABLE node
    ///
    /// # Arguments
    ///
    /// * `code` - Raw declaration code with line prefixes
    async fn analyze_variables(&self, code: &str) -> OracleResult<Option<VariableAnalysis>>;
}
