// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Replay Oracle
//!
//! This module provides an oracle that answers from a recorded JSON document
//! instead of calling a model. It is used for offline runs, demos and tests.
//!
//! ## Document layout
//!
//! ```json
//! {
//!   "analysis":  { "3-7": { "summary": "...", "calls": ["PKG.PROC"] } },
//!   "tables":    { "5-5": [ { "table": "HR.EMP", "dmlType": "SELECT" } ] },
//!   "variables": { "2-2": { "summary": "...", "variables": [ ... ] } },
//!   "procedures": { "SELECT_5_5": "Reads employees" },
//!   "tableSummaries": { "HR.EMP": { "tableDescription": "..." } }
//! }
//! ```
//!
//! Ranges are keyed `"<start>-<end>"`. A procedure summary is found through
//! any one of its fragment keys; a declaration is found through the first and
//! last line numbers of the code it is asked about.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sql_understanding_ir::{LineRange, RangeAnalysis, TableEntry};

use crate::metadata::{
    CodeAnalysis, CodeAnalysisRequest, ProcedureFragments, TableAnalysis, TableAnalysisRequest,
    TableSummary, TableSummaryRequest, VariableAnalysis,
};
use crate::{Oracle, OracleError, OracleResult};

/// Recorded oracle answers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayDocument {
    #[serde(default)]
    pub analysis: HashMap<String, RangeAnalysis>,
    #[serde(default)]
    pub tables: HashMap<String, Vec<TableEntry>>,
    #[serde(default)]
    pub variables: HashMap<String, VariableAnalysis>,
    #[serde(default)]
    pub procedures: HashMap<String, String>,
    #[serde(default)]
    pub table_summaries: HashMap<String, TableSummary>,
}

/// Oracle backed by a [`ReplayDocument`]
pub struct ReplayOracle {
    document: ReplayDocument,
}

impl ReplayOracle {
    pub fn new(document: ReplayDocument) -> Self {
        Self { document }
    }

    pub fn from_json(json: &str) -> OracleResult<Self> {
        let document = serde_json::from_str(json)
            .map_err(|e| OracleError::InvalidDocument(e.to_string()))?;
        Ok(Self::new(document))
    }

    pub fn from_file(path: impl AsRef<Path>) -> OracleResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| OracleError::InvalidDocument(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn document(&self) -> &ReplayDocument {
        &self.document
    }
}

/// Range spanned by `"<line>: ..."` prefixed code
pub fn code_range(code: &str) -> Option<LineRange> {
    let mut numbers = code
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(prefix, _)| prefix.trim().parse::<u32>().ok());
    let first = numbers.next()?;
    let last = numbers.last().unwrap_or(first);
    Some(LineRange::new(first, last))
}

#[async_trait]
impl Oracle for ReplayOracle {
    async fn analyze_code(&self, request: &CodeAnalysisRequest) -> OracleResult<Option<CodeAnalysis>> {
        let analysis = request
            .ranges
            .iter()
            .map(|range| {
                let record = self.document.analysis.get(&range.key()).cloned();
                if record.is_none() {
                    tracing::debug!("No recorded analysis for range {}", range);
                }
                record
            })
            .collect();
        Ok(Some(CodeAnalysis { analysis }))
    }

    async fn analyze_tables(
        &self,
        request: &TableAnalysisRequest,
    ) -> OracleResult<Option<TableAnalysis>> {
        let tables: Vec<TableEntry> = request
            .ranges
            .iter()
            .filter_map(|range| self.document.tables.get(&range.range().key()))
            .flatten()
            .cloned()
            .collect();
        if tables.is_empty() {
            return Ok(None);
        }
        Ok(Some(TableAnalysis { tables }))
    }

    async fn summarize_procedure(&self, fragments: &ProcedureFragments) -> OracleResult<Option<String>> {
        Ok(fragments
            .keys()
            .find_map(|key| self.document.procedures.get(key))
            .cloned())
    }

    async fn summarize_table(
        &self,
        request: &TableSummaryRequest,
    ) -> OracleResult<Option<TableSummary>> {
        Ok(self.document.table_summaries.get(&request.table_display).cloned())
    }

    async fn analyze_variables(&self, code: &str) -> OracleResult<Option<VariableAnalysis>> {
        Ok(code_range(code).and_then(|range| self.document.variables.get(&range.key()).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_understanding_ir::{DmlRange, StatementType};

    const DOCUMENT: &str = r#"{
        "analysis": {
            "2-4": { "summary": "checks stock", "calls": ["INV.RESERVE"] }
        },
        "tables": {
            "3-3": [ { "startLine": 3, "endLine": 3, "table": "INV.STOCK", "dmlType": "SELECT" } ]
        },
        "variables": {
            "1-2": { "summary": "counters", "variables": [ { "name": "v_qty", "type": "NUMBER" } ] }
        },
        "procedures": { "IF_2_4": "Reserves stock" },
        "tableSummaries": { "INV.STOCK": { "tableDescription": "Stock levels" } }
    }"#;

    #[test]
    fn test_code_range_from_prefixes() {
        assert_eq!(code_range("7: a\n8: b\n9: c"), Some(LineRange::new(7, 9)));
        assert_eq!(code_range("12: x"), Some(LineRange::new(12, 12)));
        assert_eq!(code_range("no prefix"), None);
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let result = ReplayOracle::from_json("{ not json");
        assert!(matches!(result, Err(OracleError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn test_analysis_follows_request_order() {
        let oracle = ReplayOracle::from_json(DOCUMENT).unwrap();
        let request = CodeAnalysisRequest::new(
            "2: IF x THEN\n3: ...\n4: END IF;",
            vec![LineRange::new(9, 9), LineRange::new(2, 4)],
        );
        let result = oracle.analyze_code(&request).await.unwrap().unwrap();
        assert_eq!(result.analysis.len(), 2);
        assert!(result.analysis[0].is_none());
        assert_eq!(result.analysis[1].as_ref().unwrap().calls, vec!["INV.RESERVE"]);
    }

    #[tokio::test]
    async fn test_document_with_null_table_fields() {
        let oracle = ReplayOracle::from_json(
            r#"{ "tables": { "6-6": [ {
                "table": "INV.STOCK", "dmlType": "UPDATE",
                "columns": [ { "name": "qty", "nullable": null } ],
                "dbLinks": [ { "name": "INV.STOCK@WH", "mode": null } ]
            } ] } }"#,
        )
        .unwrap();

        let request = TableAnalysisRequest {
            code: "6: UPDATE inv.stock SET qty = 0;".to_string(),
            ranges: vec![DmlRange {
                start_line: 6,
                end_line: 6,
                statement_type: StatementType::Update,
            }],
        };
        let tables = oracle.analyze_tables(&request).await.unwrap().unwrap();
        let entry = &tables.tables[0];
        assert!(entry.columns[0].nullable);
        assert_eq!(entry.db_links[0].access_mode(), "r");
    }

    #[tokio::test]
    async fn test_tables_and_summaries() {
        let oracle = ReplayOracle::from_json(DOCUMENT).unwrap();

        let request = TableAnalysisRequest {
            code: "3: SELECT qty FROM inv.stock;".to_string(),
            ranges: vec![DmlRange {
                start_line: 3,
                end_line: 3,
                statement_type: StatementType::Select,
            }],
        };
        let tables = oracle.analyze_tables(&request).await.unwrap().unwrap();
        assert_eq!(tables.tables[0].table.as_deref(), Some("INV.STOCK"));

        let mut fragments = ProcedureFragments::new();
        fragments.insert("IF_2_4".to_string(), "checks stock".to_string());
        let summary = oracle.summarize_procedure(&fragments).await.unwrap();
        assert_eq!(summary.as_deref(), Some("Reserves stock"));

        let variables = oracle.analyze_variables("1: v_qty NUMBER;\n2: v_ok BOOLEAN;").await.unwrap();
        assert_eq!(variables.unwrap().variables[0].name, "v_qty");
    }

    #[tokio::test]
    async fn test_unknown_keys_answer_none() {
        let oracle = ReplayOracle::new(ReplayDocument::default());
        let request = TableSummaryRequest {
            table_display: "MISSING".to_string(),
            summaries: vec![],
            columns: Default::default(),
        };
        assert!(oracle.summarize_table(&request).await.unwrap().is_none());
        assert!(oracle.summarize_procedure(&ProcedureFragments::new()).await.unwrap().is_none());
    }
}
