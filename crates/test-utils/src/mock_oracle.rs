// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock oracle implementation for testing
//!
//! Answers by line range, with optional per-range delays and failures, and
//! records every call so tests can inspect what the pipeline asked for.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sql_understanding_ir::{
    ColumnDescription, LineRange, RangeAnalysis, TableEntry,
};
use sql_understanding_oracle::{
    CodeAnalysis, CodeAnalysisRequest, Oracle, OracleError, OracleResult, ProcedureFragments,
    TableAnalysis, TableAnalysisRequest, TableSummary, TableSummaryRequest, VariableAnalysis,
    code_range,
};

/// One recorded oracle call
#[derive(Debug, Clone, PartialEq)]
pub enum OracleEvent {
    /// General analysis, with the range keys of the request
    Code { ranges: Vec<String>, code: String },
    Tables { ranges: Vec<String> },
    Procedure { fragments: ProcedureFragments },
    Table { request: TableSummaryRequest },
    Variables { code: String },
}

/// In-memory mock oracle for testing
#[derive(Debug, Default)]
pub struct MockOracle {
    analysis: HashMap<String, RangeAnalysis>,
    tables: HashMap<String, Vec<TableEntry>>,
    variables: HashMap<String, VariableAnalysis>,
    delays: HashMap<String, Duration>,
    failing_ranges: HashSet<String>,
    fail_procedures: bool,
    fail_tables: bool,
    events: Mutex<Vec<OracleEvent>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call made so far, in call order
    pub fn events(&self) -> Vec<OracleEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Range keys of every general analysis call, in call order
    pub fn code_calls(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OracleEvent::Code { ranges, .. } => Some(ranges),
                _ => None,
            })
            .collect()
    }

    /// Code sent with the general analysis call covering `range`
    pub fn code_sent_for(&self, range: &str) -> Option<String> {
        self.events().into_iter().find_map(|event| match event {
            OracleEvent::Code { ranges, code } if ranges.iter().any(|r| r == range) => Some(code),
            _ => None,
        })
    }

    pub fn procedure_calls(&self) -> Vec<ProcedureFragments> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OracleEvent::Procedure { fragments } => Some(fragments),
                _ => None,
            })
            .collect()
    }

    pub fn table_calls(&self) -> Vec<TableSummaryRequest> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OracleEvent::Table { request } => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Highest number of general analysis calls observed in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn record(&self, event: OracleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.active)
    }

    async fn pause(&self, keys: &[String]) {
        let delay = keys.iter().filter_map(|k| self.delays.get(k)).max().copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_failure(&self, keys: &[String]) -> OracleResult<()> {
        match keys.iter().find(|k| self.failing_ranges.contains(*k)) {
            Some(key) => Err(OracleError::CallFailed(format!("mock failure for {key}"))),
            None => Ok(()),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Oracle for MockOracle {
    async fn analyze_code(&self, request: &CodeAnalysisRequest) -> OracleResult<Option<CodeAnalysis>> {
        let keys: Vec<String> = request.ranges.iter().map(LineRange::key).collect();
        self.record(OracleEvent::Code {
            ranges: keys.clone(),
            code: request.code.clone(),
        });

        let _guard = self.enter();
        self.pause(&keys).await;
        self.check_failure(&keys)?;

        let analysis = keys.iter().map(|k| self.analysis.get(k).cloned()).collect();
        Ok(Some(CodeAnalysis { analysis }))
    }

    async fn analyze_tables(&self, request: &TableAnalysisRequest) -> OracleResult<Option<TableAnalysis>> {
        let keys: Vec<String> = request.ranges.iter().map(|r| r.range().key()).collect();
        self.record(OracleEvent::Tables { ranges: keys.clone() });

        self.pause(&keys).await;
        self.check_failure(&keys)?;

        let tables: Vec<TableEntry> = keys
            .iter()
            .filter_map(|k| self.tables.get(k))
            .flatten()
            .cloned()
            .collect();
        if tables.is_empty() {
            return Ok(None);
        }
        Ok(Some(TableAnalysis { tables }))
    }

    async fn summarize_procedure(&self, fragments: &ProcedureFragments) -> OracleResult<Option<String>> {
        self.record(OracleEvent::Procedure {
            fragments: fragments.clone(),
        });
        if self.fail_procedures {
            return Err(OracleError::CallFailed("procedure summary unavailable".to_string()));
        }
        Ok(Some(format!("Procedure built from {} fragments", fragments.len())))
    }

    async fn summarize_table(&self, request: &TableSummaryRequest) -> OracleResult<Option<TableSummary>> {
        self.record(OracleEvent::Table {
            request: request.clone(),
        });
        if self.fail_tables {
            return Err(OracleError::CallFailed("table summary unavailable".to_string()));
        }

        let table_description = (!request.summaries.is_empty())
            .then(|| format!("{}: {}", request.table_display, request.summaries.join("; ")));
        let columns = request
            .columns
            .iter()
            .map(|(name, fragments)| ColumnDescription {
                name: name.clone(),
                description: fragments.join("; "),
            })
            .collect();
        Ok(Some(TableSummary {
            table_description,
            columns,
        }))
    }

    async fn analyze_variables(&self, code: &str) -> OracleResult<Option<VariableAnalysis>> {
        self.record(OracleEvent::Variables {
            code: code.to_string(),
        });
        let key = code_range(code).map(|r| r.key());
        match key {
            Some(key) if self.failing_ranges.contains(&key) => {
                Err(OracleError::CallFailed(format!("mock failure for {key}")))
            }
            Some(key) => Ok(self.variables.get(&key).cloned()),
            None => Ok(None),
        }
    }
}

/// Builder for creating mock oracles with a fluent API
#[derive(Default)]
pub struct MockOracleBuilder {
    oracle: MockOracle,
}

impl MockOracleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer general analysis for `start-end` with this record
    pub fn with_analysis(mut self, start: u32, end: u32, record: RangeAnalysis) -> Self {
        self.oracle.analysis.insert(LineRange::new(start, end).key(), record);
        self
    }

    /// Shorthand for a record carrying only a summary
    pub fn with_summary(self, start: u32, end: u32, summary: &str) -> Self {
        self.with_analysis(start, end, RangeAnalysis::new(LineRange::new(start, end), summary))
    }

    /// Answer table analysis for the DML statement at `start-end`
    pub fn with_table(mut self, start: u32, end: u32, entry: TableEntry) -> Self {
        self.oracle
            .tables
            .entry(LineRange::new(start, end).key())
            .or_default()
            .push(entry);
        self
    }

    pub fn with_variables(mut self, start: u32, end: u32, analysis: VariableAnalysis) -> Self {
        self.oracle.variables.insert(LineRange::new(start, end).key(), analysis);
        self
    }

    /// Delay any batch call covering `start-end`
    pub fn with_delay(mut self, start: u32, end: u32, delay: Duration) -> Self {
        self.oracle.delays.insert(LineRange::new(start, end).key(), delay);
        self
    }

    /// Fail any batch or declaration call covering `start-end`
    pub fn failing_at(mut self, start: u32, end: u32) -> Self {
        self.oracle.failing_ranges.insert(LineRange::new(start, end).key());
        self
    }

    pub fn failing_procedure_summaries(mut self) -> Self {
        self.oracle.fail_procedures = true;
        self
    }

    pub fn failing_table_summaries(mut self) -> Self {
        self.oracle.fail_tables = true;
        self
    }

    pub fn build(self) -> MockOracle {
        self.oracle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_oracle_answers_by_range() {
        let oracle = MockOracleBuilder::new()
            .with_summary(2, 3, "loops over orders")
            .build();

        let request = CodeAnalysisRequest::new(
            "2: LOOP\n3: END LOOP;\n\n5: x := 1;",
            vec![LineRange::new(2, 3), LineRange::new(5, 5)],
        );
        let analysis = oracle.analyze_code(&request).await.unwrap().unwrap();

        assert_eq!(analysis.analysis.len(), 2);
        assert_eq!(
            analysis.analysis[0].as_ref().and_then(|r| r.summary.as_deref()),
            Some("loops over orders")
        );
        assert!(analysis.analysis[1].is_none());
        assert_eq!(oracle.code_calls(), vec![vec!["2-3".to_string(), "5-5".to_string()]]);
    }

    #[tokio::test]
    async fn test_mock_oracle_failure() {
        let oracle = MockOracleBuilder::new().failing_at(5, 5).build();
        let request = CodeAnalysisRequest::new("5: x := 1;", vec![LineRange::new(5, 5)]);
        assert!(oracle.analyze_code(&request).await.is_err());
        assert_eq!(oracle.peak_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_mock_oracle_table_summary_echoes_fragments() {
        let oracle = MockOracle::new();
        let request = TableSummaryRequest {
            table_display: "HR.EMP".to_string(),
            summaries: vec!["employees".to_string()],
            columns: [("ID".to_string(), vec!["key".to_string()])].into_iter().collect(),
        };
        let summary = oracle.summarize_table(&request).await.unwrap().unwrap();
        assert_eq!(summary.table_description.as_deref(), Some("HR.EMP: employees"));
        assert_eq!(summary.columns[0].description, "key");
        assert_eq!(oracle.table_calls().len(), 1);
    }
}
