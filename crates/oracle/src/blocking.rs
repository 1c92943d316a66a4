// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Blocking oracle bridge
//!
//! Most model client SDKs expose synchronous calls. [`Blocking`] wraps such a
//! client and runs each call on tokio's blocking thread pool, so the
//! scheduler's event loop stays free while a call is in flight.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;

use crate::error::{OracleError, OracleResult};
use crate::metadata::{
    CodeAnalysis, CodeAnalysisRequest, ProcedureFragments, TableAnalysis, TableAnalysisRequest,
    TableSummary, TableSummaryRequest, VariableAnalysis,
};
use crate::oracle::Oracle;

/// Synchronous counterpart of [`Oracle`]
pub trait BlockingOracle: Send + Sync + 'static {
    fn analyze_code(&self, request: &CodeAnalysisRequest) -> OracleResult<Option<CodeAnalysis>>;

    fn analyze_tables(&self, request: &TableAnalysisRequest) -> OracleResult<Option<TableAnalysis>>;

    fn summarize_procedure(&self, fragments: &ProcedureFragments) -> OracleResult<Option<String>>;

    fn summarize_table(&self, request: &TableSummaryRequest) -> OracleResult<Option<TableSummary>>;

    fn analyze_variables(&self, code: &str) -> OracleResult<Option<VariableAnalysis>>;
}

/// Adapter running a [`BlockingOracle`] on the blocking pool
pub struct Blocking<T> {
    inner: Arc<T>,
}

impl<T: BlockingOracle> Blocking<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    async fn run<R, F>(&self, call: F) -> OracleResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&T) -> OracleResult<R> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || call(&inner))
            .await
            .map_err(|e| OracleError::TaskFailed(e.to_string()))?
    }
}

#[async_trait]
impl<T: BlockingOracle> Oracle for Blocking<T> {
    async fn analyze_code(&self, request: &CodeAnalysisRequest) -> OracleResult<Option<CodeAnalysis>> {
        let request = request.clone();
        self.run(move |oracle| oracle.analyze_code(&request)).await
    }

    async fn analyze_tables(
        &self,
        request: &TableAnalysisRequest,
    ) -> OracleResult<Option<TableAnalysis>> {
        let request = request.clone();
        self.run(move |oracle| oracle.analyze_tables(&request)).await
    }

    async fn summarize_procedure(&self, fragments: &ProcedureFragments) -> OracleResult<Option<String>> {
        let fragments = fragments.clone();
        self.run(move |oracle| oracle.summarize_procedure(&fragments)).await
    }

    async fn summarize_table(
        &self,
        request: &TableSummaryRequest,
    ) -> OracleResult<Option<TableSummary>> {
        let request = request.clone();
        self.run(move |oracle| oracle.summarize_table(&request)).await
    }

    async fn analyze_variables(&self, code: &str) -> OracleResult<Option<VariableAnalysis>> {
        let code = code.to_string();
        self.run(move |oracle| oracle.analyze_variables(&code)).await
    }
}
