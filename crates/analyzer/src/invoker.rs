// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Oracle calls for one batch.

use std::sync::Arc;

use tracing::debug;

use sql_understanding_ir::{CodeAnalysis, TableAnalysis};
use sql_understanding_oracle::Oracle;

use crate::error::AnalyzerResult;
use crate::model::{AnalysisBatch, NodeArena};

/// Issues the general and DML analysis calls of a batch
///
/// The general call receives the compact code of every member; the DML call
/// receives the raw code of the DML members only. When a batch needs both,
/// they run concurrently and the first error wins.
#[derive(Clone)]
pub struct OracleInvoker {
    oracle: Arc<dyn Oracle>,
}

impl OracleInvoker {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    pub async fn invoke(
        &self,
        batch: &AnalysisBatch,
        arena: &NodeArena,
    ) -> AnalyzerResult<(Option<CodeAnalysis>, Option<TableAnalysis>)> {
        let code_request = batch.code_request(arena);
        let table_request = batch.table_request(arena);
        debug!(
            "Invoking oracle for batch {} ({} ranges, {} DML)",
            batch.id,
            batch.ranges.len(),
            batch.dml_ranges.len()
        );

        let result = match (code_request, table_request) {
            (Some(code), Some(tables)) => tokio::try_join!(
                self.oracle.analyze_code(&code),
                self.oracle.analyze_tables(&tables)
            )?,
            (Some(code), None) => (self.oracle.analyze_code(&code).await?, None),
            (None, Some(tables)) => (None, self.oracle.analyze_tables(&tables).await?),
            (None, None) => (None, None),
        };
        Ok(result)
    }
}
