// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Apply Manager
//!
//! Turns batch results into graph mutations and streams them to the sink in
//! batch-id order, whatever order the batches finish in.
//!
//! ## Ordering
//!
//! Results are parked in a pending map keyed by batch id. After each
//! [`submit`](ApplyManager::submit) the manager applies every result whose id
//! is the next expected one, starting at 1. Submission, application and the
//! send-and-acknowledge round trip all happen under one lock, so at most one
//! batch is being applied at any time.
//!
//! ## Deferred summaries
//!
//! - **Procedures**: every applied member of a procedure decrements its
//!   pending count. At zero the collected fragments are summarised by a task
//!   spawned into a `JoinSet`, outside the apply path.
//! - **Tables**: description fragments of tables and columns accumulate for
//!   the whole run and are summarised once by [`finalize`](ApplyManager::finalize).
//!
//! Oracle failures in either deferred phase are logged and drop the bucket.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use sql_understanding_ir::{
    DmlRelationship, RangeAnalysis, TableAnalysis, TableIdentifier, TableSummaryRequest,
};
use sql_understanding_oracle::{Oracle, ProcedureFragments};

use crate::cypher::CypherBuilder;
use crate::error::AnalyzerResult;
use crate::model::{AnalysisBatch, BatchResult, NodeArena, ProcedureInfo, StatementNode};
use crate::sink::SinkHandle;

/// What the manager did over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Batch ids in the order they were applied
    pub applied: Vec<usize>,
    pub procedure_summaries: usize,
    pub table_summaries: usize,
}

struct ProcedureBucket {
    info: ProcedureInfo,
    fragments: ProcedureFragments,
    triggered: bool,
}

#[derive(Debug, Default)]
struct ColumnBucket {
    /// Name as first reported
    name: String,
    summaries: BTreeSet<String>,
}

/// Description fragments of one table, keyed by upper-cased schema and name
#[derive(Debug, Default)]
struct TableBucket {
    schema: String,
    name: String,
    summaries: BTreeSet<String>,
    columns: BTreeMap<String, ColumnBucket>,
}

impl TableBucket {
    fn new(table: &TableIdentifier) -> Self {
        Self {
            schema: table.schema.clone(),
            name: table.name.clone(),
            ..Default::default()
        }
    }

    fn add_summary(&mut self, text: Option<&str>) {
        let text = text.unwrap_or("").trim();
        if !text.is_empty() {
            self.summaries.insert(text.to_string());
        }
    }

    fn add_column(&mut self, name: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.columns
            .entry(name.to_uppercase())
            .or_insert_with(|| ColumnBucket {
                name: name.to_string(),
                summaries: BTreeSet::new(),
            })
            .summaries
            .insert(text.to_string());
    }

    fn has_fragments(&self) -> bool {
        !self.summaries.is_empty() || self.columns.values().any(|c| !c.summaries.is_empty())
    }

    fn identifier(&self) -> TableIdentifier {
        TableIdentifier {
            schema: self.schema.clone(),
            name: self.name.clone(),
            db_link: None,
        }
    }

    fn request(&self) -> TableSummaryRequest {
        TableSummaryRequest {
            table_display: self.identifier().to_string(),
            summaries: self.summaries.iter().cloned().collect(),
            columns: self
                .columns
                .values()
                .filter(|c| !c.summaries.is_empty())
                .map(|c| (c.name.clone(), c.summaries.iter().cloned().collect()))
                .collect(),
        }
    }
}

struct ApplyState {
    pending: BTreeMap<usize, BatchResult>,
    next_id: usize,
    procedures: BTreeMap<String, ProcedureBucket>,
    tables: BTreeMap<(String, String), TableBucket>,
    finalizers: JoinSet<AnalyzerResult<()>>,
    stats: ApplyStats,
}

/// Shared with spawned finalisation tasks
struct ApplyContext {
    arena: Arc<NodeArena>,
    oracle: Arc<dyn Oracle>,
    cypher: CypherBuilder,
    sink: SinkHandle,
    file_last_line: u32,
}

pub struct ApplyManager {
    state: Mutex<ApplyState>,
    context: Arc<ApplyContext>,
}

impl ApplyManager {
    pub fn new(
        arena: Arc<NodeArena>,
        procedures: BTreeMap<String, ProcedureInfo>,
        oracle: Arc<dyn Oracle>,
        cypher: CypherBuilder,
        sink: SinkHandle,
        file_last_line: u32,
    ) -> Self {
        let procedures = procedures
            .into_iter()
            .map(|(key, info)| {
                let bucket = ProcedureBucket {
                    info,
                    fragments: ProcedureFragments::new(),
                    triggered: false,
                };
                (key, bucket)
            })
            .collect();

        Self {
            state: Mutex::new(ApplyState {
                pending: BTreeMap::new(),
                next_id: 1,
                procedures,
                tables: BTreeMap::new(),
                finalizers: JoinSet::new(),
                stats: ApplyStats::default(),
            }),
            context: Arc::new(ApplyContext {
                arena,
                oracle,
                cypher,
                sink,
                file_last_line,
            }),
        }
    }

    /// Park a finished batch and apply everything that is now in order
    pub async fn submit(&self, result: BatchResult) -> AnalyzerResult<()> {
        let mut state = self.state.lock().await;
        debug!("Batch {} submitted", result.batch.id);
        state.pending.insert(result.batch.id, result);
        self.flush(&mut state, false).await
    }

    /// Apply leftovers, finish procedure summaries, then summarise tables
    ///
    /// Call once, after every dispatched batch has been submitted.
    pub async fn finalize(&self) -> AnalyzerResult<ApplyStats> {
        let (finalizers, tables) = {
            let mut guard = self.state.lock().await;
            self.flush(&mut guard, true).await?;

            let state = &mut *guard;
            for bucket in state.procedures.values_mut() {
                if !bucket.fragments.is_empty() {
                    self.spawn_procedure_summary(bucket, &mut state.finalizers, &mut state.stats);
                }
            }
            (
                std::mem::take(&mut state.finalizers),
                std::mem::take(&mut state.tables),
            )
        };

        drain(finalizers).await?;
        let table_summaries = self.summarize_tables(tables).await?;

        let mut state = self.state.lock().await;
        state.stats.table_summaries = table_summaries;
        Ok(state.stats.clone())
    }

    async fn flush(&self, state: &mut ApplyState, force: bool) -> AnalyzerResult<()> {
        loop {
            let next = state.next_id;
            let Some(result) = state.pending.remove(&next) else {
                break;
            };
            self.apply(state, result).await?;
            state.next_id += 1;
        }

        if force && !state.pending.is_empty() {
            warn!(
                "Applying {} batches out of order: {:?}",
                state.pending.len(),
                state.pending.keys().collect::<Vec<_>>()
            );
            for (_, result) in std::mem::take(&mut state.pending) {
                self.apply(state, result).await?;
            }
        }
        Ok(())
    }

    async fn apply(&self, state: &mut ApplyState, result: BatchResult) -> AnalyzerResult<()> {
        let BatchResult {
            batch,
            general,
            tables,
        } = result;
        let context = &self.context;
        let arena = &context.arena;

        let mut records = general.map(|g| g.analysis).unwrap_or_default().into_iter();
        let mut statements = Vec::new();

        for id in &batch.nodes {
            let node = arena.get(*id);
            let record = records.next().flatten().filter(|r| !r.is_empty());
            let summary = match record {
                Some(record) => {
                    let summary = record
                        .summary
                        .clone()
                        .filter(|s| !s.trim().is_empty());
                    if let Some(summary) = &summary {
                        node.set_summary(summary.clone());
                    }
                    statements.extend(self.node_statements(node, &record, summary.as_deref()));
                    summary
                }
                None => None,
            };
            node.signal().set();
            self.settle_procedure(state, node, summary);
        }

        if let Some(tables) = tables {
            statements.extend(self.table_statements(state, &batch, tables));
        }

        state.stats.applied.push(batch.id);
        debug!(
            "Applying batch {} ({} statements, line {})",
            batch.id,
            statements.len(),
            batch.progress_line
        );
        context
            .sink
            .send_statements(statements, batch.progress_line)
            .await?;
        Ok(())
    }

    fn node_statements(
        &self,
        node: &StatementNode,
        record: &RangeAnalysis,
        summary: Option<&str>,
    ) -> Vec<String> {
        let cypher = &self.context.cypher;
        let compact = self.context.arena.compact_code(node.id);

        let mut statements = vec![cypher.node_summary(node, &compact, summary.unwrap_or(""))];
        statements.extend(
            record
                .variables
                .iter()
                .filter(|v| !v.trim().is_empty())
                .map(|v| cypher.variable_usage(node, v.trim())),
        );
        statements.extend(
            record
                .calls
                .iter()
                .filter(|c| !c.trim().is_empty())
                .map(|c| cypher.call(node, c)),
        );
        statements
    }

    fn settle_procedure(&self, state: &mut ApplyState, node: &StatementNode, summary: Option<String>) {
        let Some(key) = node.procedure_key() else {
            return;
        };
        let Some(bucket) = state.procedures.get_mut(key) else {
            return;
        };

        if let Some(summary) = summary {
            bucket.fragments.insert(node.fragment_key(), summary);
        }
        bucket.info.pending = bucket.info.pending.saturating_sub(1);
        if bucket.info.pending == 0 {
            self.spawn_procedure_summary(bucket, &mut state.finalizers, &mut state.stats);
        }
    }

    /// Start the one summarisation of a procedure, unless already started
    fn spawn_procedure_summary(
        &self,
        bucket: &mut ProcedureBucket,
        finalizers: &mut JoinSet<AnalyzerResult<()>>,
        stats: &mut ApplyStats,
    ) {
        if bucket.triggered {
            return;
        }
        bucket.triggered = true;

        let fragments = std::mem::take(&mut bucket.fragments);
        if fragments.is_empty() {
            debug!("Procedure {} has no fragments to summarise", bucket.info.key);
            return;
        }

        stats.procedure_summaries += 1;
        let info = bucket.info.clone();
        let context = Arc::clone(&self.context);
        finalizers.spawn(async move { context.summarize_procedure(info, fragments).await });
    }

    fn table_statements(
        &self,
        state: &mut ApplyState,
        batch: &AnalysisBatch,
        analysis: TableAnalysis,
    ) -> Vec<String> {
        let cypher = &self.context.cypher;
        let arena = &self.context.arena;
        let mut statements = Vec::new();

        for entry in analysis.tables {
            let (Some(start), Some(end)) = (entry.start_line, entry.end_line) else {
                continue;
            };
            let Some(node) = batch
                .nodes
                .iter()
                .map(|id| arena.get(*id))
                .find(|n| n.start_line == start && n.end_line == end)
            else {
                debug!("Table entry {}-{} matches no batch member", start, end);
                continue;
            };
            let table_name = entry.table.as_deref().unwrap_or("").trim().to_uppercase();
            if table_name.is_empty() {
                continue;
            }

            let table = TableIdentifier::parse(&table_name);
            let relationship = entry
                .dml_type
                .as_deref()
                .and_then(DmlRelationship::from_dml_type);
            let bucket = state
                .tables
                .entry((table.schema.clone(), table.name.clone()))
                .or_insert_with(|| TableBucket::new(&table));
            bucket.add_summary(entry.table_description.as_deref());
            statements.push(cypher.table_upsert(node, &table, relationship));

            for column in &entry.columns {
                let name = column.name.trim();
                if name.is_empty() {
                    continue;
                }
                bucket.add_column(name, column.description_text());
                statements.push(cypher.column_upsert(&table, column));
            }

            for link in &entry.db_links {
                let remote = TableIdentifier::parse(&link.name.trim().to_uppercase());
                match remote.db_link.as_deref() {
                    Some(link_name) if !remote.name.is_empty() => {
                        let mode = link.access_mode();
                        statements.push(cypher.db_link(node, &remote, link_name, &mode));
                    }
                    _ => debug!("Skipping database link without a remote table: {}", link.name),
                }
            }

            for relation in &entry.fk_relations {
                if let Some(edges) = cypher.foreign_key(relation) {
                    statements.extend(edges);
                }
            }
        }

        statements
    }

    async fn summarize_tables(&self, tables: BTreeMap<(String, String), TableBucket>) -> AnalyzerResult<usize> {
        let mut tasks = JoinSet::new();
        for bucket in tables.into_values().filter(TableBucket::has_fragments) {
            let context = Arc::clone(&self.context);
            tasks.spawn(async move { context.summarize_table(bucket).await });
        }
        let count = tasks.len();
        drain(tasks).await?;
        Ok(count)
    }
}

impl ApplyContext {
    async fn summarize_procedure(&self, info: ProcedureInfo, fragments: ProcedureFragments) -> AnalyzerResult<()> {
        let summary = match self.oracle.summarize_procedure(&fragments).await {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                debug!("No summary returned for procedure {}", info.key);
                return Ok(());
            }
            Err(e) => {
                warn!("Procedure summary for {} failed: {}", info.key, e);
                return Ok(());
            }
        };

        let statement = self.cypher.procedure_summary(&info, &summary);
        self.sink.send_statements(vec![statement], info.end_line).await?;
        Ok(())
    }

    async fn summarize_table(&self, bucket: TableBucket) -> AnalyzerResult<()> {
        let request = bucket.request();
        let summary = match self.oracle.summarize_table(&request).await {
            Ok(Some(summary)) => summary,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Table summary for {} failed: {}", request.table_display, e);
                return Ok(());
            }
        };

        let table = bucket.identifier();
        let mut statements = Vec::new();
        if let Some(description) = summary
            .table_description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            statements.push(self.cypher.table_description(&table, description));
        }
        for column in &summary.columns {
            let (name, description) = (column.name.trim(), column.description.trim());
            if !name.is_empty() && !description.is_empty() {
                statements.push(self.cypher.column_description(&table, name, description));
            }
        }

        self.sink.send_statements(statements, self.file_last_line).await?;
        Ok(())
    }
}

/// Await every task, stopping at the first failure
async fn drain(mut tasks: JoinSet<AnalyzerResult<()>>) -> AnalyzerResult<()> {
    while let Some(joined) = tasks.join_next().await {
        joined??;
    }
    Ok(())
}
