// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Structural graph written before any batch is dispatched.
//!
//! Three passes, in order: one upsert per node, then `PARENT_OF` and `NEXT`
//! edges, then declaration analysis. The first two are chunked into messages
//! of a fixed number of statements.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use sql_understanding_oracle::Oracle;

use crate::cypher::CypherBuilder;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::model::{NodeArena, NodeId};
use crate::sink::SinkHandle;

/// Counts of what the static pass emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticGraphReport {
    pub nodes: usize,
    pub edges: usize,
    /// Declarations for which the oracle returned an analysis
    pub declarations: usize,
}

/// Buffers statements and sends them in fixed-size units
struct Chunker<'a> {
    sink: &'a SinkHandle,
    size: usize,
    buffer: Vec<String>,
}

impl<'a> Chunker<'a> {
    fn new(sink: &'a SinkHandle, size: usize) -> Self {
        Self {
            sink,
            size,
            buffer: Vec::with_capacity(size),
        }
    }

    async fn push(&mut self, statement: String, line: u32) -> AnalyzerResult<()> {
        self.buffer.push(statement);
        if self.buffer.len() >= self.size {
            self.flush(line).await?;
        }
        Ok(())
    }

    async fn flush(&mut self, line: u32) -> AnalyzerResult<()> {
        let statements = std::mem::take(&mut self.buffer);
        self.sink.send_statements(statements, line).await?;
        Ok(())
    }
}

pub struct StaticGraphWriter {
    arena: Arc<NodeArena>,
    cypher: CypherBuilder,
    oracle: Arc<dyn Oracle>,
    sink: SinkHandle,
    chunk_size: usize,
    variable_concurrency: usize,
}

impl StaticGraphWriter {
    pub fn new(
        arena: Arc<NodeArena>,
        cypher: CypherBuilder,
        oracle: Arc<dyn Oracle>,
        sink: SinkHandle,
        chunk_size: usize,
        variable_concurrency: usize,
    ) -> Self {
        Self {
            arena,
            cypher,
            oracle,
            sink,
            chunk_size,
            variable_concurrency,
        }
    }

    pub async fn write(&self) -> AnalyzerResult<StaticGraphReport> {
        let Some(last) = self.arena.root() else {
            return Ok(StaticGraphReport::default());
        };
        let last_line = last.end_line;

        let nodes = self.write_nodes(last_line).await?;
        let edges = self.write_edges(last_line).await?;
        let declarations = self.analyze_declarations().await?;
        debug!(
            "Static graph written: {} nodes, {} edges, {} declarations",
            nodes, edges, declarations
        );

        Ok(StaticGraphReport {
            nodes,
            edges,
            declarations,
        })
    }

    async fn write_nodes(&self, last_line: u32) -> AnalyzerResult<usize> {
        let mut chunker = Chunker::new(&self.sink, self.chunk_size);
        for node in self.arena.iter() {
            let compact = self.arena.compact_code(node.id);
            chunker
                .push(self.cypher.static_node(node, &compact), node.end_line)
                .await?;
        }
        chunker.flush(last_line).await?;
        Ok(self.arena.len())
    }

    async fn write_edges(&self, last_line: u32) -> AnalyzerResult<usize> {
        let mut chunker = Chunker::new(&self.sink, self.chunk_size);
        let mut count = 0;

        for node in self.arena.iter() {
            for child in self.arena.children(node.id) {
                chunker
                    .push(self.cypher.parent_of(node, child), child.end_line)
                    .await?;
                count += 1;
            }

            let siblings: Vec<_> = self.arena.children(node.id).collect();
            for pair in siblings.windows(2) {
                let (previous, current) = (pair[0], pair[1]);
                if previous.node_type.breaks_next_chain() {
                    continue;
                }
                chunker
                    .push(self.cypher.next(previous, current), current.end_line)
                    .await?;
                count += 1;
            }
        }

        chunker.flush(last_line).await?;
        Ok(count)
    }

    /// Analyse every declaration node under the variable concurrency limit
    ///
    /// Oracle failures are logged and the declaration skipped; sink failures
    /// abort the pass.
    async fn analyze_declarations(&self) -> AnalyzerResult<usize> {
        let targets: Vec<NodeId> = self
            .arena
            .iter()
            .filter(|node| node.node_type.is_variable_declaration())
            .map(|node| node.id)
            .collect();
        if targets.is_empty() {
            return Ok(0);
        }

        let semaphore = Arc::new(Semaphore::new(self.variable_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for id in targets {
            let semaphore = Arc::clone(&semaphore);
            let arena = Arc::clone(&self.arena);
            let oracle = Arc::clone(&self.oracle);
            let cypher = self.cypher.clone();
            let sink = self.sink.clone();

            tasks.spawn(async move {
                analyze_declaration(&arena, id, &semaphore, oracle.as_ref(), &cypher, &sink).await
            });
        }

        let mut analyzed = 0;
        while let Some(joined) = tasks.join_next().await {
            if joined?? {
                analyzed += 1;
            }
        }
        Ok(analyzed)
    }
}

/// Returns whether the oracle produced an analysis for the declaration
async fn analyze_declaration(
    arena: &NodeArena,
    id: NodeId,
    semaphore: &Semaphore,
    oracle: &dyn Oracle,
    cypher: &CypherBuilder,
    sink: &SinkHandle,
) -> AnalyzerResult<bool> {
    let node = arena.get(id);
    let analysis = {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|e| AnalyzerError::Task(e.to_string()))?;
        oracle.analyze_variables(&node.code).await
    };
    let analysis = match analysis {
        Ok(Some(analysis)) => analysis,
        Ok(None) => return Ok(false),
        Err(e) => {
            error!("Variable analysis of {} failed: {}", node.display_name(), e);
            return Ok(false);
        }
    };

    let mut statements = vec![cypher.declaration_summary(node, analysis.summary.as_deref())];
    statements.extend(
        analysis
            .variables
            .iter()
            .filter_map(|variable| cypher.declared_variable(node, variable)),
    );
    sink.send_statements(statements, node.end_line).await?;
    Ok(true)
}
