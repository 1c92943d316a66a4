// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Analysis run
//!
//! [`Analyzer::run`] drives one file end to end:
//!
//! 1. Collect statement nodes and procedures from the parsed tree
//! 2. Write the static graph
//! 3. Plan token-budgeted batches
//! 4. Dispatch one worker per batch: wait for analyzable children, take a
//!    concurrency permit, call the oracle, submit to the apply manager
//! 5. Finalise procedure and table summaries
//! 6. Send `end_analysis`
//!
//! The first fatal error aborts the remaining workers, is sent once to the
//! sink as an `error` message and is returned to the caller.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use sql_understanding_ir::ParsedNode;
use sql_understanding_oracle::Oracle;

use crate::apply::{ApplyManager, ApplyStats};
use crate::collector::{Collection, StatementCollector};
use crate::config::AnalyzerConfig;
use crate::cypher::CypherBuilder;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::gate::wait_for_children;
use crate::invoker::OracleInvoker;
use crate::model::{AnalysisBatch, BatchResult, NodeArena};
use crate::planner::BatchPlanner;
use crate::sink::{SinkChannel, SinkHandle, SinkWriter};
use crate::static_graph::{StaticGraphReport, StaticGraphWriter};
use crate::tokens::{TokenCost, TokenCounter};

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub nodes: usize,
    pub procedures: usize,
    pub batches: usize,
    pub static_graph: StaticGraphReport,
    pub apply: ApplyStats,
}

pub struct Analyzer {
    config: AnalyzerConfig,
    oracle: Arc<dyn Oracle>,
    cost: Arc<dyn TokenCost>,
}

impl Analyzer {
    /// Create an analyzer that prices code with the cl100k_base encoding
    pub fn new(config: AnalyzerConfig, oracle: Arc<dyn Oracle>) -> AnalyzerResult<Self> {
        let cost = Arc::new(TokenCounter::cl100k()?);
        Self::with_token_cost(config, oracle, cost)
    }

    pub fn with_token_cost(
        config: AnalyzerConfig,
        oracle: Arc<dyn Oracle>,
        cost: Arc<dyn TokenCost>,
    ) -> AnalyzerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            oracle,
            cost,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyse one file and stream its graph mutations into `channel`
    ///
    /// Returns once the terminal message has been handed to the consumer.
    pub async fn run(
        &self,
        tree: &ParsedNode,
        source: &str,
        channel: SinkChannel,
    ) -> AnalyzerResult<RunReport> {
        let tag = self.config.scope.tag();
        let (sink, writer) = SinkWriter::spawn(channel);

        let outcome = match self.execute(tree, source, &sink).await {
            Ok(report) => {
                info!("[{}] Analysis finished: {} batches applied", tag, report.apply.applied.len());
                sink.send_end().await.map(|_| report).map_err(AnalyzerError::from)
            }
            Err(e) => {
                error!("[{}] Analysis failed: {}", tag, e);
                if let Err(send) = sink.send_error(e.to_string()).await {
                    warn!("[{}] Could not report failure to the sink: {}", tag, send);
                }
                Err(e)
            }
        };

        drop(sink);
        writer.await?;
        outcome
    }

    async fn execute(
        &self,
        tree: &ParsedNode,
        source: &str,
        sink: &SinkHandle,
    ) -> AnalyzerResult<RunReport> {
        let scope = &self.config.scope;
        let source_lines = source.lines().count() as u32;
        info!("[{}] Analysis started ({} lines)", scope.tag(), source_lines);

        let Collection { arena, procedures } =
            StatementCollector::new(source, scope, self.cost.as_ref()).collect(tree)?;
        let arena = Arc::new(arena);
        let file_last_line = arena
            .root()
            .map(|root| root.end_line)
            .unwrap_or(0)
            .max(source_lines);
        let cypher = CypherBuilder::new(scope.clone(), self.config.dbms, self.config.locale.clone());

        let static_graph = StaticGraphWriter::new(
            Arc::clone(&arena),
            cypher.clone(),
            Arc::clone(&self.oracle),
            sink.clone(),
            self.config.static_chunk_size,
            self.config.variable_concurrency,
        )
        .write()
        .await?;

        let batches = BatchPlanner::new(self.config.token_limit).plan(&arena);
        let mut report = RunReport {
            nodes: arena.len(),
            procedures: procedures.len(),
            batches: batches.len(),
            static_graph,
            apply: ApplyStats::default(),
        };
        if batches.is_empty() {
            debug!("[{}] No analyzable nodes", scope.tag());
            return Ok(report);
        }

        let apply = Arc::new(ApplyManager::new(
            Arc::clone(&arena),
            procedures,
            Arc::clone(&self.oracle),
            cypher,
            sink.clone(),
            file_last_line,
        ));
        let invoker = OracleInvoker::new(Arc::clone(&self.oracle));
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.min(batches.len())));

        let mut workers = JoinSet::new();
        for batch in batches {
            let worker = BatchWorker {
                arena: Arc::clone(&arena),
                apply: Arc::clone(&apply),
                invoker: invoker.clone(),
                permits: Arc::clone(&permits),
            };
            workers.spawn(worker.process(batch));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined.map_err(AnalyzerError::from).and_then(|result| result) {
                workers.abort_all();
                return Err(e);
            }
        }

        report.apply = apply.finalize().await?;
        Ok(report)
    }
}

struct BatchWorker {
    arena: Arc<NodeArena>,
    apply: Arc<ApplyManager>,
    invoker: OracleInvoker,
    permits: Arc<Semaphore>,
}

impl BatchWorker {
    async fn process(self, batch: AnalysisBatch) -> AnalyzerResult<()> {
        // Waiting happens before taking a permit so blocked parents never hold one
        wait_for_children(&batch, &self.arena).await;

        let (general, tables) = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| AnalyzerError::Task(e.to_string()))?;
            debug!("Dispatching batch {}", batch.id);
            self.invoker.invoke(&batch, &self.arena).await?
        };

        self.apply
            .submit(BatchResult {
                batch,
                general,
                tables,
            })
            .await
    }
}
