// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # SQL Understanding - Analyzer
//!
//! Turns the parse tree of one stored-procedure source file into a stream of
//! graph mutations, using an [`Oracle`](sql_understanding_oracle::Oracle) to
//! summarise code and to extract table metadata.
//!
//! ## Pipeline
//!
//! ```text
//! ParsedNode ──▶ StatementCollector ──▶ NodeArena + procedures
//!                                           │
//!                       StaticGraphWriter ◀─┤
//!                                           ▼
//!                                      BatchPlanner ──▶ AnalysisBatch*
//!                                                           │ (one worker each)
//!                                gate ─▶ permit ─▶ OracleInvoker
//!                                                           ▼
//!                                                     ApplyManager ──▶ SinkWriter ──▶ consumer
//! ```
//!
//! ## Ordering guarantees
//!
//! - Nodes are collected in post-order, so every child has a lower batch id
//!   than its parent.
//! - A batch calls the oracle only after every analyzable child of its
//!   members has been applied, so parents see their children's summaries.
//! - Batches are applied strictly in id order, one at a time.
//! - Each sink message is acknowledged before the next one is sent.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sql_understanding_analyzer::{Analyzer, AnalyzerConfig, GraphScope, SinkChannel};
//!
//! let scope = GraphScope::new("user", "project", "folder", "file.sql");
//! let analyzer = Analyzer::new(AnalyzerConfig::new(scope), oracle)?;
//! let (channel, endpoint) = SinkChannel::pair(16);
//! // Hand `endpoint` to a consumer that acknowledges every message
//! let report = analyzer.run(&tree, &source, channel).await?;
//! ```

pub mod analyzer;
pub mod apply;
pub mod collector;
pub mod config;
pub mod cypher;
pub mod error;
pub mod gate;
pub mod invoker;
pub mod model;
pub mod naming;
pub mod planner;
pub mod signal;
pub mod sink;
pub mod static_graph;
pub mod tokens;

// Re-exports
pub use analyzer::{Analyzer, RunReport};
pub use apply::{ApplyManager, ApplyStats};
pub use collector::{Collection, StatementCollector};
pub use config::{AnalyzerConfig, ConfigError, GraphScope};
pub use cypher::CypherBuilder;
pub use error::{AnalyzerError, AnalyzerResult};
pub use model::{
    AnalysisBatch, BatchResult, NodeArena, NodeId, ProcedureInfo, ProcedureRef, StatementNode,
};
pub use planner::BatchPlanner;
pub use signal::CompletionSignal;
pub use sink::{SinkChannel, SinkEndpoint, SinkError, SinkHandle, SinkResult, SinkWriter};
pub use static_graph::{StaticGraphReport, StaticGraphWriter};
pub use tokens::{TokenCost, TokenCounter};
