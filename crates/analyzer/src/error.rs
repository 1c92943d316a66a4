// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Error types for the analyzer
//!
//! Every error here is fatal to the run it occurs in. Failures of the
//! procedure and table summarisation calls never surface as an
//! [`AnalyzerError`]: they are logged and the affected bucket is dropped.

use thiserror::Error;

use sql_understanding_ir::TreeError;
use sql_understanding_oracle::OracleError;

use crate::config::ConfigError;
use crate::sink::SinkError;

/// Result type alias for analyzer operations
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Errors that abort an analysis run
#[derive(Debug, Error, Clone)]
pub enum AnalyzerError {
    /// The parsed tree has inconsistent line ranges
    #[error("Malformed statement tree: {0}")]
    MalformedTree(#[from] TreeError),

    /// The BPE tables could not be loaded
    #[error("Token counter unavailable: {0}")]
    TokenCounter(String),

    /// A batch analysis call failed
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// The persistence consumer went away
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A spawned worker panicked or was cancelled
    #[error("Analysis task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for AnalyzerError {
    fn from(err: tokio::task::JoinError) -> Self {
        AnalyzerError::Task(err.to_string())
    }
}
