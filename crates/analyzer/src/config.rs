// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Analyzer Configuration
//!
//! This module provides configuration for an analysis run.
//!
//! ## Configuration Structure
//!
//! - Batch token budget and oracle concurrency
//! - Chunk size of the static graph messages
//! - Locale and DBMS tag written into the graph
//! - Graph scope: the user, project, folder and file every node belongs to
//!
//! ## Example
//!
//! ```rust,ignore
//! use sql_understanding_analyzer::{AnalyzerConfig, GraphScope};
//!
//! let config = AnalyzerConfig {
//!     scope: GraphScope::new("alice", "billing", "PKG_ORDERS", "pkg_orders.sql"),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sql_understanding_ir::Dbms;

/// Identity properties shared by every node the run writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphScope {
    pub user_id: String,
    pub project_name: String,
    pub folder_name: String,
    pub file_name: String,
}

impl GraphScope {
    pub fn new(
        user_id: impl Into<String>,
        project_name: impl Into<String>,
        folder_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            project_name: project_name.into(),
            folder_name: folder_name.into(),
            file_name: file_name.into(),
        }
    }

    /// `folder-file` tag used in log lines
    pub fn tag(&self) -> String {
        format!("{}-{}", self.folder_name, self.file_name)
    }
}

/// Settings of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Advisory token budget of one batch
    pub token_limit: usize,

    /// Maximum number of batches calling the oracle at once
    pub max_concurrency: usize,

    /// Statements per static graph message
    pub static_chunk_size: usize,

    /// Maximum number of declaration analyses in flight
    pub variable_concurrency: usize,

    /// Output language of generated descriptions (`ko`, `en`)
    pub locale: String,

    pub dbms: Dbms,

    pub scope: GraphScope,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            token_limit: 900,
            max_concurrency: 5,
            static_chunk_size: 40,
            variable_concurrency: 5,
            locale: "ko".to_string(),
            dbms: Dbms::default(),
            scope: GraphScope::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Create a configuration with default limits for the given scope
    pub fn new(scope: GraphScope) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }

    /// Validate the configuration
    ///
    /// Checks that:
    /// - Every limit is non-zero
    /// - Every scope field is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("token_limit", self.token_limit),
            ("max_concurrency", self.max_concurrency),
            ("static_chunk_size", self.static_chunk_size),
            ("variable_concurrency", self.variable_concurrency),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }

        let scope = [
            ("user_id", &self.scope.user_id),
            ("project_name", &self.scope.project_name),
            ("folder_name", &self.scope.folder_name),
            ("file_name", &self.scope.file_name),
        ];
        for (field, value) in scope {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingScope { field });
            }
        }

        if self.locale.trim().is_empty() {
            return Err(ConfigError::MissingLocale);
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("Graph scope field {field} is required")]
    MissingScope { field: &'static str },

    #[error("Locale is required")]
    MissingLocale,
}
