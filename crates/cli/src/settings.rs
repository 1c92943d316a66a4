// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Run settings
//!
//! The analyzer configuration is assembled in three layers, later layers
//! winning:
//!
//! 1. [`AnalyzerConfig::default`]
//! 2. The YAML file given with `--config`
//! 3. Command line overrides
//!
//! Folder and file names that are still empty afterwards are taken from the
//! source path.
//!
//! ## Example
//!
//! ```yaml
//! token_limit: 1200
//! max_concurrency: 3
//! locale: en
//! dbms: oracle
//! scope:
//!   user_id: alice
//!   project_name: billing
//! ```

use std::fs;
use std::path::Path;

use anyhow::Context;

use sql_understanding_analyzer::AnalyzerConfig;

use crate::args::Cli;

/// Build and validate the configuration of one run
pub fn load_config(cli: &Cli) -> anyhow::Result<AnalyzerConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => AnalyzerConfig::default(),
    };
    apply_overrides(&mut config, cli);
    fill_scope_from_source(&mut config, &cli.source);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Read a YAML configuration file
pub fn read_config(path: &Path) -> anyhow::Result<AnalyzerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn apply_overrides(config: &mut AnalyzerConfig, cli: &Cli) {
    let scope = &mut config.scope;
    let fields = [
        (&mut scope.user_id, &cli.user),
        (&mut scope.project_name, &cli.project),
        (&mut scope.folder_name, &cli.folder),
        (&mut scope.file_name, &cli.file),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            *field = value.clone();
        }
    }

    if let Some(limit) = cli.token_limit {
        config.token_limit = limit;
    }
    if let Some(limit) = cli.max_concurrency {
        config.max_concurrency = limit;
    }
}

fn fill_scope_from_source(config: &mut AnalyzerConfig, source: &Path) {
    let scope = &mut config.scope;
    if scope.file_name.trim().is_empty() {
        if let Some(name) = source.file_name() {
            scope.file_name = name.to_string_lossy().into_owned();
        }
    }
    if scope.folder_name.trim().is_empty() {
        let folder = source
            .canonicalize()
            .ok()
            .and_then(|path| path.parent().and_then(Path::file_name).map(|n| n.to_owned()));
        if let Some(folder) = folder {
            scope.folder_name = folder.to_string_lossy().into_owned();
        }
    }
}
