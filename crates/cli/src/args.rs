// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "sql-understand")]
#[command(about = "Annotate a parsed stored-procedure file and emit graph statements as JSON lines")]
#[command(version)]
pub struct Cli {
    /// Parsed statement tree produced by the parser (JSON)
    #[arg(long)]
    pub tree: PathBuf,

    /// Source file the tree was parsed from
    #[arg(long)]
    pub source: PathBuf,

    /// Analyzer configuration (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Recorded oracle answers (JSON); without it every range gets no analysis
    #[arg(long)]
    pub oracle: Option<PathBuf>,

    /// Statement output (JSON lines); stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Folder name written into the graph; defaults to the source's directory
    #[arg(long)]
    pub folder: Option<String>,

    /// File name written into the graph; defaults to the source's file name
    #[arg(long)]
    pub file: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    /// Token budget of one oracle batch
    #[arg(long)]
    pub token_limit: Option<usize>,

    /// Oracle batches in flight at once
    #[arg(long)]
    pub max_concurrency: Option<usize>,
}
