// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Understanding CLI
//!
//! Offline driver of the annotation scheduler. Reads a parsed statement tree
//! and its source file, answers oracle calls from a recorded replay document
//! and writes every statement unit as one JSON line.
//!
//! ```text
//! tree.json ─┐
//! file.sql ──┼─▶ Analyzer ──SinkMessage──▶ JsonlSink ──▶ statements.jsonl
//! cfg.yaml ──┘      ▲                          │
//! replay.json ──────┘   ◀──process_completed───┘
//! ```

pub mod args;
pub mod output;
pub mod settings;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::io::{AsyncWrite, BufWriter};
use tracing::info;

use sql_understanding_analyzer::{Analyzer, RunReport, SinkChannel};
use sql_understanding_ir::ParsedNode;
use sql_understanding_oracle::{Oracle, ReplayDocument, ReplayOracle};

pub use args::Cli;
pub use output::{JsonlSink, OutputSummary};
pub use settings::{load_config, read_config};

const SINK_CAPACITY: usize = 16;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: RunReport,
    pub output: OutputSummary,
}

/// Run one file end to end
pub async fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    let config = load_config(cli)?;
    let tree = read_tree(&cli.tree)?;
    let source = fs::read_to_string(&cli.source)
        .with_context(|| format!("Failed to read source {}", cli.source.display()))?;
    let oracle = load_oracle(cli.oracle.as_deref())?;

    let analyzer = Analyzer::new(config, oracle).context("Failed to create analyzer")?;
    let writer = open_output(cli.output.as_deref()).await?;

    let (channel, endpoint) = SinkChannel::pair(SINK_CAPACITY);
    let consumer = tokio::spawn(async move {
        let mut sink = JsonlSink::new(writer);
        sink.consume(endpoint).await
    });

    let report = analyzer.run(&tree, &source, channel).await;
    let output = consumer.await.context("Output task failed")?;

    let report = report.context("Analysis failed")?;
    let output = output?;
    if let Some(message) = &output.error {
        bail!("Analysis failed: {message}");
    }

    info!(
        units = output.units,
        statements = output.statements,
        batches = report.batches,
        "Statements written"
    );
    Ok(RunSummary { report, output })
}

/// Decode and validate the parser's tree
pub fn read_tree(path: &Path) -> anyhow::Result<ParsedNode> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree {}", path.display()))?;
    let tree = ParsedNode::from_json(&text)
        .with_context(|| format!("Invalid tree {}", path.display()))?;
    Ok(tree)
}

/// Replay oracle from `path`, or one that knows nothing
pub fn load_oracle(path: Option<&Path>) -> anyhow::Result<Arc<dyn Oracle>> {
    let oracle = match path {
        Some(path) => ReplayOracle::from_file(path).context("Failed to load oracle answers")?,
        None => ReplayOracle::new(ReplayDocument::default()),
    };
    Ok(Arc::new(oracle))
}

async fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn AsyncWrite + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create output {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}
