// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sql_understanding_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout may carry the statements
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let cli = Cli::parse();
    tracing::info!(source = %cli.source.display(), "Starting sql-understand");

    let summary = sql_understanding_cli::run(&cli).await?;
    tracing::info!(
        nodes = summary.report.nodes,
        procedures = summary.report.procedures,
        units = summary.output.units,
        "Analysis complete"
    );
    Ok(())
}
