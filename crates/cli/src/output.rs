// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! JSON lines sink consumer
//!
//! Writes every `analysis_code` message as one line and acknowledges it
//! after the line is written. Stops at the first terminal message.

use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use sql_understanding_analyzer::SinkEndpoint;
use sql_understanding_ir::SinkMessage;

/// What the consumer saw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSummary {
    /// `analysis_code` messages written
    pub units: usize,
    pub statements: usize,
    /// An `end_analysis` arrived
    pub completed: bool,
    /// Message of the `error` that ended the run
    pub error: Option<String>,
}

pub struct JsonlSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Consume `endpoint` until a terminal message or until the analyzer hangs up
    pub async fn consume(&mut self, mut endpoint: SinkEndpoint) -> anyhow::Result<OutputSummary> {
        let mut summary = OutputSummary::default();

        while let Some(message) = endpoint.messages.recv().await {
            match &message {
                SinkMessage::AnalysisCode { statements, line } => {
                    let mut encoded = serde_json::to_vec(&message)?;
                    encoded.push(b'\n');
                    self.writer
                        .write_all(&encoded)
                        .await
                        .context("Failed to write statements")?;

                    summary.units += 1;
                    summary.statements += statements.len();
                    debug!(line, statements = statements.len(), "Statements written");

                    endpoint.acknowledge().await?;
                }
                SinkMessage::EndAnalysis => {
                    summary.completed = true;
                    break;
                }
                SinkMessage::Error { message } => {
                    summary.error = Some(message.clone());
                    break;
                }
            }
        }

        self.writer.flush().await.context("Failed to flush output")?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_understanding_analyzer::SinkChannel;
    use sql_understanding_ir::SinkAck;

    async fn consume_into(endpoint: SinkEndpoint) -> anyhow::Result<(OutputSummary, Vec<u8>)> {
        let mut sink = JsonlSink::new(Vec::new());
        let summary = sink.consume(endpoint).await?;
        Ok((summary, sink.into_inner()))
    }

    fn unit(statement: &str, line: u32) -> SinkMessage {
        SinkMessage::AnalysisCode {
            statements: vec![statement.to_string()],
            line,
        }
    }

    #[tokio::test]
    async fn test_writes_one_line_per_unit() {
        let (mut channel, endpoint) = SinkChannel::pair(4);
        let consumer = tokio::spawn(consume_into(endpoint));

        for (statement, line) in [("MERGE (a)", 2), ("MERGE (b)", 5)] {
            channel.messages.send(unit(statement, line)).await.unwrap();
            assert_eq!(channel.acks.recv().await, Some(SinkAck::ProcessCompleted));
        }
        channel.messages.send(SinkMessage::EndAnalysis).await.unwrap();

        let (summary, written) = consumer.await.unwrap().unwrap();
        assert!(summary.completed);
        assert_eq!(summary.units, 2);
        assert_eq!(summary.statements, 2);

        let text = String::from_utf8(written).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: SinkMessage = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, unit("MERGE (a)", 2));
    }

    #[tokio::test]
    async fn test_error_ends_consumption() {
        let (channel, endpoint) = SinkChannel::pair(4);
        let consumer = tokio::spawn(consume_into(endpoint));

        channel
            .messages
            .send(SinkMessage::Error {
                message: "oracle call failed".to_string(),
            })
            .await
            .unwrap();

        let (summary, written) = consumer.await.unwrap().unwrap();
        assert!(!summary.completed);
        assert_eq!(summary.error.as_deref(), Some("oracle call failed"));
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_hang_up_without_terminal_message() {
        let (channel, endpoint) = SinkChannel::pair(4);
        drop(channel);
        let (summary, written) = consume_into(endpoint).await.unwrap();
        assert_eq!(summary, OutputSummary::default());
        assert!(written.is_empty());
    }
}
