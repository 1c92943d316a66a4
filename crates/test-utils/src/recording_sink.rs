// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! In-process sink consumer that acknowledges and records every message

use std::time::Duration;

use tokio::task::JoinHandle;

use sql_understanding_analyzer::SinkEndpoint;
use sql_understanding_ir::SinkMessage;

/// Everything a run sent to the sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recording {
    pub messages: Vec<SinkMessage>,
}

impl Recording {
    /// Statement units with their progress line, in arrival order
    pub fn units(&self) -> Vec<(u32, &[String])> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                SinkMessage::AnalysisCode { statements, line } => Some((*line, statements.as_slice())),
                _ => None,
            })
            .collect()
    }

    /// Every statement, flattened in arrival order
    pub fn statements(&self) -> Vec<&str> {
        self.units()
            .into_iter()
            .flat_map(|(_, statements)| statements.iter().map(String::as_str))
            .collect()
    }

    /// Statements containing `needle`
    pub fn matching(&self, needle: &str) -> Vec<&str> {
        self.statements()
            .into_iter()
            .filter(|statement| statement.contains(needle))
            .collect()
    }

    /// Position of the first statement containing `needle`
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.statements().iter().position(|s| s.contains(needle))
    }

    pub fn last(&self) -> Option<&SinkMessage> {
        self.messages.last()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.messages.iter().find_map(|message| match message {
            SinkMessage::Error { message } => Some(message.as_str()),
            _ => None,
        })
    }
}

/// Consumer side of a test run
pub struct RecordingSink;

impl RecordingSink {
    /// Consume `endpoint` until a terminal message or until the analyzer hangs up
    pub fn spawn(endpoint: SinkEndpoint) -> JoinHandle<Recording> {
        Self::spawn_with_delay(endpoint, Duration::ZERO)
    }

    /// Like [`spawn`](Self::spawn), but wait `delay` before each acknowledgment
    pub fn spawn_with_delay(mut endpoint: SinkEndpoint, delay: Duration) -> JoinHandle<Recording> {
        tokio::spawn(async move {
            let mut recording = Recording::default();
            while let Some(message) = endpoint.messages.recv().await {
                let expects_ack = message.expects_ack();
                recording.messages.push(message);
                if !expects_ack {
                    break;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if endpoint.acknowledge().await.is_err() {
                    break;
                }
            }
            recording
        })
    }
}
