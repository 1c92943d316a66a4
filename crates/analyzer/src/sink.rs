// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Sink protocol
//!
//! The persistence consumer is reached through a duplex channel: statement
//! messages go out, and each one is answered with a `process_completed`
//! acknowledgment before the next message may be sent.
//!
//! ## Single writer
//!
//! Batch application, procedure and table finalisation and the static graph
//! all send concurrently. To keep one acknowledgment paired with exactly one
//! message, only the [`SinkWriter`] task touches the channel. Everything
//! else holds a [`SinkHandle`] and submits commands to it:
//!
//! ```text
//! SinkHandle ──cmd──▶ SinkWriter ──SinkMessage──▶ consumer
//!     ▲                   │    ◀──SinkAck──────────┘
//!     └──────reply────────┘
//! ```

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use sql_understanding_ir::{SinkAck, SinkMessage};

/// Result type alias for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The consumer dropped its message receiver
    #[error("Sink consumer is gone")]
    Closed,

    /// The consumer dropped its acknowledgment sender while a message was outstanding
    #[error("Sink acknowledgment channel closed")]
    AckClosed,

    /// The writer task is no longer running
    #[error("Sink writer stopped")]
    WriterStopped,
}

/// Analyzer side of the duplex channel
pub struct SinkChannel {
    pub messages: mpsc::Sender<SinkMessage>,
    pub acks: mpsc::Receiver<SinkAck>,
}

/// Consumer side of the duplex channel
pub struct SinkEndpoint {
    pub messages: mpsc::Receiver<SinkMessage>,
    pub acks: mpsc::Sender<SinkAck>,
}

impl SinkEndpoint {
    /// Acknowledge the message just received
    pub async fn acknowledge(&self) -> SinkResult<()> {
        self.acks
            .send(SinkAck::ProcessCompleted)
            .await
            .map_err(|_| SinkError::AckClosed)
    }
}

impl SinkChannel {
    /// Create a connected pair
    pub fn pair(capacity: usize) -> (SinkChannel, SinkEndpoint) {
        let (message_tx, message_rx) = mpsc::channel(capacity);
        let (ack_tx, ack_rx) = mpsc::channel(capacity);
        (
            SinkChannel {
                messages: message_tx,
                acks: ack_rx,
            },
            SinkEndpoint {
                messages: message_rx,
                acks: ack_tx,
            },
        )
    }
}

struct Command {
    message: SinkMessage,
    reply: oneshot::Sender<SinkResult<()>>,
}

/// Task owning the [`SinkChannel`]
pub struct SinkWriter {
    channel: SinkChannel,
    commands: mpsc::Receiver<Command>,
}

impl SinkWriter {
    /// Spawn the writer; it stops once every handle is dropped
    pub fn spawn(channel: SinkChannel) -> (SinkHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let writer = SinkWriter {
            channel,
            commands: rx,
        };
        let task = tokio::spawn(writer.run());
        (SinkHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            let result = self.deliver(command.message).await;
            // The caller may have been cancelled; nothing to report then
            let _ = command.reply.send(result);
        }
    }

    async fn deliver(&mut self, message: SinkMessage) -> SinkResult<()> {
        let expects_ack = message.expects_ack();
        self.channel
            .messages
            .send(message)
            .await
            .map_err(|_| SinkError::Closed)?;
        if !expects_ack {
            return Ok(());
        }

        loop {
            match self.channel.acks.recv().await {
                Some(SinkAck::ProcessCompleted) => return Ok(()),
                Some(SinkAck::Unknown) => debug!("Ignoring unknown sink acknowledgment"),
                None => return Err(SinkError::AckClosed),
            }
        }
    }
}

/// Cloneable entry point to the [`SinkWriter`]
#[derive(Clone)]
pub struct SinkHandle {
    commands: mpsc::Sender<Command>,
}

impl SinkHandle {
    async fn submit(&self, message: SinkMessage) -> SinkResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { message, reply })
            .await
            .map_err(|_| SinkError::WriterStopped)?;
        response.await.map_err(|_| SinkError::WriterStopped)?
    }

    /// Send one unit of statements and wait for its acknowledgment
    ///
    /// An empty unit is not sent.
    pub async fn send_statements(&self, statements: Vec<String>, line: u32) -> SinkResult<()> {
        if statements.is_empty() {
            return Ok(());
        }
        self.submit(SinkMessage::AnalysisCode { statements, line }).await
    }

    pub async fn send_end(&self) -> SinkResult<()> {
        self.submit(SinkMessage::EndAnalysis).await
    }

    pub async fn send_error(&self, message: impl Into<String>) -> SinkResult<()> {
        self.submit(SinkMessage::Error {
            message: message.into(),
        })
        .await
    }
}
