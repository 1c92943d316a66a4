// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Sink messages
//!
//! Wire format of the duplex channel between the analyzer and the
//! persistence consumer. Every `analysis_code` message is answered with one
//! `process_completed` acknowledgment before the next one is sent.

use serde::{Deserialize, Serialize};

/// Analyzer to consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkMessage {
    /// A unit of graph mutation statements
    AnalysisCode {
        statements: Vec<String>,
        /// Progress marker: the highest source line covered so far
        line: u32,
    },
    /// The run finished normally
    EndAnalysis,
    /// The run aborted
    Error { message: String },
}

impl SinkMessage {
    /// Whether the consumer must acknowledge this message
    pub fn expects_ack(&self) -> bool {
        matches!(self, SinkMessage::AnalysisCode { .. })
    }
}

/// Consumer to analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkAck {
    ProcessCompleted,
    /// Any other tag; ignored by the sender
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let message = SinkMessage::AnalysisCode {
            statements: vec!["MATCH (n) RETURN n".to_string()],
            line: 42,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "analysis_code");
        assert_eq!(json["line"], 42);

        let end = serde_json::to_string(&SinkMessage::EndAnalysis).unwrap();
        assert_eq!(end, r#"{"type":"end_analysis"}"#);

        let error = serde_json::to_value(SinkMessage::Error { message: "boom".into() }).unwrap();
        assert_eq!(error["type"], "error");
        assert_eq!(error["message"], "boom");
    }

    #[test]
    fn test_ack_decoding() {
        let ack: SinkAck = serde_json::from_str(r#"{"type":"process_completed"}"#).unwrap();
        assert_eq!(ack, SinkAck::ProcessCompleted);
        let other: SinkAck = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(other, SinkAck::Unknown);
    }

    #[test]
    fn test_only_statement_messages_expect_ack() {
        assert!(SinkMessage::AnalysisCode { statements: vec![], line: 1 }.expects_ack());
        assert!(!SinkMessage::EndAnalysis.expects_ack());
    }
}
