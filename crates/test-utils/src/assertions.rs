// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Graph-specific test helpers and custom assertions

use sql_understanding_ir::SinkMessage;

use crate::recording_sink::Recording;

/// Custom assertion helpers for recorded runs
pub struct GraphAssertions;

impl GraphAssertions {
    /// Assert the run ended with exactly one `end_analysis` and no error
    pub fn assert_completed(recording: &Recording) {
        assert_eq!(
            recording.last(),
            Some(&SinkMessage::EndAnalysis),
            "Run did not end with end_analysis: {:?}",
            recording.last()
        );
        let terminals = recording
            .messages
            .iter()
            .filter(|m| !m.expects_ack())
            .count();
        assert_eq!(terminals, 1, "Expected a single terminal message");
    }

    /// Assert the run ended with an error mentioning `needle`
    pub fn assert_failed_with(recording: &Recording, needle: &str) {
        match recording.last() {
            Some(SinkMessage::Error { message }) => assert!(
                message.contains(needle),
                "Error '{}' does not mention '{}'",
                message,
                needle
            ),
            other => panic!("Expected an error message, found {:?}", other),
        }
        assert!(
            !recording.messages.contains(&SinkMessage::EndAnalysis),
            "A failed run must not send end_analysis"
        );
    }

    /// Assert some statement contains `needle`
    pub fn assert_statement(recording: &Recording, needle: &str) {
        assert!(
            recording.position(needle).is_some(),
            "No statement contains '{}'",
            needle
        );
    }

    /// Assert no statement contains `needle`
    pub fn assert_no_statement(recording: &Recording, needle: &str) {
        assert!(
            recording.position(needle).is_none(),
            "Unexpected statement containing '{}': {:?}",
            needle,
            recording.matching(needle)
        );
    }

    /// Assert the first statement containing `first` precedes the first containing `second`
    pub fn assert_before(recording: &Recording, first: &str, second: &str) {
        let a = recording.position(first);
        let b = recording.position(second);
        match (a, b) {
            (Some(a), Some(b)) => assert!(
                a < b,
                "'{}' (at {}) should come before '{}' (at {})",
                first,
                a,
                second,
                b
            ),
            _ => panic!("Missing statement: '{}' -> {:?}, '{}' -> {:?}", first, a, second, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> Recording {
        Recording {
            messages: vec![
                SinkMessage::AnalysisCode {
                    statements: vec!["MERGE (n:SELECT)".into(), "MERGE (t:Table)".into()],
                    line: 4,
                },
                SinkMessage::EndAnalysis,
            ],
        }
    }

    #[test]
    fn test_assert_completed() {
        let recording = recording();
        GraphAssertions::assert_completed(&recording);
        GraphAssertions::assert_before(&recording, "n:SELECT", "t:Table");
        GraphAssertions::assert_no_statement(&recording, "CALL");
    }

    #[test]
    #[should_panic(expected = "should come before")]
    fn test_assert_before_detects_order() {
        GraphAssertions::assert_before(&recording(), "t:Table", "n:SELECT");
    }
}
