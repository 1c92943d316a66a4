// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for Oracle calls
//!
//! This module defines the error types used throughout the oracle layer.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for Oracle operations
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors that can occur during Oracle calls
#[derive(Debug, Error, Clone, Serialize)]
pub enum OracleError {
    /// The service could not be reached or rejected the call
    #[error("Oracle call failed: {0}")]
    CallFailed(String),

    /// The service answered with something that is not the expected payload
    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),

    /// Failed to serialize or deserialize a payload
    #[error("Failed to serialize oracle payload: {0}")]
    SerializationError(String),

    /// The blocking task running the call panicked or was cancelled
    #[error("Oracle task failed: {0}")]
    TaskFailed(String),

    /// A recorded replay document could not be loaded
    #[error("Invalid replay document: {0}")]
    InvalidDocument(String),
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OracleError::CallFailed("503 from upstream".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Oracle call failed"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: OracleError = json_err.into();
        assert!(matches!(err, OracleError::SerializationError(_)));
    }
}
