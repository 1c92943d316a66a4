// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for sql-understanding
//!
//! This crate provides common testing components including:
//! - A mock oracle with per-range answers, delays and failures
//! - A recording sink consumer that acknowledges every message
//! - Sample sources with their parse trees
//! - Assertions over recorded graph mutations

pub mod assertions;
pub mod fixtures;
pub mod mock_oracle;
pub mod recording_sink;

// Re-exports for convenience
pub use assertions::GraphAssertions;
pub use fixtures::{LineCost, SourceFixture, SqlFixtures, config, scope};
pub use mock_oracle::{MockOracle, MockOracleBuilder, OracleEvent};
pub use recording_sink::{Recording, RecordingSink};
