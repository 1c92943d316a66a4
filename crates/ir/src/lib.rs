// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Understanding - Shared Types
//!
//! This crate holds the data types exchanged between the layers of the
//! understanding pipeline:
//! - The parsed statement tree handed over by the external parser
//! - Statement type tags and their classification sets
//! - Oracle request and response payloads
//! - Messages exchanged with the persistence sink
//!
//! Nothing here performs I/O; every type is plain data with serde support.

pub mod analysis;
pub mod dbms;
pub mod message;
pub mod metadata;
pub mod range;
mod serde_util;
pub mod statement;
pub mod tree;

// Re-export commonly used types
pub use analysis::{
    CodeAnalysis, CodeAnalysisRequest, DeclaredVariable, RangeAnalysis, VariableAnalysis,
};
pub use dbms::Dbms;
pub use message::{SinkAck, SinkMessage};
pub use metadata::{
    ColumnDescription, ColumnInfo, DbLinkRef, FkRelation, TableAnalysis, TableAnalysisRequest,
    TableEntry, TableIdentifier, TableSummary, TableSummaryRequest,
};
pub use range::{DmlRange, LineRange};
pub use statement::{DmlRelationship, StatementType};
pub use tree::{ParsedNode, TreeError};
