// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Understanding - Oracle Layer
//!
//! This crate abstracts the external text-analysis service (the "oracle")
//! that turns code plus context into structured annotations. It defines the
//! `Oracle` trait and the adapters used around it:
//!
//! - **Async oracles**: Implement [`Oracle`] directly
//! - **Blocking oracles**: Implement [`BlockingOracle`] and wrap them in
//!   [`Blocking`], which moves every call onto tokio's blocking pool
//! - **Replay oracle**: Answers from a recorded JSON document, for offline
//!   runs and reproducible demos
//!
//! ## Calls
//!
//! | Call | Input | Output |
//! |------|-------|--------|
//! | `analyze_code` | compacted code + ranges | per-range summary, calls, variables |
//! | `analyze_tables` | raw DML code + DML ranges | tables, columns, links, foreign keys |
//! | `summarize_procedure` | fragment key to summary | one consolidated summary |
//! | `summarize_table` | table name + fragments | table and column descriptions |
//! | `analyze_variables` | declaration code | declared variables and a summary |
//!
//! Every call may legitimately return `Ok(None)`: the pipeline treats an
//! absent payload as "nothing usable" rather than as a failure.
//!
//! ## Implementing the Oracle Trait
//!
//! ```rust,ignore
//! use sql_understanding_oracle::{Oracle, OracleResult};
//! use async_trait::async_trait;
//!
//! struct MyOracle;
//!
//! #[async_trait]
//! impl Oracle for MyOracle {
//!     async fn analyze_code(&self, request: &CodeAnalysisRequest) -> OracleResult<Option<CodeAnalysis>> {
//!         // Your implementation here
//!     }
//!     // ...
//! }
//! ```

pub mod blocking;
pub mod error;
pub mod metadata;
pub mod oracle;
pub mod replay;

// Re-exports
pub use blocking::{Blocking, BlockingOracle};
pub use error::{OracleError, OracleResult};
pub use metadata::{
    CodeAnalysis, CodeAnalysisRequest, ProcedureFragments, TableAnalysis, TableAnalysisRequest,
    TableSummary, TableSummaryRequest, VariableAnalysis,
};
pub use oracle::Oracle;
pub use replay::{ReplayDocument, ReplayOracle, code_range};
