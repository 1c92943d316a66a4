// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Parsed statement tree
//!
//! The external parser emits one JSON tree per source file. Each node carries
//! a type tag, an inclusive 1-based line range and its children in source
//! order:
//!
//! ```json
//! {
//!   "type": "FILE", "startLine": 1, "endLine": 12,
//!   "children": [
//!     { "type": "PROCEDURE", "startLine": 1, "endLine": 12, "children": [] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde_util::null_as_default;
use crate::statement::StatementType;

/// One node of the parser's statement tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedNode {
    /// Statement type tag
    #[serde(rename = "type")]
    pub node_type: StatementType,
    /// First line of the statement (1-based, inclusive)
    pub start_line: u32,
    /// Last line of the statement (inclusive)
    pub end_line: u32,
    /// Child statements in source order
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<ParsedNode>,
}

/// Structural problems found in a parsed tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Line numbers start at 1
    #[error("{node_type} node starts at line 0")]
    ZeroLine { node_type: String },

    /// Start line is after end line
    #[error("{node_type} node has inverted range {start_line}-{end_line}")]
    InvertedRange {
        node_type: String,
        start_line: u32,
        end_line: u32,
    },

    /// Child range escapes its parent
    #[error("{child_type} [{child_start}-{child_end}] lies outside parent {parent_type} [{parent_start}-{parent_end}]")]
    ChildOutsideParent {
        parent_type: String,
        parent_start: u32,
        parent_end: u32,
        child_type: String,
        child_start: u32,
        child_end: u32,
    },

    /// The JSON document could not be decoded
    #[error("Invalid tree document: {0}")]
    Decode(String),
}

impl ParsedNode {
    /// Create a leaf node
    pub fn new(node_type: impl Into<StatementType>, start_line: u32, end_line: u32) -> Self {
        Self {
            node_type: node_type.into(),
            start_line,
            end_line,
            children: Vec::new(),
        }
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ParsedNode>) -> Self {
        self.children = children;
        self
    }

    /// Decode a tree from the parser's JSON output
    pub fn from_json(text: &str) -> Result<Self, TreeError> {
        serde_json::from_str(text).map_err(|e| TreeError::Decode(e.to_string()))
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ParsedNode::node_count).sum::<usize>()
    }

    /// Check line ranges of this node and every descendant
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.start_line == 0 {
            return Err(TreeError::ZeroLine {
                node_type: self.node_type.to_string(),
            });
        }
        if self.start_line > self.end_line {
            return Err(TreeError::InvertedRange {
                node_type: self.node_type.to_string(),
                start_line: self.start_line,
                end_line: self.end_line,
            });
        }
        for child in &self.children {
            if child.start_line < self.start_line || child.end_line > self.end_line {
                return Err(TreeError::ChildOutsideParent {
                    parent_type: self.node_type.to_string(),
                    parent_start: self.start_line,
                    parent_end: self.end_line,
                    child_type: child.node_type.to_string(),
                    child_start: child.start_line,
                    child_end: child.end_line,
                });
            }
            child.validate()?;
        }
        Ok(())
    }
}
