// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Statement model
//!
//! Flattened view of the parsed tree shared by every stage of a run.
//!
//! ## Overview
//!
//! All nodes live in one [`NodeArena`], in post-order: a child always has a
//! smaller [`NodeId`] than its parent. Children and parents are referenced by
//! id, never by pointer, so the arena can be shared read-only between tasks
//! behind an `Arc`.
//!
//! The only state that changes after collection is a node's summary and its
//! completion signal. Both are written once, by the apply stage, and the
//! summary is always written before the signal is set.

use std::fmt;
use std::sync::OnceLock;

use sql_understanding_ir::{
    CodeAnalysis, CodeAnalysisRequest, DmlRange, LineRange, StatementType, TableAnalysis,
    TableAnalysisRequest,
};

use crate::signal::CompletionSignal;

/// Placeholder for a child whose analysis produced no summary
pub const CODE_PLACEHOLDER: &str = "... code ...";

/// Index of a node in its [`NodeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Procedure a node belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureRef {
    /// `<folder>:<file>:<name>:<start>`
    pub key: String,
    pub name: String,
    pub schema: Option<String>,
}

/// One analyzable or structural unit of the parsed tree
#[derive(Debug)]
pub struct StatementNode {
    pub id: NodeId,
    pub start_line: u32,
    pub end_line: u32,
    pub node_type: StatementType,
    /// Source lines of the node, numbered
    pub lines: Vec<(u32, String)>,
    /// `"<line>: <text>"` rendering of `lines`
    pub code: String,
    pub token: usize,
    pub analyzable: bool,
    pub dml: bool,
    pub procedure: Option<ProcedureRef>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    summary: OnceLock<String>,
    signal: CompletionSignal,
}

impl StatementNode {
    pub fn new(
        id: NodeId,
        node_type: StatementType,
        lines: Vec<(u32, String)>,
        start_line: u32,
        end_line: u32,
    ) -> Self {
        let code = render_lines(&lines);
        let analyzable = node_type.is_analyzable();
        let dml = node_type.is_dml();
        Self {
            id,
            start_line,
            end_line,
            node_type,
            lines,
            code,
            token: 0,
            analyzable,
            dml,
            procedure: None,
            children: Vec::new(),
            parent: None,
            summary: OnceLock::new(),
            signal: CompletionSignal::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn range(&self) -> LineRange {
        LineRange::new(self.start_line, self.end_line)
    }

    /// `<TYPE>[<start>]`
    pub fn display_name(&self) -> String {
        format!("{}[{}]", self.node_type, self.start_line)
    }

    /// Key of this node's fragment in its procedure bucket
    pub fn fragment_key(&self) -> String {
        format!("{}_{}_{}", self.node_type, self.start_line, self.end_line)
    }

    pub fn procedure_key(&self) -> Option<&str> {
        self.procedure.as_ref().map(|p| p.key.as_str())
    }

    pub fn procedure_name(&self) -> &str {
        self.procedure.as_ref().map(|p| p.name.as_str()).unwrap_or("")
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.get().map(String::as_str)
    }

    /// Record the analysis summary; only the first call has an effect
    pub fn set_summary(&self, summary: impl Into<String>) {
        let _ = self.summary.set(summary.into());
    }

    pub fn signal(&self) -> &CompletionSignal {
        &self.signal
    }
}

fn render_lines(lines: &[(u32, String)]) -> String {
    lines
        .iter()
        .map(|(line_no, text)| format!("{line_no}: {text}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// All nodes of one file, in post-order
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<StatementNode>,
}

impl NodeArena {
    pub fn new(nodes: Vec<StatementNode>) -> Self {
        Self { nodes }
    }

    pub fn get(&self, id: NodeId) -> &StatementNode {
        &self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatementNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &StatementNode> {
        self.get(id).children.iter().map(|child| self.get(*child))
    }

    /// The root is collected last
    pub fn root(&self) -> Option<&StatementNode> {
        self.nodes.last()
    }

    /// Code of a node with every child range replaced by that child's summary
    ///
    /// Children without a summary are replaced by [`CODE_PLACEHOLDER`]. A
    /// multi-line summary is numbered from the child's start line, skipping
    /// blank lines. Leaves return their raw code.
    pub fn compact_code(&self, id: NodeId) -> String {
        let node = self.get(id);
        if !node.has_children() {
            return node.code.clone();
        }

        let mut children: Vec<&StatementNode> = self.children(id).collect();
        children.sort_by_key(|child| child.start_line);

        let mut result: Vec<String> = Vec::new();
        let mut lines = node.lines.iter().peekable();

        for child in children {
            while let Some((line_no, text)) = lines.next_if(|(line_no, _)| *line_no < child.start_line) {
                result.push(format!("{line_no}: {text}"));
            }

            let summary = child
                .summary()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(CODE_PLACEHOLDER);
            if summary.contains('\n') {
                for (offset, line) in summary.split('\n').enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    result.push(format!("{}: {line}", child.start_line + offset as u32));
                }
            } else {
                result.push(format!("{}: {summary}", child.start_line));
            }

            while lines.next_if(|(line_no, _)| *line_no <= child.end_line).is_some() {}
        }

        for (line_no, text) in lines {
            result.push(format!("{line_no}: {text}"));
        }

        result.join("\n")
    }
}

/// Procedure discovered during collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureInfo {
    pub key: String,
    pub procedure_type: StatementType,
    /// Declared name, or the key when none could be read
    pub procedure_name: String,
    pub schema_name: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    /// Analyzable nodes still to be applied
    pub pending: usize,
}

/// Token-budgeted group of nodes sent to the oracle together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisBatch {
    /// Starts at 1
    pub id: usize,
    pub nodes: Vec<NodeId>,
    pub ranges: Vec<LineRange>,
    pub dml_ranges: Vec<DmlRange>,
    /// Highest end line among the members
    pub progress_line: u32,
}

impl AnalysisBatch {
    pub fn new(id: usize, nodes: Vec<NodeId>, arena: &NodeArena) -> Self {
        let members: Vec<&StatementNode> = nodes.iter().map(|id| arena.get(*id)).collect();
        let ranges = members.iter().map(|node| node.range()).collect();
        let dml_ranges = members
            .iter()
            .filter(|node| node.dml)
            .map(|node| DmlRange {
                start_line: node.start_line,
                end_line: node.end_line,
                statement_type: node.node_type.clone(),
            })
            .collect();
        let progress_line = members.iter().map(|node| node.end_line).max().unwrap_or(0);
        Self {
            id,
            nodes,
            ranges,
            dml_ranges,
            progress_line,
        }
    }

    /// Compact code of every member, blank-line separated
    pub fn general_payload(&self, arena: &NodeArena) -> String {
        self.nodes
            .iter()
            .map(|id| arena.compact_code(*id))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Raw code of the DML members, if any
    pub fn dml_payload(&self, arena: &NodeArena) -> Option<String> {
        let code: Vec<&str> = self
            .nodes
            .iter()
            .map(|id| arena.get(*id))
            .filter(|node| node.dml)
            .map(|node| node.code.as_str())
            .collect();
        if code.is_empty() {
            None
        } else {
            Some(code.join("\n\n"))
        }
    }

    pub fn code_request(&self, arena: &NodeArena) -> Option<CodeAnalysisRequest> {
        if self.ranges.is_empty() {
            return None;
        }
        Some(CodeAnalysisRequest::new(
            self.general_payload(arena),
            self.ranges.clone(),
        ))
    }

    pub fn table_request(&self, arena: &NodeArena) -> Option<TableAnalysisRequest> {
        if self.dml_ranges.is_empty() {
            return None;
        }
        self.dml_payload(arena).map(|code| TableAnalysisRequest {
            code,
            ranges: self.dml_ranges.clone(),
        })
    }
}

/// Oracle output for one batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub batch: AnalysisBatch,
    pub general: Option<CodeAnalysis>,
    pub tables: Option<TableAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(range: std::ops::RangeInclusive<u32>) -> Vec<(u32, String)> {
        range.map(|n| (n, format!("line {n}"))).collect()
    }

    /// IF[2-7] with children SELECT[3-3] and LOOP[5-6]
    fn arena() -> NodeArena {
        let select = StatementNode::new(NodeId(0), StatementType::Select, lines(3..=3), 3, 3);
        let looped = StatementNode::new(NodeId(1), "LOOP".into(), lines(5..=6), 5, 6);
        let mut parent = StatementNode::new(NodeId(2), "IF".into(), lines(2..=7), 2, 7);
        parent.children = vec![NodeId(0), NodeId(1)];
        NodeArena::new(vec![select, looped, parent])
    }

    #[test]
    fn test_code_rendering() {
        let arena = arena();
        assert_eq!(arena.get(NodeId(1)).code, "5: line 5\n6: line 6");
        assert_eq!(arena.get(NodeId(2)).display_name(), "IF[2]");
        assert_eq!(arena.get(NodeId(1)).fragment_key(), "LOOP_5_6");
    }

    #[test]
    fn test_compact_code_uses_placeholder() {
        let arena = arena();
        assert_eq!(
            arena.compact_code(NodeId(2)),
            "2: line 2\n3: ... code ...\n4: line 4\n5: ... code ...\n7: line 7"
        );
    }

    #[test]
    fn test_compact_code_with_summaries() {
        let arena = arena();
        arena.get(NodeId(0)).set_summary("  reads stock  ");
        arena.get(NodeId(1)).set_summary("iterates rows\n\nsums totals");
        assert_eq!(
            arena.compact_code(NodeId(2)),
            "2: line 2\n3: reads stock\n4: line 4\n5: iterates rows\n7: sums totals\n7: line 7"
        );
    }

    #[test]
    fn test_leaf_compact_code_is_raw() {
        let arena = arena();
        arena.get(NodeId(0)).set_summary("ignored");
        assert_eq!(arena.compact_code(NodeId(0)), "3: line 3");
    }

    #[test]
    fn test_batch_derivations() {
        let arena = arena();
        let batch = AnalysisBatch::new(1, vec![NodeId(0), NodeId(1)], &arena);
        assert_eq!(batch.ranges, vec![LineRange::new(3, 3), LineRange::new(5, 6)]);
        assert_eq!(batch.dml_ranges.len(), 1);
        assert_eq!(batch.progress_line, 6);
        assert_eq!(batch.general_payload(&arena), "3: line 3\n\n5: line 5\n6: line 6");
        assert_eq!(batch.dml_payload(&arena).as_deref(), Some("3: line 3"));

        let request = batch.code_request(&arena).unwrap();
        assert_eq!(request.count, 2);
        let tables = batch.table_request(&arena).unwrap();
        assert_eq!(tables.ranges[0].statement_type, StatementType::Select);
    }

    #[test]
    fn test_batch_without_dml() {
        let arena = arena();
        let batch = AnalysisBatch::new(2, vec![NodeId(1)], &arena);
        assert!(batch.dml_payload(&arena).is_none());
        assert!(batch.table_request(&arena).is_none());
    }
}
