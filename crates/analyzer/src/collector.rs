// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statement Collector
//!
//! Flattens the parsed tree into a [`NodeArena`] and discovers procedures.
//!
//! The walk is post-order, so children are pushed before their parent. A
//! procedure root opens a new procedure for itself and its descendants,
//! until a nested root opens another one. Each analyzable node in a
//! procedure adds one to that procedure's pending count. Non-analyzable
//! nodes have nothing to wait for and are signalled right away.

use std::collections::BTreeMap;

use sql_understanding_ir::ParsedNode;

use crate::config::GraphScope;
use crate::error::AnalyzerResult;
use crate::model::{NodeArena, NodeId, ProcedureInfo, ProcedureRef, StatementNode};
use crate::naming::extract_qualified_name;
use crate::tokens::TokenCost;

/// Output of [`StatementCollector::collect`]
#[derive(Debug, Default)]
pub struct Collection {
    pub arena: NodeArena,
    pub procedures: BTreeMap<String, ProcedureInfo>,
}

pub struct StatementCollector<'a> {
    source_lines: Vec<&'a str>,
    scope: &'a GraphScope,
    cost: &'a dyn TokenCost,
    nodes: Vec<StatementNode>,
    procedures: BTreeMap<String, ProcedureInfo>,
}

impl<'a> StatementCollector<'a> {
    pub fn new(source: &'a str, scope: &'a GraphScope, cost: &'a dyn TokenCost) -> Self {
        Self {
            source_lines: source.split('\n').collect(),
            scope,
            cost,
            nodes: Vec::new(),
            procedures: BTreeMap::new(),
        }
    }

    /// Walk `tree` and build the arena
    ///
    /// # Errors
    ///
    /// Returns `AnalyzerError::MalformedTree` if any line range is inverted,
    /// starts at zero or escapes its parent.
    pub fn collect(mut self, tree: &ParsedNode) -> AnalyzerResult<Collection> {
        tree.validate()?;
        self.visit(tree, None);
        Ok(Collection {
            arena: NodeArena::new(self.nodes),
            procedures: self.procedures,
        })
    }

    /// Source lines of `[start, end]`; lines past the end of the file are empty
    fn slice(&self, start: u32, end: u32) -> Vec<(u32, String)> {
        (start..=end)
            .map(|line_no| {
                let text = self
                    .source_lines
                    .get(line_no as usize - 1)
                    .copied()
                    .unwrap_or("");
                (line_no, text.to_string())
            })
            .collect()
    }

    fn procedure_key(&self, name: Option<&str>, start_line: u32) -> String {
        let base = match name {
            Some(name) => name.to_string(),
            None => format!("anonymous_{start_line}"),
        };
        format!(
            "{}:{}:{}:{}",
            self.scope.folder_name, self.scope.file_name, base, start_line
        )
    }

    fn visit(&mut self, tree: &ParsedNode, inherited: Option<&ProcedureRef>) -> NodeId {
        let lines = self.slice(tree.start_line, tree.end_line);
        let mut node = StatementNode::new(
            NodeId(0),
            tree.node_type.clone(),
            lines,
            tree.start_line,
            tree.end_line,
        );

        let procedure = if tree.node_type.is_procedure_root() {
            Some(self.open_procedure(&node))
        } else {
            inherited.cloned()
        };

        let children: Vec<NodeId> = tree
            .children
            .iter()
            .map(|child| self.visit(child, procedure.as_ref()))
            .collect();

        let id = NodeId(self.nodes.len());
        node.id = id;
        node.token = self.cost.cost(&node.code);
        node.children = children;

        match procedure.as_ref() {
            Some(procedure) if node.analyzable => {
                if let Some(info) = self.procedures.get_mut(&procedure.key) {
                    info.pending += 1;
                }
            }
            _ if !node.analyzable => node.signal().set(),
            _ => {}
        }
        node.procedure = procedure;

        for child in &node.children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(node);
        id
    }

    fn open_procedure(&mut self, node: &StatementNode) -> ProcedureRef {
        let qualified = extract_qualified_name(&node.code);
        let name = qualified.as_ref().map(|q| q.name.as_str());
        let key = self.procedure_key(name, node.start_line);
        let schema = qualified.as_ref().and_then(|q| q.schema.clone());

        let info = self
            .procedures
            .entry(key.clone())
            .or_insert_with(|| ProcedureInfo {
                key: key.clone(),
                procedure_type: node.node_type.clone(),
                procedure_name: name.map(str::to_string).unwrap_or_else(|| key.clone()),
                schema_name: schema.clone(),
                start_line: node.start_line,
                end_line: node.end_line,
                pending: 0,
            });

        ProcedureRef {
            key,
            name: info.procedure_name.clone(),
            schema,
        }
    }
}
