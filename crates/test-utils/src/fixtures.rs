// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures: sample sources with their parse trees, scopes and costs

use sql_understanding_analyzer::{AnalyzerConfig, GraphScope, TokenCost};
use sql_understanding_ir::ParsedNode;

/// Token cost of ten per line, independent of the text
#[derive(Debug, Clone, Copy)]
pub struct LineCost(pub usize);

impl Default for LineCost {
    fn default() -> Self {
        Self(10)
    }
}

impl TokenCost for LineCost {
    fn cost(&self, code: &str) -> usize {
        code.lines().count() * self.0
    }
}

pub fn scope() -> GraphScope {
    GraphScope::new("tester", "demo", "PKG_ORDERS", "pkg_orders.sql")
}

pub fn config() -> AnalyzerConfig {
    AnalyzerConfig::new(scope())
}

/// A source file and the tree the parser reports for it
#[derive(Debug, Clone)]
pub struct SourceFixture {
    pub source: String,
    pub tree: ParsedNode,
}

/// Sample programs
pub struct SqlFixtures;

impl SqlFixtures {
    /// One procedure with a declaration, a query, and an `IF` holding an
    /// update and an external call
    ///
    /// Analyzable nodes in traversal order: SELECT 4, UPDATE 6, CALL 7, IF 5-8.
    pub fn close_orders() -> SourceFixture {
        let source = "\
CREATE OR REPLACE PROCEDURE SALES.CLOSE_ORDERS(p_id IN NUMBER) AS
  v_total NUMBER := 0;
BEGIN
  SELECT SUM(amount) INTO v_total FROM ORDERS WHERE id = p_id;
  IF v_total > 100 THEN
    UPDATE ORDERS SET status = 'CLOSED' WHERE id = p_id;
    AUDIT_PKG.LOG_CLOSE(p_id);
  END IF;
END;";
        let tree = ParsedNode::new("FILE", 1, 9).with_children(vec![
            ParsedNode::new("PROCEDURE", 1, 9).with_children(vec![
                ParsedNode::new("SPEC", 1, 1),
                ParsedNode::new("DECLARE", 2, 2),
                ParsedNode::new("SELECT", 4, 4),
                ParsedNode::new("IF", 5, 8).with_children(vec![
                    ParsedNode::new("UPDATE", 6, 6),
                    ParsedNode::new("CALL", 7, 7),
                ]),
            ]),
        ]);
        SourceFixture {
            source: source.to_string(),
            tree,
        }
    }

    /// Two procedures in one package body
    ///
    /// `RESERVE` holds ASSIGNMENT 3 and INSERT 4; `RELEASE` holds DELETE 8.
    pub fn two_procedures() -> SourceFixture {
        let source = "\
CREATE OR REPLACE PACKAGE BODY INV_PKG AS
PROCEDURE RESERVE(p_item NUMBER) IS BEGIN
  v_count := v_count + 1;
  INSERT INTO HOLDS (item_id) VALUES (p_item);
END;

PROCEDURE RELEASE(p_item NUMBER) IS BEGIN
  DELETE FROM HOLDS WHERE item_id = p_item;
END;
END INV_PKG;";
        let tree = ParsedNode::new("FILE", 1, 10).with_children(vec![
            ParsedNode::new("PACKAGE_BODY", 1, 10).with_children(vec![
                ParsedNode::new("PROCEDURE", 2, 5).with_children(vec![
                    ParsedNode::new("ASSIGNMENT", 3, 3),
                    ParsedNode::new("INSERT", 4, 4),
                ]),
                ParsedNode::new("PROCEDURE", 7, 9)
                    .with_children(vec![ParsedNode::new("DELETE", 8, 8)]),
            ]),
        ]);
        SourceFixture {
            source: source.to_string(),
            tree,
        }
    }

    /// A package spec declaring one global variable at line 2
    pub fn package_spec() -> SourceFixture {
        let source = "\
CREATE OR REPLACE PACKAGE INV_PKG AS
  g_limit CONSTANT NUMBER := 10;
END INV_PKG;";
        let tree = ParsedNode::new("FILE", 1, 3)
            .with_children(vec![ParsedNode::new("PACKAGE_VARIABLE", 2, 2)]);
        SourceFixture {
            source: source.to_string(),
            tree,
        }
    }

    /// `count` single-line statements under one FILE node, outside any procedure
    pub fn flat_statements(count: u32) -> SourceFixture {
        let source: String = (1..=count)
            .map(|line| format!("UPDATE T{line} SET flag = 1;"))
            .collect::<Vec<_>>()
            .join("\n");
        let tree = ParsedNode::new("FILE", 1, count).with_children(
            (1..=count)
                .map(|line| ParsedNode::new("UPDATE", line, line))
                .collect(),
        );
        SourceFixture { source, tree }
    }
}
