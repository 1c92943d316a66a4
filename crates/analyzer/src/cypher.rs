// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Graph mutation builder
//!
//! Renders the Cypher statements sent to the sink. Every statement is scoped
//! by the run's [`GraphScope`]: statement nodes are keyed by their label,
//! start line and the folder/file/user/project quadruple; tables and
//! columns are keyed by user and project only, so they are shared across
//! files.
//!
//! ## Quoting
//!
//! Interpolated text is single-quoted with backslashes and quotes escaped
//! (see [`escape`]). Summaries produced by the oracle are embedded as JSON
//! string literals instead, which Cypher accepts as double-quoted strings.

use sql_understanding_ir::{
    ColumnInfo, DeclaredVariable, Dbms, DmlRelationship, FkRelation, StatementType,
    TableIdentifier,
};

use crate::config::GraphScope;
use crate::model::{ProcedureInfo, StatementNode};

/// Escape text for a single-quoted Cypher string
pub fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Cypher literal for oracle-written text
fn json_literal(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn variable_role(node_type: &StatementType) -> &'static str {
    match node_type {
        StatementType::PackageVariable => "패키지 전역 변수",
        StatementType::Declare => "변수 선언및 초기화",
        StatementType::Spec => "함수 및 프로시저 입력 매개변수",
        _ => "알 수 없는 매개변수",
    }
}

#[derive(Debug, Clone)]
pub struct CypherBuilder {
    scope: GraphScope,
    dbms: Dbms,
    locale: String,
    node_props: String,
    folder_props: String,
}

impl CypherBuilder {
    pub fn new(scope: GraphScope, dbms: Dbms, locale: impl Into<String>) -> Self {
        let node_props = format!(
            "folder_name: '{}', file_name: '{}', user_id: '{}', project_name: '{}'",
            escape(&scope.folder_name),
            escape(&scope.file_name),
            escape(&scope.user_id),
            escape(&scope.project_name)
        );
        let folder_props = format!(
            "user_id: '{}', name: '{}', project_name: '{}'",
            escape(&scope.user_id),
            escape(&scope.folder_name),
            escape(&scope.project_name)
        );
        Self {
            scope,
            dbms,
            locale: locale.into(),
            node_props,
            folder_props,
        }
    }

    fn user(&self) -> String {
        escape(&self.scope.user_id)
    }

    fn project(&self) -> String {
        escape(&self.scope.project_name)
    }

    fn folder(&self) -> String {
        escape(&self.scope.folder_name)
    }

    /// `(<var>:<TYPE> {startLine, <scope>})`
    fn node_pattern(&self, var: &str, node: &StatementNode) -> String {
        format!(
            "({var}:{} {{startLine: {}, {}}})",
            node.node_type, node.start_line, self.node_props
        )
    }

    fn folder_link(&self, var: &str) -> String {
        format!(
            "MERGE (folder:Folder {{{}}})\nMERGE (folder)-[:CONTAINS]->({var})",
            self.folder_props
        )
    }

    /// Properties identifying a table; the schema is left out when empty
    fn table_props(&self, table: &TableIdentifier, with_db: bool) -> String {
        let mut props = format!("user_id: '{}', name: '{}'", self.user(), escape(&table.name));
        if !table.schema.is_empty() {
            props.push_str(&format!(", schema: '{}'", escape(&table.schema)));
        }
        if with_db {
            props.push_str(&format!(", db: '{}'", self.dbms));
        }
        props.push_str(&format!(", project_name: '{}'", self.project()));
        props
    }

    fn table_merge(&self, table: &TableIdentifier) -> String {
        let folder = self.folder();
        format!(
            "MERGE (t:Table {{{}}})\n\
             ON CREATE SET t.folder_name = '{folder}'\n\
             ON MATCH SET t.folder_name = CASE WHEN coalesce(t.folder_name,'') = '' THEN '{folder}' ELSE t.folder_name END",
            self.table_props(table, true)
        )
    }

    fn column_props(&self, table: &TableIdentifier, column: &str) -> String {
        format!(
            "user_id: '{}', name: '{}', fqn: '{}', project_name: '{}'",
            self.user(),
            escape(column),
            escape(&table.column_fqn(column)),
            self.project()
        )
    }

    // ----- static graph -----

    /// Initial upsert of a node, before any analysis
    ///
    /// Leaves carry their code; parents also carry their compact code;
    /// the FILE node is named after the file and gets a fixed summary.
    pub fn static_node(&self, node: &StatementNode, compact_code: &str) -> String {
        let has_children = node.has_children();
        let procedure_name = escape(node.procedure_name());
        let pattern = self.node_pattern("n", node);

        let set = if node.node_type == StatementType::File {
            let summary = if self.locale == "en" {
                "File Start Node"
            } else {
                "파일 노드"
            };
            format!(
                "n.endLine = {}, n.name = '{}', n.summary = '{}',\n    n.has_children = {has_children}",
                node.end_line,
                escape(&self.scope.file_name),
                escape(summary)
            )
        } else if !has_children && node.analyzable {
            format!(
                "n.endLine = {}, n.name = '{}', n.node_code = '{}',\n    n.token = {}, n.procedure_name = '{procedure_name}', n.has_children = {has_children}",
                node.end_line,
                escape(&node.display_name()),
                escape(&node.code),
                node.token
            )
        } else {
            format!(
                "n.endLine = {}, n.name = '{}', n.summarized_code = '{}',\n    n.node_code = '{}', n.token = {}, n.procedure_name = '{procedure_name}', n.has_children = {has_children}",
                node.end_line,
                escape(&node.display_name()),
                escape(compact_code),
                escape(&node.code),
                node.token
            )
        };

        format!("MERGE {pattern}\nSET {set}\nWITH n\n{}", self.folder_link("n"))
    }

    pub fn parent_of(&self, parent: &StatementNode, child: &StatementNode) -> String {
        format!(
            "MATCH {}\nMATCH {}\nMERGE (parent)-[:PARENT_OF]->(child)",
            self.node_pattern("parent", parent),
            self.node_pattern("child", child)
        )
    }

    pub fn next(&self, previous: &StatementNode, current: &StatementNode) -> String {
        format!(
            "MATCH {}\nMATCH {}\nMERGE (prev)-[:NEXT]->(current)",
            self.node_pattern("prev", previous),
            self.node_pattern("current", current)
        )
    }

    /// Properties matching a declaration node; package variables are not tied to a procedure
    fn declaration_match(&self, node: &StatementNode) -> String {
        if node.node_type == StatementType::PackageVariable {
            format!("startLine: {}, {}", node.start_line, self.node_props)
        } else {
            format!(
                "startLine: {}, procedure_name: '{}', {}",
                node.start_line,
                escape(node.procedure_name()),
                self.node_props
            )
        }
    }

    pub fn declaration_summary(&self, node: &StatementNode, summary: Option<&str>) -> String {
        format!(
            "MATCH (p:{} {{{}}})\nSET p.summary = {}",
            node.node_type,
            self.declaration_match(node),
            json_literal(summary.unwrap_or(""))
        )
    }

    /// Variable node scoped to the declaration that introduces it
    pub fn declared_variable(&self, node: &StatementNode, variable: &DeclaredVariable) -> Option<String> {
        let name = variable.name.trim();
        if name.is_empty() {
            return None;
        }

        let role = variable_role(&node.node_type);
        let scope = if node.node_type == StatementType::PackageVariable {
            "Global"
        } else {
            "Local"
        };
        let var_props = if node.node_type == StatementType::PackageVariable {
            format!("{}, role: '{role}', scope: '{scope}'", self.node_props)
        } else {
            format!(
                "{}, procedure_name: '{}', role: '{role}', scope: '{scope}'",
                self.node_props,
                escape(node.procedure_name())
            )
        };
        let value = match &variable.value {
            None | Some(serde_json::Value::Null) => json_literal(""),
            Some(value) => value.to_string(),
        };

        Some(format!(
            "MERGE (v:Variable {{name: '{}', {var_props}, type: '{}', parameter_type: '{}', value: {value}}})\n\
             WITH v\n\
             MATCH (p:{} {{{}}})\n\
             MERGE (p)-[:SCOPE]->(v)\n\
             WITH v\n{}",
            escape(name),
            escape(variable.var_type.as_deref().unwrap_or("")),
            escape(variable.parameter_type.as_deref().unwrap_or("")),
            node.node_type,
            self.declaration_match(node),
            self.folder_link("v")
        ))
    }

    // ----- batch apply -----

    /// Upsert of an analysed node with its summary
    pub fn node_summary(&self, node: &StatementNode, compact_code: &str, summary: &str) -> String {
        format!(
            "MERGE {}\n\
             SET n.endLine = {}, n.name = '{}', n.summarized_code = '{}', n.summary = {}, n.node_code = '{}', n.token = {}, n.procedure_name = '{}', n.has_children = {}\n\
             WITH n\n{}",
            self.node_pattern("n", node),
            node.end_line,
            escape(&node.display_name()),
            escape(compact_code),
            json_literal(summary),
            escape(&node.code),
            node.token,
            escape(node.procedure_name()),
            node.has_children(),
            self.folder_link("n")
        )
    }

    pub fn variable_usage(&self, node: &StatementNode, variable: &str) -> String {
        format!(
            "MATCH (v:Variable {{name: '{}', {}}})\nSET v.`{}_{}` = 'Used'",
            escape(variable),
            self.node_props,
            node.start_line,
            node.end_line
        )
    }

    /// CALL edge from `node` to the called procedure
    ///
    /// `PACKAGE.NAME` is an external call, matched by package folder and
    /// upper-cased name; a stub node is created when nothing matches.
    /// A bare name is an internal call resolved within this file.
    pub fn call(&self, node: &StatementNode, call_name: &str) -> String {
        let caller = self.node_pattern("c", node);
        match call_name.to_uppercase().split_once('.') {
            Some((package, name)) => {
                let package = escape(package.trim());
                let name = escape(name.trim());
                let user = self.user();
                format!(
                    "MATCH {caller}\n\
                     OPTIONAL MATCH (p)\n\
                     WHERE (p:PROCEDURE OR p:FUNCTION)\n  AND p.folder_name = '{package}'\n  AND p.procedure_name = '{name}'\n  AND p.user_id = '{user}'\n\
                     WITH c, p\n\
                     FOREACH(_ IN CASE WHEN p IS NULL THEN [1] ELSE [] END |\n    \
                     CREATE (new:PROCEDURE:FUNCTION {{folder_name: '{package}', procedure_name: '{name}', user_id: '{user}', project_name: '{}'}})\n    \
                     MERGE (c)-[:CALL {{scope: 'external'}}]->(new))\n\
                     FOREACH(_ IN CASE WHEN p IS NOT NULL THEN [1] ELSE [] END |\n    \
                     MERGE (c)-[:CALL {{scope: 'external'}}]->(p))",
                    self.project()
                )
            }
            None => format!(
                "MATCH {caller}\n\
                 WITH c\n\
                 MATCH (p {{procedure_name: '{}', {}}})\n\
                 WHERE p:PROCEDURE OR p:FUNCTION\n\
                 MERGE (c)-[:CALL {{scope: 'internal'}}]->(p)",
                escape(call_name.trim()),
                self.node_props
            ),
        }
    }

    /// Table node, its folder link and the DML edge from `node`
    pub fn table_upsert(
        &self,
        node: &StatementNode,
        table: &TableIdentifier,
        relationship: Option<DmlRelationship>,
    ) -> String {
        let mut statement = format!(
            "MERGE {}\nWITH n\n{}\nWITH n, t\n{}\nSET t.db = coalesce(t.db, '{}')",
            self.node_pattern("n", node),
            self.table_merge(table),
            self.folder_link("t"),
            self.dbms
        );
        if let Some(link) = &table.db_link {
            statement.push_str(&format!("\nSET t.db_link = COALESCE(t.db_link, '{}')", escape(link)));
        }
        if let Some(relationship) = relationship {
            statement.push_str(&format!("\nMERGE (n)-[:{}]->(t)", relationship.label()));
        }
        statement
    }

    pub fn column_upsert(&self, table: &TableIdentifier, column: &ColumnInfo) -> String {
        format!(
            "{}\nWITH t\n\
             MERGE (c:Column {{{}}})\n\
             SET c.`dtype` = '{}', c.`description` = '{}', c.`nullable` = '{}'\n\
             WITH t, c\n\
             MERGE (t)-[:HAS_COLUMN]->(c)",
            self.table_merge(table),
            self.column_props(table, column.name.trim()),
            escape(column.dtype.as_deref().unwrap_or("")),
            escape(column.description_text()),
            column.nullable
        )
    }

    /// Remote table reached from `node` through a database link
    pub fn db_link(&self, node: &StatementNode, remote: &TableIdentifier, link: &str, mode: &str) -> String {
        let link = escape(link);
        format!(
            "MERGE (t:Table {{{}}})\n\
             ON CREATE SET t.folder_name = ''\n\
             SET t.db_link = '{link}'\n\
             WITH t\n\
             MERGE (l:DBLink {{user_id: '{}', name: '{link}', project_name: '{}'}})\n\
             MERGE (l)-[:CONTAINS]->(t)\n\
             WITH t\n\
             MERGE {}\n\
             MERGE (n)-[:DB_LINK {{mode: '{}'}}]->(t)",
            self.table_props(remote, false),
            self.user(),
            self.project(),
            self.node_pattern("n", node),
            escape(mode)
        )
    }

    /// Table-level and column-level foreign key edges
    pub fn foreign_key(&self, relation: &FkRelation) -> Option<[String; 2]> {
        let source_table = relation.source_table.trim().to_uppercase();
        let target_table = relation.target_table.trim().to_uppercase();
        let source_column = relation.source_column.trim();
        let target_column = relation.target_column.trim();
        if source_table.is_empty() || target_table.is_empty() || source_column.is_empty() || target_column.is_empty() {
            return None;
        }

        let source = TableIdentifier::parse(&source_table);
        let target = TableIdentifier::parse(&target_table);
        let user = self.user();
        Some([
            format!(
                "MATCH (st:Table {{{}}})\nMATCH (tt:Table {{{}}})\nMERGE (st)-[:FK_TO_TABLE]->(tt)",
                self.table_props(&source, true),
                self.table_props(&target, true)
            ),
            format!(
                "MATCH (sc:Column {{user_id: '{user}', name: '{}', fqn: '{}'}})\n\
                 MATCH (dc:Column {{user_id: '{user}', name: '{}', fqn: '{}'}})\n\
                 MERGE (sc)-[:FK_TO]->(dc)",
                escape(source_column),
                escape(&source.column_fqn(source_column)),
                escape(target_column),
                escape(&target.column_fqn(target_column))
            ),
        ])
    }

    // ----- deferred summaries -----

    pub fn procedure_summary(&self, info: &ProcedureInfo, summary: &str) -> String {
        format!(
            "MATCH (n:{} {{procedure_name: '{}', {}}})\nSET n.summary = {}",
            info.procedure_type,
            escape(&info.procedure_name),
            self.node_props,
            json_literal(summary)
        )
    }

    pub fn table_description(&self, table: &TableIdentifier, description: &str) -> String {
        format!(
            "MATCH (t:Table {{{}}})\nSET t.description = '{}'",
            self.table_props(table, true),
            escape(description)
        )
    }

    pub fn column_description(&self, table: &TableIdentifier, column: &str, description: &str) -> String {
        format!(
            "MATCH (c:Column {{{}}})\nSET c.description = '{}'",
            self.column_props(table, column),
            escape(description)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeId;

    fn builder() -> CypherBuilder {
        CypherBuilder::new(
            GraphScope::new("u1", "shop", "PKG_ORDER", "pkg_order.sql"),
            Dbms::Oracle,
            "en",
        )
    }

    fn node(node_type: &str, start: u32, end: u32) -> StatementNode {
        let lines = (start..=end).map(|n| (n, format!("code '{n}'"))).collect();
        StatementNode::new(NodeId(0), node_type.into(), lines, start, end)
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r"it's a\b"), r"it\'s a\\b");
    }

    #[test]
    fn test_node_summary_statement() {
        let cypher = builder();
        let node = node("SELECT", 4, 5);
        let statement = cypher.node_summary(&node, &node.code, "Reads \"open\" orders");
        assert!(statement.starts_with(
            "MERGE (n:SELECT {startLine: 4, folder_name: 'PKG_ORDER', file_name: 'pkg_order.sql', user_id: 'u1', project_name: 'shop'})"
        ));
        assert!(statement.contains(r#"n.summary = "Reads \"open\" orders""#));
        assert!(statement.contains(r"n.node_code = '4: code \'4\'"));
        assert!(statement.contains("n.name = 'SELECT[4]'"));
        assert!(statement.ends_with("MERGE (folder)-[:CONTAINS]->(n)"));
    }

    #[test]
    fn test_call_statements() {
        let cypher = builder();
        let node = node("ASSIGNMENT", 7, 7);

        let external = cypher.call(&node, "pkg_stock.reserve");
        assert!(external.contains("p.folder_name = 'PKG_STOCK'"));
        assert!(external.contains("p.procedure_name = 'RESERVE'"));
        assert!(external.contains("CREATE (new:PROCEDURE:FUNCTION"));
        assert!(external.contains("[:CALL {scope: 'external'}]"));

        let internal = cypher.call(&node, "log_event");
        assert!(internal.contains("MATCH (p {procedure_name: 'log_event'"));
        assert!(internal.contains("[:CALL {scope: 'internal'}]"));
    }

    #[test]
    fn test_variable_usage_marks_range() {
        let statement = builder().variable_usage(&node("IF", 3, 9), "v_total");
        assert!(statement.ends_with("SET v.`3_9` = 'Used'"));
    }

    #[test]
    fn test_table_and_column_statements() {
        let cypher = builder();
        let node = node("UPDATE", 10, 12);
        let table = TableIdentifier::parse("SALES.ORDERS@REMOTE");

        let statement = cypher.table_upsert(&node, &table, DmlRelationship::from_dml_type("update"));
        assert!(statement.contains(
            "MERGE (t:Table {user_id: 'u1', name: 'ORDERS', schema: 'SALES', db: 'oracle', project_name: 'shop'})"
        ));
        assert!(statement.contains("SET t.db_link = COALESCE(t.db_link, 'REMOTE')"));
        assert!(statement.ends_with("MERGE (n)-[:WRITES]->(t)"));

        let column = ColumnInfo::new("Status").with_dtype("VARCHAR2").with_nullable(false);
        let statement = cypher.column_upsert(&table, &column);
        assert!(statement.contains("fqn: 'sales.orders.status'"));
        assert!(statement.contains("c.`nullable` = 'false'"));
        assert!(statement.ends_with("MERGE (t)-[:HAS_COLUMN]->(c)"));
    }

    #[test]
    fn test_foreign_key_requires_all_parts() {
        let cypher = builder();
        let mut relation = FkRelation {
            source_table: "orders".to_string(),
            source_column: "customer_id".to_string(),
            target_table: "crm.customers".to_string(),
            target_column: "id".to_string(),
        };
        let [tables, columns] = cypher.foreign_key(&relation).unwrap();
        assert!(tables.contains("name: 'CUSTOMERS', schema: 'CRM'"));
        assert!(columns.contains("fqn: 'crm.customers.id'"));

        relation.target_column.clear();
        assert!(cypher.foreign_key(&relation).is_none());
    }

    #[test]
    fn test_static_file_node_uses_locale() {
        let file = node("FILE", 1, 3);
        let english = builder().static_node(&file, "");
        assert!(english.contains("n.name = 'pkg_order.sql', n.summary = 'File Start Node'"));

        let korean = CypherBuilder::new(GraphScope::new("u1", "shop", "F", "f.sql"), Dbms::Postgres, "ko")
            .static_node(&file, "");
        assert!(korean.contains("n.summary = '파일 노드'"));
    }

    #[test]
    fn test_declared_variable_roles() {
        let cypher = builder();
        let package_var = node("PACKAGE_VARIABLE", 2, 2);
        let variable = DeclaredVariable {
            name: "g_rate".to_string(),
            var_type: Some("NUMBER".to_string()),
            parameter_type: None,
            value: Some(serde_json::json!(0.5)),
        };
        let statement = cypher.declared_variable(&package_var, &variable).unwrap();
        assert!(statement.contains("scope: 'Global'"));
        assert!(statement.contains("value: 0.5"));
        assert!(!statement.contains("procedure_name"));

        let blank = DeclaredVariable::default();
        assert!(cypher.declared_variable(&package_var, &blank).is_none());
    }
}
