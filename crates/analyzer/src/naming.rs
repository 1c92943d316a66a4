// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Procedure name extraction from declaration text.
//!
//! The parser only reports where a procedure starts, so the name is read
//! back from the declaration on its first code line: `CREATE [OR REPLACE]
//! PROCEDURE|FUNCTION|TRIGGER` followed by up to three dotted parts, any of
//! which may be double-quoted.

use std::sync::LazyLock;

use regex::Regex;

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:CREATE\s+(?:OR\s+REPLACE\s+)?)?(?:PROCEDURE|FUNCTION|TRIGGER)\s+((?:"[^"]+"|[A-Za-z_][\w$#]*)(?:\s*\.\s*(?:"[^"]+"|[A-Za-z_][\w$#]*)){0,2})"#,
    )
    .expect("declaration pattern is valid")
});

static LINE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*:\s*").expect("line prefix pattern is valid"));

static PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]+"|[A-Za-z_][\w$#]*"#).expect("part pattern is valid"));

/// Schema and name of a declared procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub schema: Option<String>,
    /// `NAME`, or `PACKAGE.NAME` for three-part declarations
    pub name: String,
}

/// Find a procedure, function or trigger declaration on the first line of `code`
///
/// Later lines are never searched, so a package body does not take the name
/// of its first nested procedure. A leading `"<line>: "` prefix is ignored. Quotes are stripped from every
/// part. With three parts the first is the schema and the other two form the
/// name; with two parts the first is the schema.
pub fn extract_qualified_name(code: &str) -> Option<QualifiedName> {
    let first_line = code.lines().next().unwrap_or("");
    let normalized = LINE_PREFIX.replace(first_line, "");
    let captured = DECLARATION.captures(&normalized)?.get(1)?.as_str();
    let parts: Vec<&str> = PART
        .find_iter(captured)
        .map(|part| part.as_str().trim_matches('"'))
        .collect();

    match parts.as_slice() {
        [schema, package, name] => Some(QualifiedName {
            schema: Some(schema.to_string()),
            name: format!("{package}.{name}"),
        }),
        [schema, name] => Some(QualifiedName {
            schema: Some(schema.to_string()),
            name: name.to_string(),
        }),
        [name] => Some(QualifiedName {
            schema: None,
            name: name.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_procedure() {
        let name = extract_qualified_name("3: PROCEDURE reserve_stock(p_id IN NUMBER) IS").unwrap();
        assert_eq!(name.schema, None);
        assert_eq!(name.name, "reserve_stock");
    }

    #[test]
    fn test_schema_qualified_create() {
        let name = extract_qualified_name("1: CREATE OR REPLACE FUNCTION inv.get_qty RETURN NUMBER").unwrap();
        assert_eq!(name.schema.as_deref(), Some("inv"));
        assert_eq!(name.name, "get_qty");
    }

    #[test]
    fn test_three_parts_with_quotes() {
        let name = extract_qualified_name(r#"create procedure "HR" . "PKG_EMP".hire"#).unwrap();
        assert_eq!(name.schema.as_deref(), Some("HR"));
        assert_eq!(name.name, "PKG_EMP.hire");
    }

    #[test]
    fn test_identifier_characters() {
        let name = extract_qualified_name("7: TRIGGER trg_orders$audit#1 BEFORE INSERT").unwrap();
        assert_eq!(name.name, "trg_orders$audit#1");
    }

    #[test]
    fn test_no_declaration() {
        assert_eq!(extract_qualified_name("5: SELECT 1 FROM dual;"), None);
        assert_eq!(extract_qualified_name(""), None);
    }

    #[test]
    fn test_only_first_line_is_searched() {
        let body = "1: CREATE OR REPLACE PACKAGE BODY inv AS\n2: PROCEDURE reserve(p_id NUMBER) IS";
        assert_eq!(extract_qualified_name(body), None);

        let procedure = "4: PROCEDURE reserve(p_id NUMBER) IS\n5: FUNCTION helper RETURN NUMBER";
        assert_eq!(extract_qualified_name(procedure).unwrap().name, "reserve");
    }

    #[test]
    fn test_keyword_inside_word_is_ignored() {
        assert_eq!(extract_qualified_name("2: v_procedurex := 1;"), None);
    }
}
