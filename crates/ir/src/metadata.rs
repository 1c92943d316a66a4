// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Table metadata payloads
//!
//! This module defines the types used to describe the tables, columns,
//! database links and foreign keys that DML statements touch, as reported by
//! the table analysis call, plus the request/response of the end-of-run
//! table summarisation call.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::range::DmlRange;
use crate::serde_util::null_as_default;

/// Input of the table analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAnalysisRequest {
    /// Raw (non-compacted) code of the DML statements
    pub code: String,
    pub ranges: Vec<DmlRange>,
}

/// Output of the table analysis call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tables: Vec<TableEntry>,
}

/// One table touched by one DML statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEntry {
    #[serde(default)]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub end_line: Option<u32>,
    /// Table name, optionally `SCHEMA.TABLE` and/or `@DBLINK`
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub dml_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<ColumnInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub db_links: Vec<DbLinkRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fk_relations: Vec<FkRelation>,
    #[serde(default)]
    pub table_description: Option<String>,
}

impl TableEntry {
    /// Create a new entry with builder pattern
    pub fn new(start_line: u32, end_line: u32, table: impl Into<String>) -> Self {
        Self {
            start_line: Some(start_line),
            end_line: Some(end_line),
            table: Some(table.into()),
            ..Default::default()
        }
    }

    /// Builder method: set DML type
    pub fn with_dml_type(mut self, dml_type: impl Into<String>) -> Self {
        self.dml_type = Some(dml_type.into());
        self
    }

    /// Builder method: add columns
    pub fn with_columns(mut self, columns: Vec<ColumnInfo>) -> Self {
        self.columns = columns;
        self
    }

    /// Builder method: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.table_description = Some(description.into());
        self
    }

    /// Builder method: add a database link
    pub fn with_db_link(mut self, name: impl Into<String>, mode: impl Into<String>) -> Self {
        self.db_links.push(DbLinkRef {
            name: name.into(),
            mode: mode.into(),
        });
        self
    }

    /// Builder method: add a foreign key relation
    pub fn with_fk(mut self, relation: FkRelation) -> Self {
        self.fk_relations.push(relation);
        self
    }
}

/// Column referenced by a DML statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub dtype: Option<String>,
    #[serde(default = "default_nullable", deserialize_with = "nullable_or_true")]
    pub nullable: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Older prompt versions report the description under this key
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_nullable() -> bool {
    true
}

fn nullable_or_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_nullable))
}

impl ColumnInfo {
    /// Create a new column with builder pattern
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: None,
            nullable: true,
            description: None,
            comment: None,
        }
    }

    /// Builder method: set data type
    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self
    }

    /// Builder method: set nullable
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Builder method: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Trimmed description, falling back to `comment`
    pub fn description_text(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or(self.comment.as_deref())
            .unwrap_or("")
            .trim()
    }
}

/// Remote table reached through a database link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbLinkRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// `r` for read, `w` for write
    #[serde(default = "default_link_mode", deserialize_with = "link_mode_or_read")]
    pub mode: String,
}

impl DbLinkRef {
    /// Lower-cased mode, `r` when blank
    pub fn access_mode(&self) -> String {
        let mode = self.mode.trim();
        if mode.is_empty() {
            default_link_mode()
        } else {
            mode.to_lowercase()
        }
    }
}

fn default_link_mode() -> String {
    "r".to_string()
}

fn link_mode_or_read<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|mode| !mode.trim().is_empty())
        .unwrap_or_else(default_link_mode))
}

/// Foreign key between two columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkRelation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_table: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_column: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_table: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_column: String,
}

/// Input of the table summarisation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummaryRequest {
    /// `SCHEMA.TABLE`, or `TABLE` when no schema is known
    pub table_display: String,
    /// Table-level description fragments
    pub summaries: Vec<String>,
    /// Column name to its description fragments
    pub columns: BTreeMap<String, Vec<String>>,
}

/// Output of the table summarisation call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    #[serde(default)]
    pub table_description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<ColumnDescription>,
}

/// Consolidated description of one column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Parsed `SCHEMA.TABLE@DBLINK` identifier
///
/// Case is preserved; an absent schema is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentifier {
    pub schema: String,
    pub name: String,
    pub db_link: Option<String>,
}

impl TableIdentifier {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (left, db_link) = match text.split_once('@') {
            Some((left, link)) => (left, Some(link.to_string()).filter(|l| !l.is_empty())),
            None => (text, None),
        };
        let (schema, name) = match left.split_once('.') {
            Some((schema, name)) => (schema.trim(), name.trim()),
            None => ("", left.trim()),
        };
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            db_link,
        }
    }

    /// Lower-cased fully qualified column name, skipping an empty schema
    pub fn column_fqn(&self, column: &str) -> String {
        [self.schema.as_str(), self.name.as_str(), column]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(".")
            .to_lowercase()
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.schema, self.name)
        }
    }
}
