// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statement types
//!
//! Type tags produced by the PL/SQL parser. The tags the pipeline reasons
//! about are modelled as variants; every other tag (IF, LOOP, ASSIGNMENT, ...)
//! is carried verbatim in [`StatementType::Other`].
//!
//! ## Classification
//!
//! | Set | Members |
//! |-----|---------|
//! | Procedure root | PROCEDURE, FUNCTION, CREATE_PROCEDURE_BODY, TRIGGER |
//! | Not analyzable | FILE, FOLDER, PROCEDURE, FUNCTION, CREATE_PROCEDURE_BODY, TRIGGER, DECLARE, SPEC |
//! | DML | SELECT, INSERT, UPDATE, DELETE, MERGE, EXECUTE_IMMEDIATE, FETCH |
//! | Variable declaration | PACKAGE_VARIABLE, DECLARE, SPEC |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Statement type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatementType {
    File,
    Folder,
    Procedure,
    Function,
    CreateProcedureBody,
    Trigger,
    Declare,
    Spec,
    PackageVariable,
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    ExecuteImmediate,
    Fetch,
    /// Any other parser tag, kept as written
    Other(String),
}

/// Edge label linking a DML statement to the table it touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmlRelationship {
    From,
    Writes,
    Execute,
}

impl DmlRelationship {
    /// Resolve a DML type reported by the oracle (case-insensitive)
    pub fn from_dml_type(dml_type: &str) -> Option<Self> {
        match dml_type.trim().to_ascii_uppercase().as_str() {
            "SELECT" | "FETCH" => Some(Self::From),
            "UPDATE" | "INSERT" | "DELETE" | "MERGE" => Some(Self::Writes),
            "EXECUTE" | "EXECUTE_IMMEDIATE" => Some(Self::Execute),
            _ => None,
        }
    }

    /// Graph edge label
    pub fn label(&self) -> &'static str {
        match self {
            Self::From => "FROM",
            Self::Writes => "WRITES",
            Self::Execute => "EXECUTE",
        }
    }
}

impl StatementType {
    /// Graph label / parser tag for this type
    pub fn as_str(&self) -> &str {
        match self {
            Self::File => "FILE",
            Self::Folder => "FOLDER",
            Self::Procedure => "PROCEDURE",
            Self::Function => "FUNCTION",
            Self::CreateProcedureBody => "CREATE_PROCEDURE_BODY",
            Self::Trigger => "TRIGGER",
            Self::Declare => "DECLARE",
            Self::Spec => "SPEC",
            Self::PackageVariable => "PACKAGE_VARIABLE",
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Merge => "MERGE",
            Self::ExecuteImmediate => "EXECUTE_IMMEDIATE",
            Self::Fetch => "FETCH",
            Self::Other(tag) => tag,
        }
    }

    /// Opens a procedure scope for its descendants
    pub fn is_procedure_root(&self) -> bool {
        matches!(
            self,
            Self::Procedure | Self::Function | Self::CreateProcedureBody | Self::Trigger
        )
    }

    /// Sent to the oracle for analysis
    pub fn is_analyzable(&self) -> bool {
        !matches!(
            self,
            Self::CreateProcedureBody
                | Self::File
                | Self::Procedure
                | Self::Function
                | Self::Declare
                | Self::Trigger
                | Self::Folder
                | Self::Spec
        )
    }

    /// Gets a second, table-oriented analysis
    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            Self::Select
                | Self::Insert
                | Self::Update
                | Self::Delete
                | Self::Merge
                | Self::ExecuteImmediate
                | Self::Fetch
        )
    }

    pub fn is_variable_declaration(&self) -> bool {
        matches!(self, Self::PackageVariable | Self::Declare | Self::Spec)
    }

    /// A NEXT edge is never drawn out of these siblings
    pub fn breaks_next_chain(&self) -> bool {
        matches!(
            self,
            Self::Function | Self::Procedure | Self::PackageVariable | Self::Trigger
        )
    }
}

impl From<&str> for StatementType {
    fn from(tag: &str) -> Self {
        match tag {
            "FILE" => Self::File,
            "FOLDER" => Self::Folder,
            "PROCEDURE" => Self::Procedure,
            "FUNCTION" => Self::Function,
            "CREATE_PROCEDURE_BODY" => Self::CreateProcedureBody,
            "TRIGGER" => Self::Trigger,
            "DECLARE" => Self::Declare,
            "SPEC" => Self::Spec,
            "PACKAGE_VARIABLE" => Self::PackageVariable,
            "SELECT" => Self::Select,
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "MERGE" => Self::Merge,
            "EXECUTE_IMMEDIATE" => Self::ExecuteImmediate,
            "FETCH" => Self::Fetch,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for StatementType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<StatementType> for String {
    fn from(value: StatementType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip_for_known_and_unknown_tags() {
        for tag in ["SELECT", "CREATE_PROCEDURE_BODY", "IF", "ASSIGNMENT"] {
            assert_eq!(StatementType::from(tag).as_str(), tag);
        }
        assert_eq!(StatementType::from("LOOP"), StatementType::Other("LOOP".into()));
    }

    #[test]
    fn test_structural_types_are_not_analyzable() {
        for tag in ["FILE", "FOLDER", "PROCEDURE", "FUNCTION", "DECLARE", "TRIGGER", "SPEC"] {
            assert!(!StatementType::from(tag).is_analyzable(), "{tag}");
        }
        assert!(StatementType::from("IF").is_analyzable());
        assert!(StatementType::PackageVariable.is_analyzable());
    }

    #[test]
    fn test_dml_set() {
        assert!(StatementType::ExecuteImmediate.is_dml());
        assert!(StatementType::Fetch.is_dml());
        assert!(!StatementType::from("ASSIGNMENT").is_dml());
    }

    #[test]
    fn test_dml_relationship_mapping() {
        assert_eq!(DmlRelationship::from_dml_type("select"), Some(DmlRelationship::From));
        assert_eq!(DmlRelationship::from_dml_type("MERGE"), Some(DmlRelationship::Writes));
        assert_eq!(
            DmlRelationship::from_dml_type("EXECUTE_IMMEDIATE").map(|r| r.label()),
            Some("EXECUTE")
        );
        assert_eq!(DmlRelationship::from_dml_type("CALL"), None);
    }

    #[test]
    fn test_serde_uses_plain_tags() {
        let json = serde_json::to_string(&StatementType::Merge).unwrap();
        assert_eq!(json, "\"MERGE\"");
        let parsed: StatementType = serde_json::from_str("\"WHILE\"").unwrap();
        assert_eq!(parsed, StatementType::Other("WHILE".into()));
    }
}
