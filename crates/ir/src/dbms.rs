// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Target database system recorded on table nodes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Database system the analysed code runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Dbms {
    Oracle,
    #[default]
    Postgres,
    Mysql,
    Mssql,
}

impl Dbms {
    /// Lowercase name stored in the `db` property
    pub fn as_str(&self) -> &'static str {
        match self {
            Dbms::Oracle => "oracle",
            Dbms::Postgres => "postgres",
            Dbms::Mysql => "mysql",
            Dbms::Mssql => "mssql",
        }
    }
}

impl FromStr for Dbms {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oracle" => Ok(Dbms::Oracle),
            "postgres" | "postgresql" => Ok(Dbms::Postgres),
            "mysql" => Ok(Dbms::Mysql),
            "mssql" | "sqlserver" => Ok(Dbms::Mssql),
            other => Err(format!("unknown DBMS '{other}'")),
        }
    }
}

impl fmt::Display for Dbms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
