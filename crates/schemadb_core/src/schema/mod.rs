//! Schema model.
//!
//! A [`Schema`] is built once from [`TableDecl`]s and never changes. Building
//! it checks every declaration up front so connectors can rely on:
//!
//! - unique table names, and unique row names within a table
//! - every stored row typed as one of the four [`RowType`]s
//! - defaults producing values of their row's type
//! - primary keys and relations referring to declared rows

mod decl;
mod table;

pub use decl::{DefaultValue, PrimaryKeyDecl, RelationDecl, RowDecl, RowOptions, TableDecl};
pub use table::{Relation, RowDef, Schema, Table};

use std::fmt;
use std::str::FromStr;

/// The four primitive row types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowType {
    /// UTF-8 text.
    String,
    /// Double precision number.
    Number,
    /// Boolean.
    Boolean,
    /// 64-bit signed integer.
    BigInt,
}

impl RowType {
    /// Canonical lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::BigInt => "bigint",
        }
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" | "bool" => Ok(Self::Boolean),
            "bigint" => Ok(Self::BigInt),
            _ => Err(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_type_parse() {
        assert_eq!("string".parse::<RowType>(), Ok(RowType::String));
        assert_eq!("BigInt".parse::<RowType>(), Ok(RowType::BigInt));
        assert_eq!("bool".parse::<RowType>(), Ok(RowType::Boolean));
        assert_eq!("date".parse::<RowType>(), Err("date".to_string()));
    }

    #[test]
    fn row_type_display_round_trips() {
        for ty in [RowType::String, RowType::Number, RowType::Boolean, RowType::BigInt] {
            assert_eq!(ty.to_string().parse::<RowType>(), Ok(ty));
        }
    }
}
