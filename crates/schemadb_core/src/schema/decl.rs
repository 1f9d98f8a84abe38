//! Table and row declarations, as written by users.
//!
//! Declarations are unvalidated input. [`crate::Schema::new`] turns them into
//! [`crate::Table`]s. Rows can be written in Rust with the builders below or
//! deserialized from JSON in either tuple form
//! (`["email", "string", {"unique": true}]`) or object form
//! (`{"name": "email", "type": "string", "unique": true}`).

use super::RowType;
use crate::value::Value;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

/// A row default: a literal or a zero-argument producer.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value.
    Literal(Value),
    /// Called once per document that omits the row.
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces the default value.
    #[must_use]
    pub fn produce(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Value::from_json(&json)
            .map(Self::Literal)
            .ok_or_else(|| D::Error::custom("default must be a string, number, boolean or null"))
    }
}

/// Options shared by both row declaration forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RowOptions {
    /// The row may be absent.
    pub optional: bool,
    /// Live values must be pairwise distinct.
    pub unique: bool,
    /// Value used when a document omits the row.
    pub default: Option<DefaultValue>,
}

/// A foreign-key style link to another table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationDecl {
    /// Row of the declaring table holding the key.
    pub local_field: String,
    /// Table holding the related documents.
    pub foreign_table: String,
    /// Row of the foreign table matched against `local_field`.
    pub foreign_field: String,
}

impl RelationDecl {
    /// Creates a relation declaration.
    pub fn new(
        local_field: impl Into<String>,
        foreign_table: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            local_field: local_field.into(),
            foreign_table: foreign_table.into(),
            foreign_field: foreign_field.into(),
        }
    }
}

/// One row declaration, normalized from either input form.
#[derive(Debug, Clone)]
pub struct RowDecl {
    /// Row name.
    pub name: String,
    /// Declared type name; checked when the schema is built.
    pub type_name: String,
    /// Row options.
    pub options: RowOptions,
    /// Set for relation rows, which are virtual and hold no stored value.
    pub relation: Option<RelationDecl>,
}

impl RowDecl {
    /// Declares a stored row.
    pub fn new(name: impl Into<String>, row_type: RowType) -> Self {
        Self::with_type_name(name, row_type.as_str())
    }

    /// Declares a stored row from a type name, as found in external input.
    pub fn with_type_name(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            options: RowOptions::default(),
            relation: None,
        }
    }

    /// Declares a relation row.
    pub fn relation(name: impl Into<String>, relation: RelationDecl) -> Self {
        Self {
            name: name.into(),
            type_name: String::new(),
            options: RowOptions::default(),
            relation: Some(relation),
        }
    }

    /// Marks the row optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.options.optional = true;
        self
    }

    /// Marks the row unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    /// Sets a literal default.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.options.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Sets a producer default.
    #[must_use]
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.options.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }
}

impl<'de> Deserialize<'de> for RowDecl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ObjectForm {
            name: String,
            #[serde(rename = "type", default)]
            type_name: Option<String>,
            #[serde(default)]
            optional: bool,
            #[serde(default)]
            unique: bool,
            #[serde(default)]
            default: Option<DefaultValue>,
            #[serde(default)]
            relation: Option<RelationDecl>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRow {
            Full(String, String, RowOptions),
            Short(String, String),
            Object(ObjectForm),
        }

        Ok(match RawRow::deserialize(deserializer)? {
            RawRow::Full(name, type_name, options) => Self {
                name,
                type_name,
                options,
                relation: None,
            },
            RawRow::Short(name, type_name) => Self::with_type_name(name, type_name),
            RawRow::Object(obj) => Self {
                name: obj.name,
                type_name: obj.type_name.unwrap_or_default(),
                options: RowOptions {
                    optional: obj.optional,
                    unique: obj.unique,
                    default: obj.default,
                },
                relation: obj.relation,
            },
        })
    }
}

/// A primary key: one row name or several.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKeyDecl {
    /// Single-row key.
    Single(String),
    /// Compound key.
    Compound(Vec<String>),
}

impl PrimaryKeyDecl {
    /// Returns the key's row names in order.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        match self {
            Self::Single(row) => vec![row.clone()],
            Self::Compound(rows) => rows.clone(),
        }
    }
}

impl From<&str> for PrimaryKeyDecl {
    fn from(row: &str) -> Self {
        Self::Single(row.to_string())
    }
}

impl From<String> for PrimaryKeyDecl {
    fn from(row: String) -> Self {
        Self::Single(row)
    }
}

impl From<Vec<&str>> for PrimaryKeyDecl {
    fn from(rows: Vec<&str>) -> Self {
        Self::Compound(rows.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for PrimaryKeyDecl {
    fn from(rows: Vec<String>) -> Self {
        Self::Compound(rows)
    }
}

/// A table declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableDecl {
    /// Table name.
    pub name: String,
    /// Primary key row(s).
    pub primary_key: PrimaryKeyDecl,
    /// Row declarations in order.
    pub rows: Vec<RowDecl>,
}

impl TableDecl {
    /// Starts a table declaration.
    pub fn new(name: impl Into<String>, primary_key: impl Into<PrimaryKeyDecl>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    #[must_use]
    pub fn row(mut self, row: RowDecl) -> Self {
        self.rows.push(row);
        self
    }
}
