//! Validated tables and schemas.

use super::decl::{DefaultValue, RowDecl, TableDecl};
use super::RowType;
use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, HashMap};

/// A validated stored row.
#[derive(Debug, Clone)]
pub struct RowDef {
    /// Row name.
    pub name: String,
    /// Value type.
    pub row_type: RowType,
    /// The row may be absent.
    pub optional: bool,
    /// Values must be pairwise distinct.
    pub unique: bool,
    /// Value used when a document omits the row.
    pub default: Option<DefaultValue>,
}

impl RowDef {
    /// Returns true if a document may omit the row after defaults apply.
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// A validated relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Name under which related documents are attached.
    pub name: String,
    /// Stored row of the declaring table.
    pub local_field: String,
    /// Table holding the related documents.
    pub foreign_table: String,
    /// Stored row of the foreign table.
    pub foreign_field: String,
}

/// A validated table definition.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    primary_key: Vec<String>,
    rows: Vec<RowDef>,
    rows_by_name: HashMap<String, usize>,
    relations: BTreeMap<String, Relation>,
}

impl Table {
    fn from_decl(decl: TableDecl) -> CoreResult<Self> {
        let table_name = decl.name;
        let mut rows = Vec::new();
        let mut rows_by_name = HashMap::new();
        let mut relations = BTreeMap::new();
        let mut seen = std::collections::HashSet::new();

        for RowDecl {
            name,
            type_name,
            options,
            relation,
        } in decl.rows
        {
            if !seen.insert(name.clone()) {
                return Err(CoreError::DuplicateRow {
                    table: table_name,
                    row: name,
                });
            }

            if let Some(rel) = relation {
                relations.insert(
                    name.clone(),
                    Relation {
                        name,
                        local_field: rel.local_field,
                        foreign_table: rel.foreign_table,
                        foreign_field: rel.foreign_field,
                    },
                );
                continue;
            }

            let row_type: RowType = type_name.parse().map_err(|type_name| CoreError::InvalidType {
                table: table_name.clone(),
                row: name.clone(),
                type_name,
            })?;

            match &options.default {
                Some(DefaultValue::Literal(value)) if !value.is_type(row_type) => {
                    return Err(CoreError::DefaultTypeMismatch {
                        table: table_name,
                        row: name,
                        expected: row_type.to_string(),
                    });
                }
                Some(producer @ DefaultValue::Producer(_)) if !producer.produce().is_type(row_type) => {
                    return Err(CoreError::DefaultProducerMismatch {
                        table: table_name,
                        row: name,
                        expected: row_type.to_string(),
                    });
                }
                _ => {}
            }

            rows_by_name.insert(name.clone(), rows.len());
            rows.push(RowDef {
                name,
                row_type,
                optional: options.optional,
                unique: options.unique,
                default: options.default,
            });
        }

        let primary_key = decl.primary_key.rows();
        for key in &primary_key {
            if !rows_by_name.contains_key(key) {
                return Err(CoreError::InvalidPrimaryKey {
                    table: table_name,
                    row: key.clone(),
                });
            }
        }
        if primary_key.is_empty() {
            return Err(CoreError::InvalidPrimaryKey {
                table: table_name,
                row: String::new(),
            });
        }

        for relation in relations.values() {
            if !rows_by_name.contains_key(&relation.local_field) {
                return Err(CoreError::InvalidRelation {
                    table: table_name,
                    relation: relation.name.clone(),
                    message: format!("unknown local field {}", relation.local_field),
                });
            }
        }

        Ok(Self {
            name: table_name,
            primary_key,
            rows,
            rows_by_name,
            relations,
        })
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary key row names in declaration order.
    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Stored rows in declaration order.
    #[must_use]
    pub fn rows(&self) -> &[RowDef] {
        &self.rows
    }

    /// Looks up a stored row.
    #[must_use]
    pub fn row(&self, name: &str) -> Option<&RowDef> {
        self.rows_by_name.get(name).map(|&idx| &self.rows[idx])
    }

    /// Looks up a stored row, failing with an unknown row error.
    pub fn require_row(&self, name: &str) -> CoreResult<&RowDef> {
        self.row(name)
            .ok_or_else(|| CoreError::unknown_row(&self.name, name))
    }

    /// Relations keyed by relation name.
    #[must_use]
    pub fn relations(&self) -> &BTreeMap<String, Relation> {
        &self.relations
    }

    /// Looks up a relation, failing with an unknown relation error.
    pub fn relation(&self, name: &str) -> CoreResult<&Relation> {
        self.relations
            .get(name)
            .ok_or_else(|| CoreError::unknown_relation(&self.name, name))
    }

    /// Rows declared `unique`.
    pub fn unique_rows(&self) -> impl Iterator<Item = &RowDef> {
        self.rows.iter().filter(|row| row.unique)
    }
}

/// A validated, immutable schema.
#[derive(Debug, Clone)]
pub struct Schema {
    tables: Vec<Table>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema from declarations.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid declaration; see [`CoreError::is_schema_error`].
    pub fn new(declarations: Vec<TableDecl>) -> CoreResult<Self> {
        let mut tables = Vec::with_capacity(declarations.len());
        let mut by_name = HashMap::new();

        for decl in declarations {
            if by_name.contains_key(&decl.name) {
                return Err(CoreError::DuplicateTable { name: decl.name });
            }
            let table = Table::from_decl(decl)?;
            by_name.insert(table.name.clone(), tables.len());
            tables.push(table);
        }

        let schema = Self { tables, by_name };
        schema.check_relation_targets()?;
        Ok(schema)
    }

    /// Parses a JSON array of table declarations and builds a schema.
    ///
    /// ```rust
    /// use schemadb_core::Schema;
    ///
    /// let schema = Schema::from_json(r#"[
    ///     { "name": "User", "primaryKey": "id",
    ///       "rows": [["id", "string"], ["email", "string", { "unique": true }]] }
    /// ]"#).unwrap();
    /// assert!(schema.table("User").is_ok());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSchema`] for malformed JSON, otherwise the
    /// same errors as [`Schema::new`].
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let declarations: Vec<TableDecl> =
            serde_json::from_str(json).map_err(|e| CoreError::invalid_schema(e.to_string()))?;
        Self::new(declarations)
    }

    // Foreign tables may be declared after the table pointing at them.
    fn check_relation_targets(&self) -> CoreResult<()> {
        for table in &self.tables {
            for relation in table.relations.values() {
                let invalid = |message: String| CoreError::InvalidRelation {
                    table: table.name.clone(),
                    relation: relation.name.clone(),
                    message,
                };
                let foreign = self
                    .by_name
                    .get(&relation.foreign_table)
                    .map(|&idx| &self.tables[idx])
                    .ok_or_else(|| invalid(format!("unknown table {}", relation.foreign_table)))?;
                let foreign_row = foreign.row(&relation.foreign_field).ok_or_else(|| {
                    invalid(format!(
                        "unknown foreign field {}.{}",
                        relation.foreign_table, relation.foreign_field
                    ))
                })?;
                let local_row = table.require_row(&relation.local_field)?;
                if local_row.row_type != foreign_row.row_type {
                    return Err(invalid(format!(
                        "field type mismatch: {} is {} but {}.{} is {}",
                        relation.local_field,
                        local_row.row_type,
                        relation.foreign_table,
                        relation.foreign_field,
                        foreign_row.row_type
                    )));
                }
            }
        }
        Ok(())
    }

    /// Looks up a table.
    pub fn table(&self, name: &str) -> CoreResult<&Table> {
        self.by_name
            .get(name)
            .map(|&idx| &self.tables[idx])
            .ok_or_else(|| CoreError::unknown_table(name))
    }

    /// Tables in declaration order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}
