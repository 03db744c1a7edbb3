//! Table schemas
//!
//! Each catalog manager declares its tables as an ordered list of
//! column-name → type-declaration pairs. Tables are only ever created with
//! `IF NOT EXISTS`; there is no alteration or down-migration path.
//!
//! Identifiers end up interpolated into SQL text, so every table and column
//! name is checked against a strict allow-list before any SQL is built.

use crate::error::DataError;

/// One column of a table schema
#[derive(Debug, Clone)]
pub struct SchemaColumn {
    pub name: String,
    /// SQL type declaration, e.g. `"INTEGER PRIMARY KEY AUTOINCREMENT"`
    pub decl: String,
}

/// An ordered table schema
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    columns: Vec<SchemaColumn>,
}

impl TableSchema {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
        }
    }

    /// Append a column (builder style)
    pub fn column(mut self, name: &str, decl: &str) -> Self {
        self.columns.push(SchemaColumn {
            name: name.to_string(),
            decl: decl.to_string(),
        });
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    /// Check the table name and all column names against the identifier
    /// allow-list, and reject duplicate columns
    pub fn validate(&self) -> Result<(), DataError> {
        let schema_err = |detail: String| DataError::Schema {
            table: self.table.clone(),
            detail,
        };

        if !is_valid_identifier(&self.table) {
            return Err(schema_err(format!("invalid table name `{}`", self.table)));
        }
        if self.columns.is_empty() {
            return Err(schema_err("schema has no columns".to_string()));
        }
        for (i, col) in self.columns.iter().enumerate() {
            if !is_valid_identifier(&col.name) {
                return Err(schema_err(format!("invalid column name `{}`", col.name)));
            }
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(schema_err(format!("duplicate column `{}`", col.name)));
            }
        }
        Ok(())
    }

    /// Render the `CREATE TABLE IF NOT EXISTS` statement
    pub fn create_sql(&self) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.decl))
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.table, cols
        )
    }
}

/// Allow-list for SQL identifiers: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a single identifier, producing a schema error for `table`
pub fn ensure_identifier(table: &str, name: &str) -> Result<(), DataError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(DataError::Schema {
            table: table.to_string(),
            detail: format!("invalid identifier `{name}`"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_allow_list() {
        assert!(is_valid_identifier("item_templates"));
        assert!(is_valid_identifier("_hidden"));
        assert!(is_valid_identifier("t2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("drop table;--"));
        assert!(!is_valid_identifier("name with space"));
    }

    #[test]
    fn create_sql_lists_columns_in_declaration_order() {
        let schema = TableSchema::new("items")
            .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
            .column("name", "TEXT NOT NULL")
            .column("value", "REAL DEFAULT 0");
        let sql = schema.create_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS items"));
        let id_pos = sql.find("id INTEGER").unwrap();
        let name_pos = sql.find("name TEXT").unwrap();
        let value_pos = sql.find("value REAL").unwrap();
        assert!(id_pos < name_pos && name_pos < value_pos);
    }

    #[test]
    fn validate_rejects_bad_schemas() {
        assert!(TableSchema::new("ok; drop").column("id", "INTEGER").validate().is_err());
        assert!(TableSchema::new("ok").validate().is_err());
        assert!(TableSchema::new("ok").column("bad name", "TEXT").validate().is_err());
        assert!(TableSchema::new("ok")
            .column("id", "INTEGER")
            .column("id", "TEXT")
            .validate()
            .is_err());
        assert!(TableSchema::new("ok").column("id", "INTEGER").validate().is_ok());
    }
}
