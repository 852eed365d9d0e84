use serde::{Deserialize, Serialize};

use super::qualified;

/// A `(schema, table, column)` triple, used for foreign-key targets and relation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn table_identity(&self) -> String {
        qualified(&self.schema, &self.table)
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.column)
    }
}

/// Table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared SQL type, normalized to its canonical spelling
    pub data_type: String,
    pub nullable: bool,
    /// Default expression, without trailing casts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub unique: bool,
    /// Backed by a sequence or an identity
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub primary_key: bool,
    /// Target of the foreign key declared on this column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ColumnRef>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            unique: false,
            auto_increment: false,
            primary_key: false,
            foreign_key: None,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn references(mut self, target: ColumnRef) -> Self {
        self.foreign_key = Some(target);
        self
    }
}

/// Table with its columns and row-level security flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    /// Primary key column names, in key order
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub rls_enabled: bool,
    #[serde(default)]
    pub rls_forced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            rls_enabled: false,
            rls_forced: false,
            comment: None,
        }
    }

    /// Append a column, registering it as a primary key when flagged.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.push_column(column);
        self
    }

    #[must_use]
    pub fn rls(mut self, enabled: bool, forced: bool) -> Self {
        self.rls_enabled = enabled;
        self.rls_forced = forced;
        self
    }

    pub fn push_column(&mut self, column: Column) {
        if column.primary_key && !self.primary_keys.contains(&column.name) {
            self.primary_keys.push(column.name.clone());
        }
        self.columns.push(column);
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn identity(&self) -> String {
        qualified(&self.schema, &self.name)
    }
}

/// A column together with the table that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub schema: String,
    pub table: String,
    pub column: Column,
}

impl TableColumn {
    pub fn identity(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.column.name)
    }
}
