//! Parameter-binding SQL builders
//!
//! Fluent builders for the statement shapes the engine emits. Every data
//! value is carried as a bound parameter (`?` placeholders), including id
//! lists for `IN (...)` predicates — nothing user-supplied is ever
//! interpolated into the SQL text.

use super::schema::ColumnType;
use super::value::Value;

/// WHERE clause condition
#[derive(Debug, Clone)]
enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
}

impl Condition {
    fn as_sql(&self) -> String {
        match self {
            Condition::Eq(column, _) => format!("{} = ?", column),
            // An empty IN list matches nothing; emit a constant-false
            // predicate rather than the invalid `IN ()`.
            Condition::In(_, values) if values.is_empty() => "1 = 0".to_string(),
            Condition::In(column, values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({})", column, placeholders)
            }
            Condition::IsNull(column) => format!("{} IS NULL", column),
        }
    }

    fn push_params(&self, params: &mut Vec<Value>) {
        match self {
            Condition::Eq(_, value) => params.push(value.clone()),
            Condition::In(_, values) => params.extend(values.iter().cloned()),
            Condition::IsNull(_) => {}
        }
    }
}

fn where_clause(conditions: &[Condition]) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = conditions.iter().map(Condition::as_sql).collect();
    format!(" WHERE {}", rendered.join(" AND "))
}

/// SELECT query builder
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    where_conditions: Vec<Condition>,
}

impl SelectBuilder {
    /// Create a new SELECT query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec!["*".to_string()],
            where_conditions: Vec::new(),
        }
    }

    /// Select specific columns
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a WHERE column = value condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_conditions
            .push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    /// Add a WHERE column IN (...) condition with bound values
    #[must_use]
    pub fn where_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.where_conditions.push(Condition::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Add a WHERE column IS NULL condition
    #[must_use]
    pub fn where_null(mut self, column: &str) -> Self {
        self.where_conditions
            .push(Condition::IsNull(column.to_string()));
        self
    }

    /// Build the SQL query string
    pub fn build(&self) -> String {
        format!(
            "SELECT {} FROM {}{}",
            self.columns.join(", "),
            self.table,
            where_clause(&self.where_conditions)
        )
    }

    /// Get the parameter values for the built query
    pub fn params(&self) -> Vec<Value> {
        let mut params = Vec::new();
        for condition in &self.where_conditions {
            condition.push_params(&mut params);
        }
        params
    }
}

/// INSERT query builder
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InsertBuilder {
    /// Create a new INSERT query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Add a column-value pair
    #[must_use]
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    /// Build the SQL query string
    pub fn build(&self) -> String {
        let placeholders = vec!["?"; self.values.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            placeholders
        )
    }

    /// Get the parameter values
    pub fn params(&self) -> Vec<Value> {
        self.values.clone()
    }
}

/// UPDATE query builder
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    set_columns: Vec<String>,
    set_values: Vec<Value>,
    where_conditions: Vec<Condition>,
}

impl UpdateBuilder {
    /// Create a new UPDATE query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set_columns: Vec::new(),
            set_values: Vec::new(),
            where_conditions: Vec::new(),
        }
    }

    /// Set a column value
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set_columns.push(column.to_string());
        self.set_values.push(value.into());
        self
    }

    /// Add a WHERE column = value condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_conditions
            .push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    /// Add a WHERE column IN (...) condition with bound values
    #[must_use]
    pub fn where_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.where_conditions.push(Condition::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Build the SQL query string
    pub fn build(&self) -> String {
        let set_clauses: Vec<String> = self
            .set_columns
            .iter()
            .map(|col| format!("{} = ?", col))
            .collect();
        format!(
            "UPDATE {} SET {}{}",
            self.table,
            set_clauses.join(", "),
            where_clause(&self.where_conditions)
        )
    }

    /// Get the parameter values (SET values followed by WHERE values)
    pub fn params(&self) -> Vec<Value> {
        let mut params = self.set_values.clone();
        for condition in &self.where_conditions {
            condition.push_params(&mut params);
        }
        params
    }
}

/// DELETE query builder
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    where_conditions: Vec<Condition>,
}

impl DeleteBuilder {
    /// Create a new DELETE query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            where_conditions: Vec::new(),
        }
    }

    /// Add a WHERE column = value condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_conditions
            .push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    /// Add a WHERE column IN (...) condition with bound values
    #[must_use]
    pub fn where_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.where_conditions.push(Condition::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Build the SQL query string
    pub fn build(&self) -> String {
        format!(
            "DELETE FROM {}{}",
            self.table,
            where_clause(&self.where_conditions)
        )
    }

    /// Get the parameter values
    pub fn params(&self) -> Vec<Value> {
        let mut params = Vec::new();
        for condition in &self.where_conditions {
            condition.push_params(&mut params);
        }
        params
    }
}

/// CREATE TABLE statement builder
///
/// Used by the table mapper and the associators to accumulate DDL; the
/// statements are handed to the connection provider rather than executed
/// directly.
#[derive(Debug, Clone)]
pub struct CreateTableBuilder {
    table: String,
    columns: Vec<String>,
    constraints: Vec<String>,
}

impl CreateTableBuilder {
    /// Create a new CREATE TABLE builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add the autoincrement integer primary key column
    #[must_use]
    pub fn id_primary_key(mut self) -> Self {
        self.columns
            .push("id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL UNIQUE".to_string());
        self
    }

    /// Add a typed, nullable column
    #[must_use]
    pub fn column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.columns
            .push(format!("{} {}", name, column_type.as_sql()));
        self
    }

    /// Add a typed NOT NULL column
    #[must_use]
    pub fn not_null_column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.columns
            .push(format!("{} {} NOT NULL", name, column_type.as_sql()));
        self
    }

    /// Add a table-level UNIQUE constraint over one or more columns
    #[must_use]
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.constraints
            .push(format!("UNIQUE ({})", columns.join(", ")));
        self
    }

    /// Add a foreign key constraint, optionally cascading deletes
    #[must_use]
    pub fn foreign_key(
        mut self,
        column: &str,
        ref_table: &str,
        ref_column: &str,
        cascade: bool,
    ) -> Self {
        let mut clause = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            column, ref_table, ref_column
        );
        if cascade {
            clause.push_str(" ON DELETE CASCADE");
        }
        self.constraints.push(clause);
        self
    }

    /// Build the SQL statement
    pub fn build(&self) -> String {
        let mut parts = self.columns.clone();
        parts.extend(self.constraints.iter().cloned());
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            parts.join(", ")
        )
    }
}
