//! Entity accessor trait
//!
//! The engine is generic over entity types, so each persisted type supplies
//! an accessor: a compile-time description of how to read and write its
//! fields by column name and how to build an instance from a row. Accessor
//! impls are typically generated alongside the entity's [`EntitySchema`];
//! this replaces any runtime field-name reflection with explicit, statically
//! checked code.

use super::schema::EntitySchema;
use super::value::{Row, Value};

/// Per-type field access for a persisted entity
///
/// An entity with `id() == 0` has not been persisted yet; the table mapper
/// assigns the database id on insert.
pub trait EntityAccessor: Default + Clone + Send + Sync + 'static {
    /// The entity's static schema, shared by all instances
    fn schema() -> &'static EntitySchema;

    /// Read the named own-column as a value
    ///
    /// `column` is a snake_case column name from [`EntitySchema::own_columns`].
    /// Reading an unknown column returns [`Value::Null`].
    fn read_field(&self, column: &str) -> Value;

    /// Write the named own-column from a value
    ///
    /// Unknown columns and type mismatches are ignored; the schema and the
    /// accessor are generated from the same source, so a mismatch indicates
    /// a code-generation bug, not a runtime condition.
    fn write_field(&mut self, column: &str, value: Value);

    /// Integer primary key (0 = not yet persisted)
    fn id(&self) -> i64;

    /// Set the integer primary key after insert
    fn set_id(&mut self, id: i64);

    /// Derived table name
    fn table_name() -> String {
        Self::schema().table_name()
    }

    /// Snake_case own-column names, excluding the implicit `id`
    fn own_columns() -> Vec<String> {
        Self::schema().own_columns()
    }

    /// Construct an entity from a row of column values
    fn from_row(row: &Row) -> Self {
        let mut entity = Self::default();
        if let Some(id) = row.get("id").and_then(Value::as_long) {
            entity.set_id(id);
        }
        for column in Self::own_columns() {
            if let Some(value) = row.get(&column) {
                entity.write_field(&column, value.clone());
            }
        }
        entity
    }

    /// Own-column values in schema order, excluding `id`
    fn to_row(&self) -> Vec<(String, Value)> {
        Self::own_columns()
            .into_iter()
            .map(|column| {
                let value = self.read_field(&column);
                (column, value)
            })
            .collect()
    }
}
