//! Core persistence types and traits
//!
//! This module provides the fundamental building blocks for the persistence
//! engine: the column value type, error types, entity schemas and accessors,
//! parameter-binding SQL builders, and the connection provider trait.

pub mod accessor;
pub mod connection;
pub mod error;
pub mod query_builder;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use accessor::EntityAccessor;
pub use connection::ConnectionProvider;
pub use error::{PersistenceError, Result};
pub use query_builder::{
    CreateTableBuilder, DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder,
};
pub use schema::{
    Cardinality, ColumnType, Direction, EntitySchema, FieldDescriptor, RelationType,
    RelationshipInfo,
};
pub use value::{Row, Value};
