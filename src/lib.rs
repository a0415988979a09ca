//! # Rust Persistence System
//!
//! A schema-driven relational persistence engine for layered desktop
//! applications. Entity types declare a static schema; the engine maps each
//! type onto an embedded SQLite store with a generic table mapper, keeps
//! relationships in junction tables owned by typed associators, and
//! reconciles ordered collections as doubly-linked lists so that edits
//! touch the minimum number of rows.
//!
//! ## Features
//!
//! - **Type Safety**: Strongly-typed value system and per-entity accessors
//! - **Thread Safety**: Shared repositories using `parking_lot` locks
//! - **Relationships**: one-to-one, one-to-many (ordered and unordered),
//!   and many-to-many associators over junction tables
//! - **Ordered Collections**: linked-list storage with minimal-mutation
//!   reconciliation and neighbor-splicing removal
//! - **Undo Support**: detached row snapshots with JSON serialization
//! - **Transaction Management**: explicit begin/commit/rollback brackets
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_persistence_system::prelude::*;
//! use once_cell::sync::Lazy;
//! use std::sync::Arc;
//!
//! static NOTE_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
//!     EntitySchema::new("Note")
//!         .field("content", ColumnType::Text)
//!         .field("isActive", ColumnType::Boolean)
//! });
//!
//! #[derive(Default, Clone)]
//! struct Note {
//!     id: i64,
//!     content: String,
//!     is_active: bool,
//! }
//!
//! impl EntityAccessor for Note {
//!     fn schema() -> &'static EntitySchema {
//!         &NOTE_SCHEMA
//!     }
//!
//!     fn read_field(&self, column: &str) -> Value {
//!         match column {
//!             "content" => Value::from(self.content.clone()),
//!             "is_active" => Value::from(self.is_active),
//!             _ => Value::Null,
//!         }
//!     }
//!
//!     fn write_field(&mut self, column: &str, value: Value) {
//!         match column {
//!             "content" => {
//!                 if let Some(text) = value.as_text() {
//!                     self.content = text.to_string();
//!                 }
//!             }
//!             "is_active" => {
//!                 if let Some(flag) = value.as_bool() {
//!                     self.is_active = flag;
//!                 }
//!             }
//!             _ => {}
//!         }
//!     }
//!
//!     fn id(&self) -> i64 {
//!         self.id
//!     }
//!
//!     fn set_id(&mut self, id: i64) {
//!         self.id = id;
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let provider: Arc<dyn ConnectionProvider> =
//!         Arc::new(SqliteConnectionProvider::in_memory());
//!
//!     // Repositories register their DDL first; init realizes the store.
//!     let notes: Repository<Note> = Repository::new(provider.clone())?;
//!     provider.init()?;
//!
//!     let mut note = Note {
//!         id: 0,
//!         content: "hello".to_string(),
//!         is_active: true,
//!     };
//!     notes.add(&mut note)?;
//!
//!     let loaded = notes.get(note.id)?;
//!     assert_eq!(loaded.content, "hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! rust_persistence_system/
//! ├── src/
//! │   ├── core/            # Value type, errors, schemas, SQL builders
//! │   ├── backends/        # SQLite connection provider
//! │   ├── mapper/          # Generic table mapper and snapshots
//! │   ├── associators/     # Relationship associators
//! │   ├── repository.rs    # Thread-safe facade
//! │   └── logging.rs       # Logging bootstrap
//! ├── tests/               # Integration and property tests
//! ├── benches/             # Criterion benchmarks
//! └── Cargo.toml
//! ```

/// Core persistence types and traits
pub mod core;

/// Store backend implementations
pub mod backends;

/// Entity-to-table mapping layer
pub mod mapper;

/// Relationship associators
pub mod associators;

/// Thread-safe repository facade
pub mod repository;

/// Logging bootstrap
pub mod logging;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backends::SqliteConnectionProvider;
    pub use crate::core::{
        Cardinality, ColumnType, ConnectionProvider, Direction, EntityAccessor, EntitySchema,
        FieldDescriptor, PersistenceError, RelationType, RelationshipInfo, Result, Row, Value,
    };
    pub use crate::mapper::{DatabaseTableGroup, SaveData};
    pub use crate::repository::Repository;
}

// Re-export at root level for convenience
pub use crate::backends::SqliteConnectionProvider;
pub use crate::core::{
    ConnectionProvider, EntityAccessor, EntitySchema, PersistenceError, Result, Row, Value,
};
pub use crate::mapper::{DatabaseTableGroup, SaveData};
pub use crate::repository::Repository;
