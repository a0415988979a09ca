//! Store backend implementations

pub mod sqlite;

pub use sqlite::SqliteConnectionProvider;
