//! Connection provider trait
//!
//! The provider exclusively owns the physical connection and the schema
//! realization step. Table mappers and associators hold a shared,
//! non-owning handle (`Arc<dyn ConnectionProvider>`) and never manage
//! connection lifecycle themselves.
//!
//! DDL is accumulated, not executed immediately: each table mapper appends
//! its CREATE TABLE statements during construction, and the provider
//! executes them in order when [`ConnectionProvider::init`] realizes the
//! store. All operations are synchronous, blocking calls; the engine
//! assumes a single connection in flight, the single-process desktop
//! application case.

use super::error::Result;
use super::value::{Row, Value};

/// Object-safe store access used by every engine component
pub trait ConnectionProvider: Send + Sync {
    /// Accumulate a DDL statement to be executed by [`init`](Self::init)
    ///
    /// `kind` labels the statement origin (entity table, junction table)
    /// for diagnostics; execution order is the accumulation order.
    fn append_creation_sql(&self, kind: &str, sql: &str);

    /// Create the physical store and execute the accumulated DDL
    fn init(&self) -> Result<()>;

    /// Whether [`init`](Self::init) has completed successfully
    fn is_initialized(&self) -> bool;

    /// Execute a statement with bound parameters, returning the affected
    /// row count
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Execute a query with bound parameters, returning all result rows
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Primary key assigned by the most recent INSERT
    fn last_insert_id(&self) -> Result<i64>;

    /// Begin a transaction
    fn begin_transaction(&self) -> Result<()>;

    /// Commit the current transaction
    fn commit(&self) -> Result<()>;

    /// Roll back the current transaction
    fn rollback(&self) -> Result<()>;

    /// Check if currently in a transaction
    fn in_transaction(&self) -> bool;
}
