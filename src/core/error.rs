//! Error types for the persistence engine
//!
//! Every public operation returns a [`Result`] carrying one typed error.
//! Nothing in this crate panics across its public boundary at runtime; the
//! only intentional panics are construction-time schema mismatches, which
//! indicate a code-generation bug rather than a runtime condition.

/// Result type alias for persistence operations
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error types for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Statement preparation or execution failed; carries the failing
    /// statement and the driver's message
    #[error("SQL error executing `{statement}`: {message}")]
    Sql { statement: String, message: String },

    /// A required single-row lookup found zero rows
    #[error("No row in `{table}` matched key {key}")]
    RowMissing { table: String, key: String },

    /// INSERT affected an unexpected number of rows
    #[error("Insert into `{table}` affected {affected} rows, expected {expected}")]
    InsertFailed {
        table: String,
        expected: usize,
        affected: usize,
    },

    /// UPDATE affected an unexpected number of rows (entity absent or stale)
    #[error("Update of `{table}` affected {affected} rows, expected {expected}")]
    UpdateFailed {
        table: String,
        expected: usize,
        affected: usize,
    },

    /// DELETE affected an unexpected number of rows
    #[error("Delete from `{table}` affected {affected} rows, expected {expected}")]
    DeleteFailed {
        table: String,
        expected: usize,
        affected: usize,
    },

    /// Relationship shape not recognized by the dispatch table
    #[error("No associator for relationship `{field_name}` ({relation_type}, {cardinality})")]
    NotImplemented {
        field_name: String,
        relation_type: String,
        cardinality: String,
    },

    /// Fatal: a linked-list splice failed mid-sequence; the surrounding
    /// transaction must be rolled back to preserve list integrity
    #[error("Association removal failed on `{junction_table}`: {message}")]
    AssociationRemovalFailed {
        junction_table: String,
        message: String,
    },

    /// Snapshot serialization or deserialization failure
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Connection-level failure (store not initialized, open failed)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction control failure
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl PersistenceError {
    /// Create a SQL execution error
    pub fn sql(statement: impl Into<String>, message: impl Into<String>) -> Self {
        PersistenceError::Sql {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Create a missing-row error
    pub fn row_missing(table: impl Into<String>, key: impl std::fmt::Display) -> Self {
        PersistenceError::RowMissing {
            table: table.into(),
            key: key.to_string(),
        }
    }

    /// Create an insert-count mismatch error
    pub fn insert_failed(table: impl Into<String>, expected: usize, affected: usize) -> Self {
        PersistenceError::InsertFailed {
            table: table.into(),
            expected,
            affected,
        }
    }

    /// Create an update-count mismatch error
    pub fn update_failed(table: impl Into<String>, expected: usize, affected: usize) -> Self {
        PersistenceError::UpdateFailed {
            table: table.into(),
            expected,
            affected,
        }
    }

    /// Create a delete-count mismatch error
    pub fn delete_failed(table: impl Into<String>, expected: usize, affected: usize) -> Self {
        PersistenceError::DeleteFailed {
            table: table.into(),
            expected,
            affected,
        }
    }

    /// Create a dispatch-miss error
    pub fn not_implemented(
        field_name: impl Into<String>,
        relation_type: impl Into<String>,
        cardinality: impl Into<String>,
    ) -> Self {
        PersistenceError::NotImplemented {
            field_name: field_name.into(),
            relation_type: relation_type.into(),
            cardinality: cardinality.into(),
        }
    }

    /// Create a fatal splice error
    pub fn association_removal(
        junction_table: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PersistenceError::AssociationRemovalFailed {
            junction_table: junction_table.into(),
            message: message.into(),
        }
    }

    /// Create a snapshot error
    pub fn snapshot<S: Into<String>>(msg: S) -> Self {
        PersistenceError::Snapshot(msg.into())
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        PersistenceError::Connection(msg.into())
    }

    /// Create a transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        PersistenceError::Transaction(msg.into())
    }

    /// Whether the error is fatal for the surrounding transaction
    ///
    /// Callers composing multi-statement writes are expected to roll back on
    /// any error; this flag additionally marks errors after which the store
    /// may hold a half-applied mutation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PersistenceError::AssociationRemovalFailed { .. })
    }
}
