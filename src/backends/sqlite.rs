//! SQLite connection provider
//!
//! Owns the one physical connection to the embedded store. Construction is
//! cheap and does not touch the filesystem; table mappers append their DDL
//! first, then [`SqliteConnectionProvider::init`] opens the store, enables
//! foreign key enforcement, and executes the accumulated statements in
//! order.

use crate::core::connection::ConnectionProvider;
use crate::core::error::{PersistenceError, Result};
use crate::core::value::{Row, Value};
use log::{debug, trace};
use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection};

/// SQLite-backed connection provider
pub struct SqliteConnectionProvider {
    location: String,
    connection: Mutex<Option<Connection>>,
    creation_sql: Mutex<Vec<(String, String)>>,
    in_transaction: Mutex<bool>,
}

impl SqliteConnectionProvider {
    /// Create a provider for a file-backed store at `location`
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            connection: Mutex::new(None),
            creation_sql: Mutex::new(Vec::new()),
            in_transaction: Mutex::new(false),
        }
    }

    /// Create a provider for an in-memory store
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    /// Convert a rusqlite row to the engine's row type
    fn convert_row(row: &rusqlite::Row) -> rusqlite::Result<Row> {
        let mut out = Row::new();
        let column_count = row.as_ref().column_count();

        for i in 0..column_count {
            let column_name = row.as_ref().column_name(i)?.to_string();
            let value = match row.get_ref(i)? {
                rusqlite::types::ValueRef::Null => Value::Null,
                rusqlite::types::ValueRef::Integer(v) => Value::Long(v),
                rusqlite::types::ValueRef::Real(v) => Value::Double(v),
                rusqlite::types::ValueRef::Text(v) => {
                    Value::Text(String::from_utf8_lossy(v).to_string())
                }
                rusqlite::types::ValueRef::Blob(v) => Value::Blob(v.to_vec()),
            };
            out.insert(column_name, value);
        }

        Ok(out)
    }

    /// Convert an engine value to a bindable rusqlite value
    fn convert_param(value: &Value) -> rusqlite::types::Value {
        match value {
            Value::Null => rusqlite::types::Value::Null,
            Value::Bool(v) => rusqlite::types::Value::Integer(*v as i64),
            Value::Long(v) => rusqlite::types::Value::Integer(*v),
            Value::Double(v) => rusqlite::types::Value::Real(*v),
            Value::Text(v) => rusqlite::types::Value::Text(v.clone()),
            Value::Blob(v) => rusqlite::types::Value::Blob(v.clone()),
        }
    }

    fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let guard = self.connection.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| PersistenceError::connection("store not initialized"))?;
        f(conn)
    }
}

impl ConnectionProvider for SqliteConnectionProvider {
    fn append_creation_sql(&self, kind: &str, sql: &str) {
        trace!("accumulating {} DDL: {}", kind, sql);
        self.creation_sql
            .lock()
            .push((kind.to_string(), sql.to_string()));
    }

    fn init(&self) -> Result<()> {
        let conn = Connection::open(&self.location)
            .map_err(|e| PersistenceError::connection(e.to_string()))?;

        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| PersistenceError::sql("PRAGMA foreign_keys = ON", e.to_string()))?;

        {
            let statements = self.creation_sql.lock();
            for (kind, sql) in statements.iter() {
                debug!("creating {}: {}", kind, sql);
                conn.execute(sql, [])
                    .map_err(|e| PersistenceError::sql(sql.clone(), e.to_string()))?;
            }
        }

        *self.in_transaction.lock() = false;
        *self.connection.lock() = Some(conn);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.connection.lock().is_some()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        self.with_connection(|conn| {
            let bind: Vec<rusqlite::types::Value> =
                params.iter().map(Self::convert_param).collect();
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| PersistenceError::sql(sql, e.to_string()))?;
            stmt.execute(params_from_iter(bind))
                .map_err(|e| PersistenceError::sql(sql, e.to_string()))
        })
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.with_connection(|conn| {
            let bind: Vec<rusqlite::types::Value> =
                params.iter().map(Self::convert_param).collect();
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| PersistenceError::sql(sql, e.to_string()))?;
            let rows = stmt
                .query_map(params_from_iter(bind), Self::convert_row)
                .map_err(|e| PersistenceError::sql(sql, e.to_string()))?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row.map_err(|e| PersistenceError::sql(sql, e.to_string()))?);
            }
            Ok(results)
        })
    }

    fn last_insert_id(&self) -> Result<i64> {
        self.with_connection(|conn| Ok(conn.last_insert_rowid()))
    }

    fn begin_transaction(&self) -> Result<()> {
        let mut in_transaction = self.in_transaction.lock();
        if *in_transaction {
            return Err(PersistenceError::transaction("already in a transaction"));
        }
        self.with_connection(|conn| {
            conn.execute("BEGIN TRANSACTION", [])
                .map_err(|e| PersistenceError::sql("BEGIN TRANSACTION", e.to_string()))?;
            Ok(())
        })?;
        *in_transaction = true;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut in_transaction = self.in_transaction.lock();
        if !*in_transaction {
            return Err(PersistenceError::transaction("not in a transaction"));
        }
        self.with_connection(|conn| {
            conn.execute("COMMIT", [])
                .map_err(|e| PersistenceError::sql("COMMIT", e.to_string()))?;
            Ok(())
        })?;
        *in_transaction = false;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut in_transaction = self.in_transaction.lock();
        if !*in_transaction {
            return Err(PersistenceError::transaction("not in a transaction"));
        }
        self.with_connection(|conn| {
            conn.execute("ROLLBACK", [])
                .map_err(|e| PersistenceError::sql("ROLLBACK", e.to_string()))?;
            Ok(())
        })?;
        *in_transaction = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        *self.in_transaction.lock()
    }
}
