//! `SQLite` storage layer for Strata.
//!
//! `SQLite` is the source of truth for the hierarchy and its leaf data. The
//! hierarchy traversals in `crate::hierarchy` run as recursive CTEs against the
//! tables defined here.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `helpers` - Row conversion and parsing utilities
//! - `workstreams` - Workstream node CRUD
//! - `grants` - Permission grant CRUD
//! - `leaf` - Release and task CRUD
//! - `principals` - Principal directory
//!
//! ## Connections
//!
//! The database runs in WAL mode. All writes go through one writer connection
//! guarded by a `Mutex`, each inside an `IMMEDIATE` transaction. Reads borrow a
//! connection from a small pool and run inside their own read transaction, so
//! every read operation sees one consistent snapshot and readers never wait on
//! each other or on the writer.

mod helpers;
mod schema;

pub(crate) mod grants;
pub(crate) mod leaf;
pub(crate) mod principals;
pub(crate) mod workstreams;

pub(crate) use helpers::{
    row_to_grant, row_to_workstream, GRANT_COLUMNS, GRANT_COLUMN_COUNT, WORKSTREAM_COLUMNS,
    WORKSTREAM_COLUMN_COUNT,
};
use schema::SCHEMA;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};
use tracing::debug;

use crate::error::{Error, Result};

/// Idle reader connections kept for reuse.
const MAX_IDLE_READERS: usize = 8;

/// `SQLite` database wrapper with a single writer and pooled readers.
pub struct Store {
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
    path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Open or create the database and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for in-memory or URI databases, which pooled
    /// readers cannot share, and an error if the parent directory cannot be
    /// created or the database cannot be opened or migrated.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let path = &resolve_path(path)?;

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // Enable WAL mode and foreign keys
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "Opened database");
        conn.pragma_update(None, "foreign_keys", "ON")?;

        // Apply schema
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers: Mutex::new(Vec::new()),
            path: path.to_path_buf(),
            busy_timeout,
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_reader(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "query_only", "ON")?;
        Ok(conn)
    }

    fn idle_readers(&self) -> Result<MutexGuard<'_, Vec<Connection>>> {
        self.readers.lock().map_err(|e| {
            Error::Internal(format!("reader pool mutex poisoned: {e}"))
        })
    }

    /// Run `f` inside a read transaction on a pooled connection.
    ///
    /// All statements issued by `f` observe the same snapshot.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a database error if the connection or
    /// transaction cannot be established.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let pooled = self.idle_readers()?.pop();
        let mut conn = match pooled {
            Some(conn) => conn,
            None => self.open_reader()?,
        };

        let result = (|| {
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })();

        let mut idle = self.idle_readers()?;
        if idle.len() < MAX_IDLE_READERS {
            idle.push(conn);
        }

        result
    }

    /// Run `f` inside an `IMMEDIATE` transaction on the writer connection.
    ///
    /// The writer lock is held from before the transaction begins until after
    /// `on_commit` has run, so checks made by `f` cannot be invalidated by a
    /// concurrent writer and post-commit bookkeeping (cache invalidation) is
    /// finished before the next writer starts. If `f` fails the transaction is
    /// rolled back and `on_commit` is not called.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a database error if the transaction
    /// cannot begin or commit.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T>,
        on_commit: impl FnOnce(&T),
    ) -> Result<T> {
        let mut conn = self.writer.lock().map_err(|e| {
            Error::Internal(format!(
                "database writer mutex poisoned (a thread panicked while holding the lock): {e}"
            ))
        })?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;

        on_commit(&out);
        Ok(out)
    }
}

/// Absolute location of the database file.
///
/// Readers reopen the database by path, so the path must name the same file
/// for every connection, whatever the working directory is later.
fn resolve_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    if raw.is_empty() || raw == ":memory:" || raw.starts_with("file:") {
        return Err(Error::Config(format!(
            "'{raw}' is not a database file; strata needs an on-disk path"
        )));
    }

    let file_name = path.file_name().ok_or_else(|| {
        Error::Config(format!("'{raw}' does not name a database file"))
    })?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(parent.canonicalize()?.join(file_name))
}
