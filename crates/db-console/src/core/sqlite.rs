use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use rusqlite::{types::ValueRef, Connection, InterruptHandle, OpenFlags};

use crate::core::backend::{Backend, ConsumeRows, RowCursor};
use crate::core::types::{Column, Outcome, Row, Value};
use crate::error::{AppError, AppResult, QueryError};

pub const MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub read_only: bool,
    pub create: bool,
    pub busy_timeout_ms: u64,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            create: false,
            busy_timeout_ms: 2_000,
        }
    }
}

pub struct SqliteBackend {
    conn: Connection,
    pub db_path: PathBuf,
}

impl SqliteBackend {
    pub fn open(path: &Path, opts: &OpenOptions) -> AppResult<Self> {
        let conn = if path.as_os_str() == MEMORY_PATH {
            Connection::open_in_memory().map_err(|source| AppError::DbOpenFailed {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            if !opts.create && !path.exists() {
                return Err(AppError::DatabaseNotFound(path.to_path_buf()));
            }
            let flags = if opts.read_only {
                OpenFlags::SQLITE_OPEN_READ_ONLY
            } else {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            };
            Connection::open_with_flags(path, flags | OpenFlags::SQLITE_OPEN_URI).map_err(
                |source| AppError::DbOpenFailed {
                    path: path.to_path_buf(),
                    source,
                },
            )?
        };
        if let Err(e) = conn.busy_timeout(Duration::from_millis(opts.busy_timeout_ms)) {
            tracing::warn!(error=%e, "failed to set busy timeout");
        }
        tracing::debug!(path=%path.display(), version=rusqlite::version(), "opened sqlite database");
        Ok(Self {
            conn,
            db_path: path.to_path_buf(),
        })
    }

    pub fn in_memory() -> AppResult<Self> {
        Self::open(Path::new(MEMORY_PATH), &OpenOptions::default())
    }

    /// Handle that aborts the statement currently running on this connection.
    /// Safe to fire from another thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn execute(&mut self, sql: &str, consume: &mut ConsumeRows<'_>) -> AppResult<Outcome> {
        tracing::debug!(%sql, "execute");
        let mut stmt = self.conn.prepare(sql).map_err(QueryError::from)?;
        if stmt.column_count() == 0 {
            let changes = stmt.execute([]).map_err(QueryError::from)?;
            return Ok(Outcome::Updated {
                changes: changes as u64,
            });
        }

        let columns: Arc<[Column]> = stmt
            .columns()
            .iter()
            .map(|c| Column::new(c.name(), c.decl_type()))
            .collect::<Vec<_>>()
            .into();
        let rows = stmt.query([]).map_err(QueryError::from)?;
        let mut cursor = SqliteCursor { columns, rows };
        let count = consume(&mut cursor)?;
        Ok(Outcome::Rows { count })
    }

    fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    fn set_autocommit(&mut self, on: bool) -> Result<(), QueryError> {
        match (on, self.conn.is_autocommit()) {
            (true, false) => self.conn.execute_batch("COMMIT")?,
            (false, true) => self.conn.execute_batch("BEGIN")?,
            _ => {}
        }
        Ok(())
    }
}

struct SqliteCursor<'stmt> {
    columns: Arc<[Column]>,
    rows: rusqlite::Rows<'stmt>,
}

impl RowCursor for SqliteCursor<'_> {
    fn columns(&self) -> &Arc<[Column]> {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>, QueryError> {
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(self.columns.len());
        for i in 0..self.columns.len() {
            let v = match row.get_ref(i)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(x) => Value::Integer(x),
                ValueRef::Real(x) => Value::Real(x),
                ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(b) => Value::Blob(b.to_vec()),
            };
            values.push(v);
        }
        Ok(Some(Row::new(Arc::clone(&self.columns), values)))
    }
}
