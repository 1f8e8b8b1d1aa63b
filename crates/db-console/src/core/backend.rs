use std::sync::Arc;

use crate::core::types::{Column, Outcome, Row};
use crate::error::{AppResult, QueryError};

/// Forward-only view over one statement's result set.
pub trait RowCursor {
    fn columns(&self) -> &Arc<[Column]>;

    /// Next row, or `Ok(None)` once the result set is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>, QueryError>;
}

/// Consumer handed the cursor of a row-producing statement; returns how many
/// rows it pulled.
pub type ConsumeRows<'a> = dyn FnMut(&mut dyn RowCursor) -> AppResult<u64> + 'a;

/// The query engine behind the console. Owned exclusively by the session.
pub trait Backend {
    fn name(&self) -> &'static str;

    /// Run one statement. Row-producing statements hand their cursor to
    /// `consume`; everything else reports its change count.
    fn execute(&mut self, sql: &str, consume: &mut ConsumeRows<'_>) -> AppResult<Outcome>;

    fn is_autocommit(&self) -> bool;

    fn set_autocommit(&mut self, on: bool) -> Result<(), QueryError>;
}

/// Runs `sql` and collects every row. Only for catalog-sized results.
pub fn fetch_all(backend: &mut dyn Backend, sql: &str) -> AppResult<Vec<Row>> {
    let mut rows = Vec::new();
    backend.execute(sql, &mut |cursor| {
        while let Some(row) = cursor.next_row()? {
            rows.push(row);
        }
        Ok(rows.len() as u64)
    })?;
    Ok(rows)
}

/// Whether `sql` runs without error; rows are drained and discarded.
pub fn probe(backend: &mut dyn Backend, sql: &str) -> bool {
    let res = backend.execute(sql, &mut |cursor| {
        let mut n = 0;
        while cursor.next_row()?.is_some() {
            n += 1;
        }
        Ok(n)
    });
    match res {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(error=%e, %sql, "capability probe failed");
            false
        }
    }
}
