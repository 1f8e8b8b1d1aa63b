//! Runs one statement, paging transparently when it is an eligible SELECT.
//!
//! Paging rewrites the statement into `... WHERE <rid> > <last> LIMIT <n>`
//! and fetches until a page comes back empty. A short page is not treated
//! as the end: only an empty one is. This assumes the table is not modified
//! while it is being paged and that the identity column orders rows totally;
//! a page cap and a stalled-identity check stop the loop when it does not.

use std::{fmt, io::Write};

use crate::console::{interrupt::CancelFlag, state::SessionState};
use crate::core::backend::{Backend, RowCursor};
use crate::core::statement::{
    ensure_identity_selected, is_identity_column, paging_eligibility, rewrite_for_page, Unpaged,
};
use crate::core::types::{Outcome, Value};
use crate::error::{AppError, AppResult};
use crate::render::{renderer_for, RowRenderer};

/// A paged statement stopped early or could not advance its cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagingWarning {
    /// The result has no identity column, or a row has NULL in it, so there
    /// is no next page.
    MissingIdentity { column: String },
    /// A page ended on the identity the previous page ended on.
    IdentityStalled { rid: String },
    PageCapReached { pages: usize },
    Cancelled { pages: usize },
}

impl fmt::Display for PagingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagingWarning::MissingIdentity { column } => {
                write!(f, "identity column {column} is not in the result; stopped after the first page")
            }
            PagingWarning::IdentityStalled { rid } => {
                write!(f, "identity did not advance past {rid}; is the identity column totally ordered?")
            }
            PagingWarning::PageCapReached { pages } => {
                write!(f, "stopped after {pages} pages (page cap)")
            }
            PagingWarning::Cancelled { pages } => write!(f, "cancelled after {pages} pages"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementReport {
    /// Rows rendered.
    pub rows: u64,
    /// Rows fetched but not rendered.
    pub skipped: u64,
    /// Set for statements that change data instead of returning rows.
    pub changes: Option<u64>,
    /// Fetches issued; 1 for an unpaged statement.
    pub pages: usize,
    pub paged: bool,
    pub warning: Option<PagingWarning>,
}

#[derive(Debug, Default)]
struct PageStats {
    fetched: u64,
    rendered: u64,
    skipped: u64,
    last_rid: Option<String>,
    /// A row carried NULL in the identity column.
    null_rid: bool,
}

pub fn run_statement(
    state: &mut SessionState,
    backend: &mut dyn Backend,
    stmt: &str,
    out: &mut dyn Write,
    cancel: &CancelFlag,
) -> AppResult<StatementReport> {
    match paging_eligibility(stmt, state.page_size) {
        Ok(()) => run_paged(state, backend, stmt, out, cancel),
        Err(why) => {
            match why {
                Unpaged::Conflicts(kw) => {
                    tracing::warn!(clause = kw, "paging is enabled but the statement has its own '{kw}'; running it once, unmodified");
                }
                Unpaged::Aggregate => {
                    tracing::info!("aggregate select is not paged; running it once, unmodified");
                }
                Unpaged::PagingDisabled | Unpaged::NotSelect | Unpaged::NoSource => {}
            }
            run_once(state, backend, stmt, out)
        }
    }
}

fn run_once(
    state: &SessionState,
    backend: &mut dyn Backend,
    stmt: &str,
    out: &mut dyn Write,
) -> AppResult<StatementReport> {
    let mut renderer = renderer_for(state.format, state.render_options(false));
    let rid_name = state.rid_name.clone();
    let mut page = PageStats::default();
    let mut begun = false;

    let result = backend.execute(stmt, &mut |cursor| {
        renderer.begin_page(cursor.columns(), out)?;
        begun = true;
        page = drain_page(cursor, renderer.as_mut(), out, &rid_name)?;
        renderer.end_page(out)?;
        Ok(page.fetched)
    });
    if begun {
        renderer.finish(out)?;
    }

    let mut report = StatementReport {
        rows: page.rendered,
        skipped: page.skipped,
        pages: 1,
        ..StatementReport::default()
    };
    if let Outcome::Updated { changes } = result? {
        report.changes = Some(changes);
        report.rows = changes;
    }
    Ok(report)
}

fn run_paged(
    state: &mut SessionState,
    backend: &mut dyn Backend,
    stmt: &str,
    out: &mut dyn Write,
    cancel: &CancelFlag,
) -> AppResult<StatementReport> {
    let rid_name = state.rid_name.clone();
    let base = ensure_identity_selected(stmt, &rid_name);
    let mut renderer = renderer_for(state.format, state.render_options(true));
    let mut last_rid = state.start_rid.clone();
    let mut report = StatementReport {
        paged: true,
        ..StatementReport::default()
    };
    tracing::info!(paging = state.page_size, "pagination is enabled");

    loop {
        if report.pages >= state.max_pages {
            report.warning = Some(PagingWarning::PageCapReached { pages: report.pages });
            break;
        }
        if cancel.is_raised() {
            report.warning = Some(PagingWarning::Cancelled { pages: report.pages });
            break;
        }

        let sql = rewrite_for_page(&base, &rid_name, &last_rid, state.page_size);
        tracing::debug!(%sql, "page query");
        let mut page = PageStats::default();
        let mut has_rid = false;
        let result = backend.execute(&sql, &mut |cursor| {
            has_rid = cursor.columns().iter().any(|c| is_identity_column(&c.name, &rid_name));
            renderer.begin_page(cursor.columns(), out)?;
            page = drain_page(cursor, renderer.as_mut(), out, &rid_name)?;
            renderer.end_page(out)?;
            Ok(page.fetched)
        });
        report.pages += 1;
        report.rows += page.rendered;
        report.skipped += page.skipped;
        state.last_batch = page.fetched;

        if let Err(e) = result {
            renderer.finish(out)?;
            tracing::warn!(last_rid = %last_rid, "paging interrupted; `set offset {last_rid}` resumes after the last complete page");
            return Err(e);
        }
        if page.fetched == 0 {
            break;
        }
        if !has_rid || page.null_rid {
            report.warning = Some(PagingWarning::MissingIdentity {
                column: rid_name.clone(),
            });
            break;
        }
        match page.last_rid {
            Some(rid) if rid != last_rid => last_rid = rid,
            _ => {
                report.warning = Some(PagingWarning::IdentityStalled { rid: last_rid.clone() });
                break;
            }
        }
        state.last_rid = last_rid.clone();
        tracing::info!(page = report.pages, paging = state.page_size, last_rid = %last_rid, "fetched page");
    }

    renderer.finish(out)?;
    if let Some(w) = &report.warning {
        tracing::warn!("{w}");
    }
    Ok(report)
}

/// Renders every row of `cursor`. Rows that cannot be rendered are logged
/// with their identity and skipped.
fn drain_page(
    cursor: &mut dyn RowCursor,
    renderer: &mut dyn RowRenderer,
    out: &mut dyn Write,
    rid_name: &str,
) -> AppResult<PageStats> {
    let mut stats = PageStats::default();
    while let Some(row) = cursor.next_row()? {
        stats.fetched += 1;
        match row.identity(rid_name) {
            Some(Value::Null) => stats.null_rid = true,
            Some(v) => stats.last_rid = Some(v.to_plain()),
            None => {}
        }
        match renderer.row(&row, out) {
            Ok(()) => stats.rendered += 1,
            Err(e @ AppError::Render { .. }) => {
                tracing::warn!(error=%e, "skipping row");
                stats.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(stats)
}
