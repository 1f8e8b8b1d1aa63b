//! One console session: the backend connection, its state, and the routing
//! of each input line to a meta-command or to the pager.

use std::{
    io::Write,
    time::{Duration, Instant},
};

use crate::console::{
    dispatch::{Dispatcher, MetaCommand},
    export::export_tables,
    interrupt::CancelFlag,
    output::{open_append, OutputTarget},
    pager::{run_statement, StatementReport},
    state::SessionState,
};
use crate::core::backend::{fetch_all, Backend};
use crate::core::schema::{Catalog, TableRef};
use crate::core::statement::split_statements;
use crate::core::types::OutputFormat;
use crate::error::{AppError, AppResult};
use crate::logging::LogControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Exit,
}

pub struct Session {
    backend: Box<dyn Backend>,
    state: SessionState,
    catalog: Catalog,
    dispatcher: Dispatcher,
    log: LogControl,
    cancel: CancelFlag,
}

impl Session {
    pub fn new(mut backend: Box<dyn Backend>, state: SessionState, log: LogControl) -> AppResult<Self> {
        let catalog = Catalog::probe(backend.as_mut());
        Ok(Self {
            backend,
            state,
            catalog,
            dispatcher: Dispatcher::new()?,
            log,
            cancel: CancelFlag::default(),
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn completion_words(&mut self) -> Vec<String> {
        self.catalog.completion_words(self.backend.as_mut())
    }

    /// Handles one input line. Statement failures are reported on stderr and
    /// do not stop the remaining statements; a bad meta-command is returned.
    pub fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> AppResult<LineOutcome> {
        let trimmed = line.trim().trim_end_matches(';').trim();
        if trimmed.is_empty() {
            return Ok(LineOutcome::Continue);
        }
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            return Ok(LineOutcome::Exit);
        }
        if let Some(cmd) = self.dispatcher.dispatch(line)? {
            self.apply(cmd, out)?;
            return Ok(LineOutcome::Continue);
        }
        for result in self.run_statements(line, out) {
            if let Err(e) = result {
                if e.is_fatal() {
                    return Err(e);
                }
                eprintln!("Error: {e}");
            }
        }
        Ok(LineOutcome::Continue)
    }

    /// Runs each `;`-separated statement of `line` through the pager and
    /// prints its timing line to stderr.
    pub fn run_statements(&mut self, line: &str, out: &mut dyn Write) -> Vec<AppResult<StatementReport>> {
        let mut results = Vec::new();
        for stmt in split_statements(line) {
            self.cancel.reset();
            let started = Instant::now();
            let result = self.run_one(stmt, out);
            eprintln!("{}", status_line(started.elapsed(), &result));
            if let Err(e) = &result {
                tracing::debug!(error = ?e, %stmt, "statement failed");
            }
            let fatal = matches!(&result, Err(e) if e.is_fatal());
            results.push(result);
            if fatal {
                break;
            }
        }
        results
    }

    fn run_one(&mut self, stmt: &str, out: &mut dyn Write) -> AppResult<StatementReport> {
        let mut target = OutputTarget::open(self.state.export_path.as_deref(), out)?;
        run_statement(&mut self.state, self.backend.as_mut(), stmt, &mut target, &self.cancel)
    }

    fn apply(&mut self, cmd: MetaCommand, out: &mut dyn Write) -> AppResult<()> {
        match cmd {
            MetaCommand::Comment => {}
            MetaCommand::DebugToggle(on) => {
                self.state.debug = on;
                self.log.set_debug(on);
                eprintln!("debug: {on}");
            }
            MetaCommand::Autocommit(on) => {
                self.backend.set_autocommit(on)?;
                eprintln!("autocommit: {on}");
            }
            MetaCommand::OutputFormat(f) => {
                self.state.format = f;
                eprintln!("output: {f}");
            }
            MetaCommand::Paging(n) => {
                self.state.page_size = n;
                if n > 0 {
                    eprintln!("pagination is enabled; paging: {n}");
                } else {
                    eprintln!("pagination is disabled");
                }
            }
            MetaCommand::StartRid(rid) => {
                self.state.start_rid = rid.clone();
                self.state.last_rid = rid;
            }
            MetaCommand::ExportTarget(path) => {
                if let Some(p) = &path {
                    open_append(p)?;
                }
                self.state.export_path = path;
            }
            MetaCommand::BinaryField(col) => self.state.binary_field = col,
            MetaCommand::Describe(name) => self.describe(&name, out)?,
            MetaCommand::ListTables => {
                let sql = self.catalog.list_tables_query();
                self.run_catalog_query(&sql, self.state.format, out)?;
            }
            MetaCommand::Export { pattern, dir } => {
                let summary = export_tables(self.backend.as_mut(), &self.catalog, &pattern, &dir)?;
                if summary.written.is_empty() && summary.failed == 0 {
                    eprintln!("nothing to export for {pattern}");
                } else {
                    eprintln!("exported {} tables to {} ({} failed)", summary.written.len(), dir.display(), summary.failed);
                }
            }
        }
        Ok(())
    }

    fn describe(&mut self, name: &str, out: &mut dyn Write) -> AppResult<()> {
        let table = TableRef::parse(name)?;
        let queries = self.catalog.describe_queries(&table);
        // an unknown table has no columns; nothing is printed for it
        let known = match queries.first() {
            Some(columns) => !fetch_all(self.backend.as_mut(), columns)?.is_empty(),
            None => false,
        };
        if !known {
            return Err(AppError::InvalidCommand(format!("no such table: {name}")));
        }
        for sql in &queries {
            self.run_catalog_query(sql, OutputFormat::Text, out)?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Catalog output bypasses paging and the export file.
    fn run_catalog_query(&mut self, sql: &str, format: OutputFormat, out: &mut dyn Write) -> AppResult<StatementReport> {
        let mut state = self.state.clone();
        state.format = format;
        state.page_size = 0;
        run_statement(&mut state, self.backend.as_mut(), sql, out, &self.cancel)
    }

    /// Ends the session. An open transaction is rolled back when the
    /// connection closes.
    pub fn close(self) {
        if !self.backend.is_autocommit() {
            tracing::warn!("closing with an open transaction; uncommitted changes are discarded");
        }
    }
}

/// Printed after every statement, failed ones included.
fn status_line(elapsed: Duration, result: &AppResult<StatementReport>) -> String {
    let rows = result.as_ref().map_or(0, |r| r.rows);
    format!("Elapsed: {} ms  Rows: {rows}", elapsed.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sqlite::SqliteBackend;

    fn session() -> Session {
        let b = SqliteBackend::in_memory().unwrap();
        b.connection()
            .execute_batch(
                "CREATE TABLE t (name TEXT, qty INTEGER);
                 INSERT INTO t VALUES ('a', 1), ('b', 2), ('c', 3);",
            )
            .unwrap();
        Session::new(Box::new(b), SessionState::default(), LogControl::detached("info")).unwrap()
    }

    fn run(s: &mut Session, line: &str) -> String {
        let mut out = Vec::new();
        assert_eq!(s.handle_line(line, &mut out).unwrap(), LineOutcome::Continue);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn settings_change_state() {
        let mut s = session();
        run(&mut s, "set paging 2");
        run(&mut s, "set output csv");
        run(&mut s, "set offset 1");
        run(&mut s, "-- ignored");
        assert_eq!(s.state().page_size, 2);
        assert_eq!(s.state().format, OutputFormat::Csv);
        assert_eq!(s.state().start_rid, "1");
    }

    #[test]
    fn paged_csv_prints_the_header_once() {
        let mut s = session();
        run(&mut s, "set paging 1");
        run(&mut s, "set output csv");
        let text = run(&mut s, "select name from t");
        assert_eq!(text, "_ROWID_,name\n1,\"a\"\n2,\"b\"\n3,\"c\"\n");
    }

    #[test]
    fn failed_statement_does_not_stop_the_line() {
        let mut s = session();
        let mut out = Vec::new();
        let results = s.run_statements("select * from nope; select count(*) AS n from t", &mut out);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap_err().code(), "QUERY_ERROR");
        assert_eq!(results[1].as_ref().unwrap().rows, 1);
        let parsed: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["n"], 3);
    }

    #[test]
    fn status_line_is_reported_for_failures_too() {
        let mut s = session();
        let mut out = Vec::new();
        let results = s.run_statements("select name from t; select * from nope", &mut out);
        let lines: Vec<String> = results
            .iter()
            .map(|r| status_line(Duration::from_millis(12), r))
            .collect();
        assert_eq!(lines, vec!["Elapsed: 12 ms  Rows: 3", "Elapsed: 12 ms  Rows: 0"]);
    }

    #[test]
    fn exit_and_quit_end_the_session() {
        let mut s = session();
        let mut out = Vec::new();
        assert_eq!(s.handle_line("exit", &mut out).unwrap(), LineOutcome::Exit);
        assert_eq!(s.handle_line(" QUIT; ", &mut out).unwrap(), LineOutcome::Exit);
    }

    #[test]
    fn describe_renders_text_regardless_of_format() {
        let mut s = session();
        let text = run(&mut s, "describe table t");
        assert!(text.starts_with("cid,"), "{text}");
        assert!(text.contains("\"qty\""));
        assert!(text.contains("CREATE TABLE t"));
        let mut out = Vec::new();
        let err = s.handle_line("desc table missing", &mut out).unwrap_err();
        assert_eq!(err.code(), "INVALID_COMMAND");
        assert!(out.is_empty(), "{}", String::from_utf8_lossy(&out));
    }

    #[test]
    fn list_tables_uses_current_format() {
        let mut s = session();
        let json = run(&mut s, "list tables");
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["name"], "t");
    }

    #[test]
    fn export_target_receives_rows_instead_of_out() {
        let mut s = session();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        run(&mut s, &format!("set export {}", path.display()));
        let printed = run(&mut s, "select name from t");
        assert!(printed.is_empty());
        let written: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 3);
        run(&mut s, "set export off");
        assert!(s.state().export_path.is_none());
    }

    #[test]
    fn unwritable_export_path_is_reported_and_the_session_continues() {
        let mut s = session();
        let mut out = Vec::new();
        let err = s.handle_line("set export /nonexistent_dir/x.json", &mut out).unwrap_err();
        assert_eq!(err.code(), "EXPORT_PATH");
        assert!(!err.is_fatal());
        assert!(s.state().export_path.is_none());
        let printed = run(&mut s, "select count(*) AS n from t");
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&printed).unwrap();
        assert_eq!(parsed[0]["n"], 3);
    }

    #[test]
    fn autocommit_off_holds_changes_until_commit() {
        let mut s = session();
        run(&mut s, "set autocommit false");
        run(&mut s, "insert into t values ('d', 4)");
        run(&mut s, "set autocommit true");
        let json = run(&mut s, "select count(*) AS n from t");
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["n"], 4);
        s.close();
    }
}
