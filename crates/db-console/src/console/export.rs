//! `export <pattern> to <dir>`: one SQL dump file per matching table.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::core::backend::{fetch_all, Backend};
use crate::core::schema::{Catalog, TablePattern};
use crate::core::types::Value;
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

pub fn export_tables(
    backend: &mut dyn Backend,
    catalog: &Catalog,
    pattern: &str,
    dir: &Path,
) -> AppResult<ExportSummary> {
    let pattern = TablePattern::parse(pattern)?;
    let tables = catalog.matching_tables(backend, &pattern)?;
    let mut summary = ExportSummary::default();
    if tables.is_empty() {
        tracing::info!(schema = %pattern.schema, table = %pattern.table, "nothing to export");
        return Ok(summary);
    }
    fs::create_dir_all(dir).map_err(|source| AppError::ExportPath {
        path: dir.to_path_buf(),
        source,
    })?;

    for (schema, table) in tables {
        let path = dir.join(format!("tbl_{schema}_{table}.sql").to_lowercase());
        match dump_table(backend, &schema, &table, &path) {
            Ok(rows) => {
                tracing::info!(%schema, %table, rows, path = %path.display(), "exported");
                summary.written.push(path);
            }
            Err(e) => {
                tracing::warn!(%schema, %table, error = %e, "export failed");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

fn dump_table(backend: &mut dyn Backend, schema: &str, table: &str, path: &Path) -> AppResult<u64> {
    let ddl = fetch_all(
        backend,
        &format!(
            "SELECT sql FROM {}.sqlite_master WHERE tbl_name = {} AND sql IS NOT NULL \
             ORDER BY CASE type WHEN 'table' THEN 0 ELSE 1 END, name",
            quote_ident(schema),
            quote_text(table)
        ),
    )?;
    let file = File::create(path).map_err(|source| AppError::ExportPath {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    let (tables, indexes) = ddl.split_at(ddl.len().min(1));
    for row in tables {
        writeln!(out, "{};", row.values()[0].to_plain())?;
    }

    let target = format!("{}.{}", quote_ident(schema), quote_ident(table));
    let mut written = 0u64;
    backend.execute(&format!("SELECT * FROM {target}"), &mut |cursor| {
        let names: Vec<String> = cursor.columns().iter().map(|c| quote_ident(&c.name)).collect();
        let head = format!("INSERT INTO {} ({}) VALUES", quote_ident(table), names.join(", "));
        while let Some(row) = cursor.next_row()? {
            let values: Vec<String> = row.values().iter().map(sql_literal).collect();
            writeln!(out, "{head} ({});", values.join(", "))?;
            written += 1;
        }
        Ok(written)
    })?;

    for row in indexes {
        writeln!(out, "{};", row.values()[0].to_plain())?;
    }
    out.flush()?;
    Ok(written)
}

fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn sql_literal(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => u8::from(*b).to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) if f.is_nan() => "NULL".to_string(),
        Value::Real(f) if f.is_infinite() => if *f > 0.0 { "9e999" } else { "-9e999" }.to_string(),
        // Debug keeps a decimal point, so the value reads back as REAL
        Value::Real(f) => format!("{f:?}"),
        Value::Text(s) => quote_text(s),
        Value::Blob(b) => {
            let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sqlite::SqliteBackend;

    fn backend() -> SqliteBackend {
        let b = SqliteBackend::in_memory().unwrap();
        b.connection()
            .execute_batch(
                "CREATE TABLE Items (id INTEGER PRIMARY KEY, label TEXT, weight REAL, raw BLOB);
                 CREATE INDEX items_label ON Items(label);
                 INSERT INTO Items VALUES (1, 'it''s', 2.0, X'00FF'), (2, NULL, 0.5, NULL);
                 CREATE TABLE other (x);",
            )
            .unwrap();
        b
    }

    #[test]
    fn dump_replays_into_an_empty_database() {
        let mut b = backend();
        let catalog = Catalog::probe(&mut b);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");
        let summary = export_tables(&mut b, &catalog, "items", &target).unwrap();
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.written, vec![target.join("tbl_main_items.sql")]);

        let script = fs::read_to_string(&summary.written[0]).unwrap();
        assert!(script.starts_with("CREATE TABLE Items"));
        assert!(script.contains("X'00FF'"));
        assert!(script.contains("'it''s'"));

        let mut fresh = SqliteBackend::in_memory().unwrap();
        fresh.connection().execute_batch(&script).unwrap();
        let rows = fetch_all(&mut fresh, "SELECT id, label, weight, raw FROM Items ORDER BY id").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values()[1], Value::Text("it's".into()));
        assert_eq!(rows[0].values()[2], Value::Real(2.0));
        assert_eq!(rows[0].values()[3], Value::Blob(vec![0, 255]));
        let idx = fetch_all(&mut fresh, "SELECT name FROM sqlite_master WHERE type = 'index'").unwrap();
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn wildcard_exports_every_table() {
        let mut b = backend();
        let catalog = Catalog::probe(&mut b);
        let dir = tempfile::tempdir().unwrap();
        let summary = export_tables(&mut b, &catalog, "main.*", dir.path()).unwrap();
        assert_eq!(summary.written.len(), 2);
    }

    #[test]
    fn no_match_writes_nothing() {
        let mut b = backend();
        let catalog = Catalog::probe(&mut b);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("never");
        let summary = export_tables(&mut b, &catalog, "missing", &target).unwrap();
        assert!(summary.written.is_empty());
        assert!(!target.exists());
    }

    #[test]
    fn literals_cover_every_value_kind() {
        assert_eq!(sql_literal(&Value::Null), "NULL");
        assert_eq!(sql_literal(&Value::Bool(true)), "1");
        assert_eq!(sql_literal(&Value::Real(3.0)), "3.0");
        assert_eq!(sql_literal(&Value::Real(f64::NEG_INFINITY)), "-9e999");
        assert_eq!(sql_literal(&Value::Blob(vec![0xab, 1])), "X'AB01'");
    }
}
