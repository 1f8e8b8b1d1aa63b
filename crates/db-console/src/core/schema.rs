//! Catalog queries. Their shape depends on the SQLite version behind the
//! connection, so the supported shape is probed once per session.

use crate::core::backend::{fetch_all, probe, Backend};
use crate::error::{AppError, AppResult};

/// How `describe table` lists columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescribeShape {
    /// `pragma_table_xinfo`, SQLite 3.26+. Includes hidden and generated columns.
    TableXInfo,
    /// `pragma_table_info` table-valued function.
    TableInfo,
}

/// How `list tables` enumerates tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingShape {
    /// `pragma_table_list`, SQLite 3.37+. Reports every attached schema.
    TableList,
    /// `sqlite_master` of the main schema.
    Master,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    pub describe: DescribeShape,
    pub listing: ListingShape,
}

/// A validated `[schema.]table` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn parse(s: &str) -> AppResult<Self> {
        let s = s.trim();
        if !is_safe_table_ref(s) {
            return Err(AppError::InvalidCommand(format!("invalid table identifier: {s}")));
        }
        Ok(match s.split_once('.') {
            Some((schema, table)) => TableRef {
                schema: Some(schema.to_string()),
                table: table.to_string(),
            },
            None => TableRef {
                schema: None,
                table: s.to_string(),
            },
        })
    }

    fn schema_or_main(&self) -> &str {
        self.schema.as_deref().unwrap_or("main")
    }
}

/// `[schema.]table` pattern for `export`; `*` and `%` are wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePattern {
    pub schema: String,
    pub table: String,
}

impl TablePattern {
    pub fn parse(s: &str) -> AppResult<Self> {
        let s = s.trim().replace('*', "%");
        let ok_chars = s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '%' || c == '.');
        let parts: Vec<&str> = s.split('.').collect();
        if !ok_chars || parts.len() > 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(AppError::InvalidCommand(format!("invalid table pattern: {s}")));
        }
        Ok(match parts.as_slice() {
            [schema, table] => TablePattern {
                schema: schema.to_string(),
                table: table.to_string(),
            },
            _ => TablePattern {
                schema: "%".to_string(),
                table: s.clone(),
            },
        })
    }
}

impl Catalog {
    pub fn probe(backend: &mut dyn Backend) -> Self {
        let describe = if probe(backend, "SELECT name FROM pragma_table_xinfo('sqlite_master')") {
            DescribeShape::TableXInfo
        } else {
            DescribeShape::TableInfo
        };
        let listing = if probe(backend, "SELECT name FROM pragma_table_list LIMIT 1") {
            ListingShape::TableList
        } else {
            ListingShape::Master
        };
        let catalog = Catalog { describe, listing };
        tracing::debug!(?catalog, backend = backend.name(), "catalog shape probed");
        catalog
    }

    /// Queries whose result sets together describe a table: its columns,
    /// then the stored DDL of the table and its indexes.
    pub fn describe_queries(&self, t: &TableRef) -> Vec<String> {
        let schema = t.schema_or_main();
        let columns = match self.describe {
            DescribeShape::TableXInfo => format!(
                "SELECT cid, name, type, \"notnull\", dflt_value, pk, hidden \
                 FROM pragma_table_xinfo('{}', '{schema}') ORDER BY cid",
                t.table
            ),
            DescribeShape::TableInfo => format!(
                "SELECT cid, name, type, \"notnull\", dflt_value, pk \
                 FROM pragma_table_info('{}', '{schema}') ORDER BY cid",
                t.table
            ),
        };
        let ddl = format!(
            "SELECT type, name, sql FROM \"{schema}\".sqlite_master \
             WHERE LOWER(tbl_name) = LOWER('{}') AND sql IS NOT NULL ORDER BY type DESC, name",
            t.table
        );
        vec![columns, ddl]
    }

    pub fn list_tables_query(&self) -> String {
        match self.listing {
            ListingShape::TableList => "SELECT schema, name, type, ncol FROM pragma_table_list \
                 WHERE name NOT LIKE 'sqlite_%' ORDER BY schema, name"
                .to_string(),
            ListingShape::Master => "SELECT 'main' AS schema, name, type FROM sqlite_master \
                 WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name"
                .to_string(),
        }
    }

    /// `(schema, table)` pairs of user tables matching `p`.
    pub fn matching_tables(&self, backend: &mut dyn Backend, p: &TablePattern) -> AppResult<Vec<(String, String)>> {
        let sql = match self.listing {
            ListingShape::TableList => format!(
                "SELECT schema, name FROM pragma_table_list WHERE type = 'table' \
                 AND name NOT LIKE 'sqlite_%' AND schema <> 'temp' \
                 AND LOWER(schema) LIKE LOWER('{}') AND LOWER(name) LIKE LOWER('{}') \
                 ORDER BY schema, name",
                p.schema, p.table
            ),
            ListingShape::Master => format!(
                "SELECT 'main', name FROM sqlite_master WHERE type = 'table' \
                 AND name NOT LIKE 'sqlite_%' AND 'main' LIKE LOWER('{}') \
                 AND LOWER(name) LIKE LOWER('{}') ORDER BY name",
                p.schema, p.table
            ),
        };
        let rows = fetch_all(backend, &sql)?;
        Ok(rows
            .iter()
            .map(|r| (r.values()[0].to_plain(), r.values()[1].to_plain()))
            .collect())
    }

    /// Column and index names for completion. Failures yield an empty list.
    pub fn completion_words(&self, backend: &mut dyn Backend) -> Vec<String> {
        let mut words = Vec::new();
        let tables = match fetch_all(backend, &self.list_tables_query()) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::debug!(error=%e, "could not read table names for completion");
                return words;
            }
        };
        for row in tables {
            let schema = row.values()[0].to_plain();
            let name = row.values()[1].to_plain();
            if !is_safe_identifier(&name) {
                continue;
            }
            words.push(format!("{schema}.{name}"));
            let columns = format!("SELECT name FROM pragma_table_info('{name}', '{schema}')");
            if let Ok(cols) = fetch_all(backend, &columns) {
                words.extend(cols.iter().map(|c| c.values()[0].to_plain()));
            }
            words.push(name);
        }
        words
    }
}

pub(crate) fn is_safe_identifier(s: &str) -> bool {
    // Minimal safe subset: [A-Za-z_][A-Za-z0-9_]*
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn is_safe_table_ref(s: &str) -> bool {
    // Either `table` or `schema.table`, both segments safe identifiers.
    let mut parts = s.split('.');
    let Some(first) = parts.next() else { return false };
    if !is_safe_identifier(first) {
        return false;
    }
    match parts.next() {
        None => true,
        Some(second) => parts.next().is_none() && is_safe_identifier(second),
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
                "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);
                 CREATE INDEX users_email ON users(email);
                 CREATE TABLE user_roles (user_id INTEGER, role TEXT);
                 CREATE VIEW v_users AS SELECT * FROM users;",
            )
            .unwrap();
        b
    }

    #[test]
    fn bundled_sqlite_supports_the_newest_shapes() {
        let mut b = backend();
        let c = Catalog::probe(&mut b);
        assert_eq!(c.describe, DescribeShape::TableXInfo);
        assert_eq!(c.listing, ListingShape::TableList);
    }

    #[test]
    fn every_shape_describes_and_lists() {
        let mut b = backend();
        for describe in [DescribeShape::TableXInfo, DescribeShape::TableInfo] {
            for listing in [ListingShape::TableList, ListingShape::Master] {
                let c = Catalog { describe, listing };
                let t = TableRef::parse("users").unwrap();
                let q = c.describe_queries(&t);
                let cols = fetch_all(&mut b, &q[0]).unwrap();
                assert_eq!(cols.len(), 2);
                assert_eq!(cols[1].get("name").unwrap().to_plain(), "email");
                let ddl = fetch_all(&mut b, &q[1]).unwrap();
                assert_eq!(ddl.len(), 2, "table and index DDL");

                let listed = fetch_all(&mut b, &c.list_tables_query()).unwrap();
                let names: Vec<_> = listed.iter().map(|r| r.get("name").unwrap().to_plain()).collect();
                assert_eq!(names, vec!["user_roles", "users", "v_users"]);
            }
        }
    }

    #[test]
    fn export_patterns_match_with_wildcards() {
        let mut b = backend();
        for listing in [ListingShape::TableList, ListingShape::Master] {
            let c = Catalog {
                describe: DescribeShape::TableInfo,
                listing,
            };
            let all = c.matching_tables(&mut b, &TablePattern::parse("*").unwrap()).unwrap();
            assert_eq!(all.len(), 2, "views are not exported");
            let one = c
                .matching_tables(&mut b, &TablePattern::parse("main.users").unwrap())
                .unwrap();
            assert_eq!(one, vec![("main".to_string(), "users".to_string())]);
        }
    }

    #[test]
    fn rejects_unsafe_names() {
        assert!(TableRef::parse("users; DROP TABLE x").is_err());
        assert!(TableRef::parse("a.b.c").is_err());
        assert_eq!(
            TableRef::parse("main.users").unwrap().schema.as_deref(),
            Some("main")
        );
        assert!(TablePattern::parse("us'ers").is_err());
        assert_eq!(TablePattern::parse("main.*").unwrap().table, "%");
    }

    #[test]
    fn completion_words_include_tables_and_columns() {
        let mut b = backend();
        let c = Catalog::probe(&mut b);
        let words = c.completion_words(&mut b);
        assert!(words.contains(&"users".to_string()));
        assert!(words.contains(&"main.users".to_string()));
        assert!(words.contains(&"email".to_string()));
    }
}
