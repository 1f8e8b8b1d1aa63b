//! Statement text handling: splitting raw input and the keyword heuristics
//! that decide whether a SELECT may be paged.
//!
//! The checks are whole-word matches on the lower-cased text, not a parse. A
//! keyword inside a string literal (`WHERE note = 'no limit'`) also counts,
//! which only ever makes a statement run unpaged.

/// Splits one input line on `;` into trimmed, non-empty statements.
pub fn split_statements(input: &str) -> Vec<&str> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Why a statement runs once, unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unpaged {
    PagingDisabled,
    NotSelect,
    /// Already contains `order by`, `limit` or `offset`, or groups its rows
    /// with `group by` / `having`.
    Conflicts(&'static str),
    /// The select list is made of aggregates only, so the whole result is
    /// one row computed over every input row.
    Aggregate,
    /// No `from` clause; there is no table to page through.
    NoSource,
}

const CONFLICTING: [&str; 5] = ["order by", "limit", "offset", "group by", "having"];

const AGGREGATES: [&str; 7] = ["count", "sum", "avg", "min", "max", "total", "group_concat"];

pub fn is_select(stmt: &str) -> bool {
    let s = stmt.trim_start();
    match s.get(..6) {
        Some(head) if head.eq_ignore_ascii_case("select") => s[6..].starts_with(char::is_whitespace),
        _ => false,
    }
}

/// `Ok(())` when `stmt` may be rewritten into pages of `page_size` rows.
pub fn paging_eligibility(stmt: &str, page_size: usize) -> Result<(), Unpaged> {
    if page_size == 0 {
        return Err(Unpaged::PagingDisabled);
    }
    if !is_select(stmt) {
        return Err(Unpaged::NotSelect);
    }
    let lower = normalize_ws(&stmt.to_ascii_lowercase());
    for kw in CONFLICTING {
        if contains_word(&lower, kw) {
            return Err(Unpaged::Conflicts(kw));
        }
    }
    let Some(from_at) = find_word(&lower, "from") else {
        return Err(Unpaged::NoSource);
    };
    if is_aggregate_list(&lower["select".len()..from_at]) {
        return Err(Unpaged::Aggregate);
    }
    Ok(())
}

/// Whether every item of a lower-cased select list is an aggregate call.
fn is_aggregate_list(list: &str) -> bool {
    let items = split_top_level(list);
    !items.is_empty()
        && items.iter().all(|item| {
            let item = item.trim();
            AGGREGATES.iter().any(|f| {
                item.strip_prefix(f)
                    .map(|rest| rest.trim_start().starts_with('('))
                    .unwrap_or(false)
            })
        })
}

/// Splits on commas outside parentheses.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&list[start..]);
    items.retain(|s| !s.trim().is_empty());
    items
}

/// Adds the identity column to the select list when the statement does not
/// mention it as a word anywhere. SQLite's `*` does not expand to the rowid. `DISTINCT`
/// selects are left alone since an extra column changes their meaning.
///
/// The injected column is aliased to its own name: SQLite otherwise reports
/// a selected rowid as `rowid` or as the INTEGER PRIMARY KEY column's name.
pub fn ensure_identity_selected(stmt: &str, rid_name: &str) -> String {
    let stmt = stmt.trim();
    let lower = stmt.to_ascii_lowercase();
    if contains_word(&lower, &rid_name.to_ascii_lowercase()) || !is_select(stmt) {
        return stmt.to_string();
    }
    let rest = stmt[6..].trim_start();
    if rest.to_ascii_lowercase().starts_with("distinct") {
        return stmt.to_string();
    }
    format!("SELECT {rid_name} AS {rid_name}, {rest}")
}

const ROWID_ALIASES: [&str; 3] = ["rowid", "_rowid_", "oid"];

/// Whether a result column named `column` carries the identity `rid_name`.
/// The three SQLite rowid spellings all name the same column.
pub fn is_identity_column(column: &str, rid_name: &str) -> bool {
    if column.eq_ignore_ascii_case(rid_name) {
        return true;
    }
    let is_alias = |n: &str| ROWID_ALIASES.iter().any(|a| a.eq_ignore_ascii_case(n));
    is_alias(column) && is_alias(rid_name)
}

/// The statement for the next page: rows strictly after `last_rid`, at most
/// `page_size` of them. An existing WHERE condition is parenthesised and
/// joined with AND; a GROUP BY tail stays after the predicate.
pub fn rewrite_for_page(stmt: &str, rid_name: &str, last_rid: &str, page_size: usize) -> String {
    let stmt = stmt.trim();
    let predicate = format!("{rid_name} > {}", identity_literal(last_rid));
    let lower = stmt.to_ascii_lowercase();
    let tail_at = find_word(&lower, "group").unwrap_or(stmt.len());
    let (body, tail) = stmt.split_at(tail_at);
    let tail = if tail.is_empty() { String::new() } else { format!(" {}", tail.trim()) };
    match find_word(&lower[..tail_at], "where") {
        Some(at) => {
            let head = body[..at].trim_end();
            let cond = body[at + "where".len()..].trim();
            format!("{head} WHERE ({cond}) AND {predicate}{tail} LIMIT {page_size}")
        }
        None => format!("{} WHERE {predicate}{tail} LIMIT {page_size}", body.trim_end()),
    }
}

/// Integer identities stay bare; anything else becomes a quoted string.
pub fn identity_literal(rid: &str) -> String {
    if rid.parse::<i64>().is_ok() {
        rid.to_string()
    } else {
        format!("'{}'", rid.replace('\'', "''"))
    }
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    haystack.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before = i == 0 || !is_word_byte(bytes[i - 1]);
        let end = i + word.len();
        let after = end >= bytes.len() || !is_word_byte(bytes[end]);
        before && after
    })
}

fn contains_word(haystack: &str, word: &str) -> bool {
    find_word(haystack, word).is_some()
}
