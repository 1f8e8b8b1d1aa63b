use std::collections::BTreeSet;

use rustyline::{
    completion::{Completer, Pair},
    highlight::Highlighter,
    hint::Hinter,
    validate::Validator,
    Context, Helper,
};

const KEYWORDS: &[&str] = &[
    "select", "from", "where", "insert", "into", "values", "update", "delete", "create", "table",
    "index", "view", "drop", "alter", "group", "by", "having", "join", "left", "inner", "on", "and",
    "or", "not", "null", "distinct", "count", "begin", "commit", "rollback", "pragma",
    // meta-commands
    "set", "debug", "output", "paging", "offset", "export", "binary", "autocommit", "describe",
    "desc", "info", "list", "tables", "classes", "exit", "quit", "json", "text", "csv",
];

/// Prefix completion over SQL keywords, catalog names and words seen in the
/// history file.
pub struct SqlHelper {
    words: Vec<String>,
}

impl SqlHelper {
    pub fn new(extra: impl IntoIterator<Item = String>) -> Self {
        let mut set: BTreeSet<String> = KEYWORDS.iter().map(|k| k.to_string()).collect();
        set.extend(extra.into_iter().filter(|w| !w.is_empty()));
        Self {
            words: set.into_iter().collect(),
        }
    }

    fn candidates(&self, prefix: &str) -> Vec<Pair> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let upper = prefix.chars().all(|c| !c.is_ascii_lowercase()) && prefix.chars().any(|c| c.is_ascii_uppercase());
        let lower = prefix.to_lowercase();
        self.words
            .iter()
            .filter(|w| w.to_lowercase().starts_with(&lower) && w.len() > prefix.len())
            .map(|w| {
                let is_keyword = KEYWORDS.contains(&w.as_str());
                let replacement = if upper && is_keyword { w.to_uppercase() } else { w.clone() };
                Pair {
                    display: w.clone(),
                    replacement,
                }
            })
            .collect()
    }
}

impl Completer for SqlHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let start = head
            .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .map(|i| i + head[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0);
        Ok((start, self.candidates(&head[start..])))
    }
}

impl Hinter for SqlHelper {
    type Hint = String;
}

impl Highlighter for SqlHelper {}

impl Validator for SqlHelper {}

impl Helper for SqlHelper {}
