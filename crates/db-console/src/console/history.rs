//! Location of the line-editor history file.
//!
//! `DB_CONSOLE_HISTORY` overrides the location; an empty value disables
//! history. Otherwise `~/.db-console_history` is used, or the temp directory
//! when the home directory is missing or read-only.

use std::{
    collections::BTreeSet,
    env, fs,
    path::{Path, PathBuf},
};

const DEFAULT_HISTORY_FILE: &str = ".db-console_history";
const HISTORY_ENV_VAR: &str = "DB_CONSOLE_HISTORY";

pub fn history_path() -> Option<PathBuf> {
    resolve(env::var(HISTORY_ENV_VAR).ok(), env::var_os("HOME").map(PathBuf::from))
}

fn resolve(custom: Option<String>, home: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(custom) = custom {
        return (!custom.is_empty()).then(|| PathBuf::from(custom));
    }
    let dir = home.filter(|h| is_writable_dir(h)).unwrap_or_else(env::temp_dir);
    Some(dir.join(DEFAULT_HISTORY_FILE))
}

fn is_writable_dir(p: &Path) -> bool {
    fs::metadata(p)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}

/// Distinct identifier-like words from a history file, for completion.
pub fn history_words(path: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let words: BTreeSet<&str> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .filter(|w| w.len() > 2 && !w.starts_with(|c: char| c.is_ascii_digit()))
        .collect();
    words.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lives_in_home() {
        let home = tempfile::tempdir().unwrap();
        let path = resolve(None, Some(home.path().to_path_buf())).unwrap();
        assert_eq!(path, home.path().join(".db-console_history"));
    }

    #[test]
    fn missing_home_falls_back_to_temp() {
        let path = resolve(None, Some(PathBuf::from("/definitely/not/here"))).unwrap();
        assert_eq!(path, env::temp_dir().join(".db-console_history"));
        assert_eq!(resolve(None, None), Some(path));
    }

    #[test]
    fn env_overrides_or_disables() {
        assert_eq!(resolve(Some("/custom/h".into()), None), Some(PathBuf::from("/custom/h")));
        assert_eq!(resolve(Some(String::new()), None), None);
    }

    #[test]
    fn words_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h");
        fs::write(&path, "select name from users;\nselect email from users where id = 42\n").unwrap();
        let words = history_words(&path);
        assert_eq!(words, vec!["email", "from", "name", "select", "users", "where"]);
        assert!(history_words(&dir.path().join("none")).is_empty());
    }
}
