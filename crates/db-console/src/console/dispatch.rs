//! Recognizes console control input before it is treated as SQL.
//!
//! Rules are tried in order and the first matching pattern decides. A rule
//! whose pattern matches but whose argument is bad yields `InvalidCommand`
//! rather than falling through to the database.

use std::path::PathBuf;

use regex_lite::{Captures, Regex};

use crate::core::types::OutputFormat;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Comment,
    DebugToggle(bool),
    Autocommit(bool),
    OutputFormat(OutputFormat),
    Paging(usize),
    /// Identity the first page of later paged statements starts after.
    StartRid(String),
    ExportTarget(Option<PathBuf>),
    BinaryField(Option<String>),
    Describe(String),
    ListTables,
    Export { pattern: String, dir: PathBuf },
}

type Handler = fn(&Captures<'_>) -> AppResult<MetaCommand>;

const RULES: &[(&str, Handler)] = &[
    (r"^--", |_| Ok(MetaCommand::Comment)),
    (r"^set\s+debug\s+(\S+)$", |c| parse_bool(&c[1]).map(MetaCommand::DebugToggle)),
    (r"^set\s+autocommit\s+(\S+)$", |c| parse_bool(&c[1]).map(MetaCommand::Autocommit)),
    (r"^set\s+output\s+(\S+)$", |c| {
        OutputFormat::parse(&c[1])
            .map(MetaCommand::OutputFormat)
            .ok_or_else(|| AppError::InvalidCommand(format!("unknown output format '{}' (csv, json, text)", &c[1])))
    }),
    (r"^set\s+paging\s+(\S+)$", |c| {
        c[1].parse()
            .map(MetaCommand::Paging)
            .map_err(|_| AppError::InvalidCommand(format!("paging expects a row count, got '{}'", &c[1])))
    }),
    (r"^set\s+offset\s+(\S+)$", |c| Ok(MetaCommand::StartRid(c[1].to_string()))),
    (r"^set\s+export\s+(.+)$", |c| {
        Ok(MetaCommand::ExportTarget(off_or(&c[1]).map(PathBuf::from)))
    }),
    (r"^set\s+binary\s+(\S+)$", |c| Ok(MetaCommand::BinaryField(off_or(&c[1])))),
    (r"^(?:describe|desc|info)\s+(?:table|class|index)\s+(\S+)$", |c| {
        Ok(MetaCommand::Describe(c[1].to_string()))
    }),
    (r"^list\s+(?:tables|classes)$", |_| Ok(MetaCommand::ListTables)),
    (r"^export\s+(\S+)\s+to\s+(.+)$", |c| {
        Ok(MetaCommand::Export {
            pattern: c[1].to_string(),
            dir: PathBuf::from(&c[2]),
        })
    }),
];

pub struct Dispatcher {
    rules: Vec<(Regex, Handler)>,
}

impl Dispatcher {
    pub fn new() -> AppResult<Self> {
        let rules = RULES
            .iter()
            .map(|(pattern, handler)| {
                Regex::new(&format!("(?i){pattern}"))
                    .map(|re| (re, *handler))
                    .map_err(|e| AppError::Internal(format!("bad command pattern {pattern}: {e}")))
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// `Ok(None)` when `line` is not a meta-command.
    pub fn dispatch(&self, line: &str) -> AppResult<Option<MetaCommand>> {
        let line = line.trim().trim_end_matches(';').trim_end();
        for (re, handler) in &self.rules {
            if let Some(caps) = re.captures(line) {
                let cmd = handler(&caps)?;
                tracing::debug!(?cmd, "meta-command");
                return Ok(Some(cmd));
            }
        }
        Ok(None)
    }
}

fn parse_bool(s: &str) -> AppResult<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "on" => Ok(true),
        "false" | "off" => Ok(false),
        _ => Err(AppError::InvalidCommand(format!("expected true or false, got '{s}'"))),
    }
}

fn off_or(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.eq_ignore_ascii_case("off")).then(|| s.to_string())
}
