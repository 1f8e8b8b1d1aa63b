use std::path::PathBuf;

use clap::Parser;

use crate::core::types::OutputFormat;

#[derive(Parser, Debug, Clone)]
#[command(name = "db-console", version, about = "Interactive SQL console with transparent result paging")]
pub struct Args {
    /// Database file to open (`:memory:` for a scratch database).
    pub database: PathBuf,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, env = "DB_CONSOLE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Start with debug logging enabled (same as `set debug true`).
    #[arg(long, env = "DB_CONSOLE_DEBUG")]
    pub debug: bool,

    /// Output format for query results.
    #[arg(long, value_enum, env = "DB_CONSOLE_OUTPUT", default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Page size for SELECT statements; 0 disables paging.
    #[arg(long, env = "DB_CONSOLE_PAGING", default_value_t = 0)]
    pub paging: usize,

    /// Column used as the paging cursor. Must impose a total order.
    #[arg(long, env = "DB_CONSOLE_RID_NAME", default_value = "_ROWID_")]
    pub rid_name: String,

    /// Identity the first page starts after.
    #[arg(long, env = "DB_CONSOLE_LAST_RID", default_value = "0")]
    pub last_rid: String,

    /// Upper bound on pages fetched for one statement.
    #[arg(long, env = "DB_CONSOLE_MAX_PAGES", default_value_t = 100_000)]
    pub max_pages: usize,

    /// Rows sampled to size columns in text output.
    #[arg(long, env = "DB_CONSOLE_SAMPLE_ROWS", default_value_t = 1000)]
    pub sample_rows: usize,

    /// Column whose binary/base64 content is decoded to UTF-8 text in JSON output.
    #[arg(long, env = "DB_CONSOLE_BINARY_FIELD")]
    pub binary_field: Option<String>,

    /// Append rendered results to this file instead of stdout.
    #[arg(long, env = "DB_CONSOLE_EXPORT_PATH")]
    pub export_path: Option<PathBuf>,

    /// Start inside a transaction instead of autocommit mode.
    #[arg(long)]
    pub no_autocommit: bool,

    /// Open the database read-only.
    #[arg(long)]
    pub read_only: bool,

    /// Create the database file if it does not exist.
    #[arg(long)]
    pub create: bool,

    /// How long to wait on a locked database before failing a statement.
    #[arg(long, default_value_t = 2_000)]
    pub busy_timeout_ms: u64,

    /// Run one input line (statements or a meta-command) and exit.
    #[arg(short = 'c', long)]
    pub command: Option<String>,
}
