use std::path::PathBuf;

use thiserror::Error;

/// A statement the backend could not run: malformed SQL, a constraint
/// violation, an interrupted query.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(e: rusqlite::Error) -> Self {
        QueryError::with_cause(e.to_string(), e)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("database not found: {0} (pass --create to create it)")]
    DatabaseNotFound(PathBuf),

    #[error("failed to open database: {path}: {source}")]
    DbOpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("export path not writable: {path}: {source}")]
    ExportPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line editor unavailable: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    #[error("{0}")]
    InvalidCommand(String),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("cannot render row (rid = {rid}): {message}")]
    Render { rid: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Query(e.into())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::DatabaseNotFound(_) => "DB_NOT_FOUND",
            AppError::DbOpenFailed { .. } => "DB_OPEN_FAILED",
            AppError::ExportPath { .. } => "EXPORT_PATH",
            AppError::Readline(_) => "READLINE",
            AppError::InvalidCommand(_) => "INVALID_COMMAND",
            AppError::Query(_) => "QUERY_ERROR",
            AppError::Render { .. } => "RENDER_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Setup failures end the process; everything else is reported and the
    /// session keeps reading input. A bad export path is fatal only at
    /// startup, where any error ends the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::InvalidArgument(_)
                | AppError::DatabaseNotFound(_)
                | AppError::DbOpenFailed { .. }
                | AppError::Readline(_)
                | AppError::Internal(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
