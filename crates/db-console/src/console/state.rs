use std::path::PathBuf;

use crate::cli::Args;
use crate::core::types::OutputFormat;
use crate::render::RenderOptions;

/// Everything the console remembers between input lines. Created from the
/// command line, changed by meta-commands.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub format: OutputFormat,
    /// Rows per page; 0 disables paging.
    pub page_size: usize,
    pub rid_name: String,
    /// Identity the first page of every paged statement starts after.
    pub start_rid: String,
    /// Identity of the last row seen by the most recent paged statement.
    pub last_rid: String,
    /// Rows in the most recent page.
    pub last_batch: u64,
    pub max_pages: usize,
    pub sample_rows: usize,
    pub binary_field: Option<String>,
    pub export_path: Option<PathBuf>,
    pub debug: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            page_size: 0,
            rid_name: "_ROWID_".to_string(),
            start_rid: "0".to_string(),
            last_rid: "0".to_string(),
            last_batch: 0,
            max_pages: 100_000,
            sample_rows: 1000,
            binary_field: None,
            export_path: None,
            debug: false,
        }
    }
}

impl SessionState {
    pub fn from_args(args: &Args) -> Self {
        let state = Self {
            format: args.output,
            page_size: args.paging,
            rid_name: args.rid_name.clone(),
            start_rid: args.last_rid.clone(),
            last_rid: args.last_rid.clone(),
            last_batch: 0,
            max_pages: args.max_pages.max(1),
            sample_rows: args.sample_rows.max(1),
            binary_field: args.binary_field.clone().filter(|s| !s.is_empty()),
            export_path: args.export_path.clone(),
            debug: args.debug,
        };
        tracing::debug!(
            paging = state.page_size,
            rid_name = %state.rid_name,
            last_rid = %state.start_rid,
            binary_field = ?state.binary_field,
            "session state"
        );
        state
    }

    pub fn render_options(&self, paging: bool) -> RenderOptions {
        RenderOptions {
            paging,
            sample_rows: self.sample_rows,
            binary_field: self.binary_field.clone(),
            rid_name: self.rid_name.clone(),
        }
    }
}
