//! Row renderers. A renderer lives for one statement and sees every page of
//! it: `begin_page`, the page's rows, `end_page`, repeated, then `finish`.

mod fixed;
mod json;

use std::io::Write;

pub use fixed::{CellStyle, FixedWidthRenderer};
pub use json::JsonRenderer;

use crate::core::types::{Column, OutputFormat, Row};
use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Output is one page of several; JSON drops its array brackets.
    pub paging: bool,
    /// Rows buffered to size text columns.
    pub sample_rows: usize,
    /// Column whose content is decoded to UTF-8 text in JSON output.
    pub binary_field: Option<String>,
    /// Identity column, quoted in per-row diagnostics.
    pub rid_name: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            paging: false,
            sample_rows: 1000,
            binary_field: None,
            rid_name: "_ROWID_".to_string(),
        }
    }
}

pub trait RowRenderer {
    fn begin_page(&mut self, columns: &[Column], out: &mut dyn Write) -> AppResult<()>;

    /// Renders one row. A `Render` error means nothing was written for it.
    fn row(&mut self, row: &Row, out: &mut dyn Write) -> AppResult<()>;

    fn end_page(&mut self, out: &mut dyn Write) -> AppResult<()>;

    fn finish(&mut self, out: &mut dyn Write) -> AppResult<()>;
}

pub fn renderer_for(format: OutputFormat, opts: RenderOptions) -> Box<dyn RowRenderer> {
    match format {
        OutputFormat::Json => Box::new(JsonRenderer::new(opts)),
        OutputFormat::Text => Box::new(FixedWidthRenderer::new(CellStyle::Padded, opts.sample_rows)),
        OutputFormat::Csv => Box::new(FixedWidthRenderer::new(CellStyle::Csv, opts.sample_rows)),
    }
}

/// Identity of `row` for diagnostics, or `?` when it has none.
pub(crate) fn row_identity(row: &Row, rid_name: &str) -> String {
    row.identity(rid_name)
        .map(|v| v.to_plain())
        .unwrap_or_else(|| "?".to_string())
}
