use std::io::Write;

use super::RowRenderer;
use crate::core::types::{Column, ColumnKind, Row, Value};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    /// Column-aligned text; widths come from the first `sample_rows` rows.
    Padded,
    /// Same cells, unpadded, quotes doubled.
    Csv,
}

/// Fixed-width text output.
///
/// The first `sample_rows` rows of the statement (across pages) are buffered
/// to measure each column; the header and those rows are then written and
/// every later row reuses the measured widths. A later value wider than its
/// column is written in full and shifts the rest of that line.
pub struct FixedWidthRenderer {
    style: CellStyle,
    sample_rows: usize,
    header: Option<Vec<String>>,
    right_align: Vec<bool>,
    widths: Option<Vec<usize>>,
    pending: Vec<Vec<String>>,
}

impl FixedWidthRenderer {
    pub fn new(style: CellStyle, sample_rows: usize) -> Self {
        Self {
            style,
            sample_rows: sample_rows.max(1),
            header: None,
            right_align: Vec::new(),
            widths: None,
            pending: Vec::new(),
        }
    }

    fn cell(&self, v: &Value) -> String {
        match (self.style, v) {
            (CellStyle::Csv, Value::Null) => String::new(),
            (_, Value::Null | Value::Integer(_) | Value::Real(_) | Value::Bool(_)) => v.to_plain(),
            (CellStyle::Padded, _) => format!("\"{}\"", v.to_plain().replace('"', "\\\"")),
            (CellStyle::Csv, _) => format!("\"{}\"", v.to_plain().replace('"', "\"\"")),
        }
    }

    fn measure(&mut self) {
        let Some(header) = &self.header else { return };
        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for cells in &self.pending {
            for (w, c) in widths.iter_mut().zip(cells) {
                *w = (*w).max(c.chars().count());
            }
        }
        self.widths = Some(widths);
    }

    fn line(&self, cells: &[String]) -> String {
        if self.style == CellStyle::Csv {
            return cells.join(",");
        }
        let widths = self.widths.as_deref().unwrap_or(&[]);
        let last = cells.len().saturating_sub(1);
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            let w = widths.get(i).copied().unwrap_or(0);
            let right = self.right_align.get(i).copied().unwrap_or(false);
            let part = match (i == last, right) {
                (false, false) => format!("{:<width$} ", format!("{cell},"), width = w + 1),
                (false, true) => format!("{cell:>w$}, "),
                (true, false) => cell.clone(),
                (true, true) => format!("{cell:>w$}"),
            };
            line.push_str(&part);
        }
        line.trim_end().to_string()
    }

    fn flush_sample(&mut self, out: &mut dyn Write) -> AppResult<()> {
        if self.widths.is_some() {
            return Ok(());
        }
        self.measure();
        if let Some(header) = &self.header {
            writeln!(out, "{}", self.line(header))?;
        }
        for cells in std::mem::take(&mut self.pending) {
            writeln!(out, "{}", self.line(&cells))?;
        }
        out.flush()?;
        Ok(())
    }
}

impl RowRenderer for FixedWidthRenderer {
    fn begin_page(&mut self, columns: &[Column], _out: &mut dyn Write) -> AppResult<()> {
        if self.header.is_none() {
            self.header = Some(columns.iter().map(|c| c.name.clone()).collect());
            self.right_align = columns.iter().map(|c| c.kind == ColumnKind::Numeric).collect();
        }
        Ok(())
    }

    fn row(&mut self, row: &Row, out: &mut dyn Write) -> AppResult<()> {
        let cells: Vec<String> = row.values().iter().map(|v| self.cell(v)).collect();
        if self.widths.is_none() && self.style == CellStyle::Padded {
            self.pending.push(cells);
            if self.pending.len() >= self.sample_rows {
                self.flush_sample(out)?;
            }
            return Ok(());
        }
        if self.widths.is_none() {
            self.flush_sample(out)?;
        }
        writeln!(out, "{}", self.line(&cells))?;
        Ok(())
    }

    fn end_page(&mut self, out: &mut dyn Write) -> AppResult<()> {
        if self.style == CellStyle::Csv {
            self.flush_sample(out)?;
        }
        out.flush()?;
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> AppResult<()> {
        self.flush_sample(out)
    }
}
