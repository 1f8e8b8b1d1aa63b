use std::io::Write;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{row_identity, RenderOptions, RowRenderer};
use crate::core::types::{Column, Row};
use crate::error::{AppError, AppResult};

/// Streams rows as flat JSON objects in column order.
///
/// Unpaged output is one array. Paged output is, per page, the page's objects
/// separated by `,` with no brackets: a consumer that joins the non-empty
/// pages with `,` and wraps the whole in `[`..`]` gets a valid array.
pub struct JsonRenderer {
    opts: RenderOptions,
    decode_col: Option<usize>,
    page_rows: u64,
    total_rows: u64,
    opened: bool,
}

impl JsonRenderer {
    pub fn new(opts: RenderOptions) -> Self {
        Self {
            opts,
            decode_col: None,
            page_rows: 0,
            total_rows: 0,
            opened: false,
        }
    }
}

struct JsonRow<'a> {
    columns: &'a [Column],
    values: Vec<serde_json::Value>,
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.values.len()))?;
        for (c, v) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(&c.name, v)?;
        }
        map.end()
    }
}

impl RowRenderer for JsonRenderer {
    fn begin_page(&mut self, columns: &[Column], out: &mut dyn Write) -> AppResult<()> {
        self.page_rows = 0;
        self.decode_col = self
            .opts
            .binary_field
            .as_deref()
            .and_then(|f| columns.iter().position(|c| c.name.eq_ignore_ascii_case(f)));
        if !self.opts.paging && !self.opened {
            out.write_all(b"[\n")?;
            self.opened = true;
        }
        Ok(())
    }

    fn row(&mut self, row: &Row, out: &mut dyn Write) -> AppResult<()> {
        let mut values = Vec::with_capacity(row.values().len());
        for (i, (col, v)) in row.iter().enumerate() {
            let json = v.to_json(self.decode_col == Some(i)).ok_or_else(|| AppError::Render {
                rid: row_identity(row, &self.opts.rid_name),
                message: format!("column {} holds {:?}, which JSON cannot represent", col.name, v),
            })?;
            values.push(json);
        }

        let first = if self.opts.paging {
            self.page_rows == 0
        } else {
            self.total_rows == 0
        };
        if !first {
            out.write_all(b",\n")?;
        }
        if !self.opts.paging {
            out.write_all(b"  ")?;
        }
        serde_json::to_writer(
            &mut *out,
            &JsonRow {
                columns: row.columns(),
                values,
            },
        )?;
        out.flush()?;
        self.page_rows += 1;
        self.total_rows += 1;
        Ok(())
    }

    fn end_page(&mut self, out: &mut dyn Write) -> AppResult<()> {
        if self.opts.paging && self.page_rows > 0 {
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> AppResult<()> {
        if self.opened {
            if self.total_rows > 0 {
                out.write_all(b"\n")?;
            }
            out.write_all(b"]\n")?;
        }
        out.flush()?;
        Ok(())
    }
}
