use std::{fmt, sync::Arc};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Text,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        })
    }
}

/// Semantic type of a result column, used for alignment and quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Binary,
    Unknown,
}

impl ColumnKind {
    /// SQLite column affinity rules applied to a declared type.
    pub fn from_decl_type(decl_type: Option<&str>) -> Self {
        let Some(t) = decl_type else { return ColumnKind::Unknown };
        let t = t.to_ascii_uppercase();
        if t.contains("INT") {
            ColumnKind::Numeric
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            ColumnKind::Text
        } else if t.contains("BLOB") || t.is_empty() {
            ColumnKind::Binary
        } else {
            // REAL/FLOA/DOUB and NUMERIC affinity
            ColumnKind::Numeric
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub decl_type: Option<String>,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, decl_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            decl_type: decl_type.map(str::to_string),
            kind: ColumnKind::from_decl_type(decl_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    /// Typed JSON form. `None` when the value has no JSON representation
    /// (non-finite reals).
    pub fn to_json(&self, decode_binary: bool) -> Option<serde_json::Value> {
        let v = match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(x) => serde_json::Value::from(*x),
            Value::Real(x) => serde_json::Value::Number(serde_json::Number::from_f64(*x)?),
            Value::Text(t) if decode_binary => serde_json::Value::String(decode_base64_text(t)),
            Value::Text(t) => serde_json::Value::String(t.clone()),
            Value::Blob(b) if decode_binary => {
                serde_json::Value::String(String::from_utf8_lossy(b).into_owned())
            }
            Value::Blob(b) => serde_json::json!({
                "$type": "blob",
                "base64": BASE64_STANDARD.encode(b),
                "size": b.len()
            }),
        };
        Some(v)
    }

    /// Plain text form used by the fixed-width renderer and as the paging
    /// cursor value.
    pub fn to_plain(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(x) => x.to_string(),
            Value::Real(x) => x.to_string(),
            Value::Text(t) => t.clone(),
            Value::Blob(b) => BASE64_STANDARD.encode(b),
        }
    }
}

fn decode_base64_text(t: &str) -> String {
    match BASE64_STANDARD.decode(t.trim()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(_) => t.to_string(),
        },
        Err(e) => {
            tracing::debug!(error=%e, "value is not base64; keeping it as-is");
            t.to_string()
        }
    }
}

/// One result row. Column lookup by name ignores ASCII case.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .map(|i| &self.values[i])
    }

    /// The value of the identity column, under any of its rowid spellings.
    pub fn identity(&self, rid_name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| crate::core::statement::is_identity_column(&c.name, rid_name))
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Column, &Value)> {
        self.columns.iter().zip(self.values.iter())
    }
}

/// What a single statement produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rows { count: u64 },
    Updated { changes: u64 },
}
