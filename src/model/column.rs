//! Column descriptors and HANA type-name rendering.

use serde::{Deserialize, Serialize};

/// Framework type labels translated to HANA column types.
const TYPE_LABELS: &[(&str, &str)] = &[
    ("STRING", "NVARCHAR(5000)"),
    ("TIMESTAMP", "TIMESTAMP"),
    ("FLOAT", "FLOAT"),
    ("INTEGER", "INTEGER"),
];

const STRING_DATATYPES: &[&str] = &["char", "varchar", "nvarchar", "character varying", "text"];
const NUMBER_DATATYPES: &[&str] = &["decimal", "numeric", "float", "integer", "bigint"];

/// A column as reported by the catalog or declared in a model contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub dtype: String,
    pub char_size: Option<u32>,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.char_size = Some(size);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = Some(scale);
        self
    }

    pub fn is_string(&self) -> bool {
        STRING_DATATYPES.contains(&self.dtype.to_lowercase().as_str())
    }

    pub fn is_numeric(&self) -> bool {
        NUMBER_DATATYPES.contains(&self.dtype.to_lowercase().as_str())
    }

    /// Full type including size / precision, e.g. `NVARCHAR(20)`.
    pub fn data_type(&self) -> String {
        if self.is_string() {
            string_type(&self.dtype, self.char_size)
        } else if self.is_numeric() {
            numeric_type(&self.dtype, self.numeric_precision, self.numeric_scale)
        } else {
            self.dtype.clone()
        }
    }

    /// Translate a framework type label to its HANA equivalent.
    pub fn translate_type(label: &str) -> String {
        TYPE_LABELS
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(label))
            .map(|(_, v)| (*v).to_string())
            .unwrap_or_else(|| label.to_string())
    }
}

pub fn string_type(dtype: &str, size: Option<u32>) -> String {
    match size {
        Some(size) => format!("{dtype}({size})"),
        None => dtype.to_string(),
    }
}

pub fn numeric_type(dtype: &str, precision: Option<u32>, scale: Option<u32>) -> String {
    match (precision, scale) {
        (Some(p), Some(s)) => format!("{dtype}({p},{s})"),
        _ => dtype.to_string(),
    }
}

/// Columns of `from` that have no same-named column (case-insensitive) in `to`.
pub fn missing_columns<'a>(from: &'a [Column], to: &[Column]) -> Vec<&'a Column> {
    let present: hashbrown::HashSet<String> =
        to.iter().map(|c| c.name.to_lowercase()).collect();
    from.iter()
        .filter(|c| !present.contains(&c.name.to_lowercase()))
        .collect()
}
