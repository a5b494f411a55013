/// LiveGrid Column Implementation
///
/// A Column declares the type of every cell stored under it. A cell holds a
/// single `CellValue`, a tagged value slot, so there is never any doubt about
/// which kind of value a cell carries.
///
/// # Defaults
///
/// New cells start out with the default for their column type: an empty string
/// for text columns and `Null` for number columns.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TableId = String;
pub type ColumnId = String;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Free text. Stored views also spell this "string".
    #[serde(alias = "string")]
    Text,
    Number,
}

impl ColumnType {
    pub fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Ok(ColumnType::Text),
            "number" | "int" => Ok(ColumnType::Number),
            _ => Err(format!("Unknown column type '{}'. Use 'text' or 'number'.", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value slot of a single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    /// Default value for a freshly created cell of the given column type
    pub fn default_for(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Text => CellValue::Text(String::new()),
            ColumnType::Number => CellValue::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this value may live in a column of the given type.
    /// `Null` is only a valid number value; text cells default to "".
    pub fn fits(&self, column_type: ColumnType) -> bool {
        matches!(
            (self, column_type),
            (CellValue::Text(_), ColumnType::Text)
                | (CellValue::Number(_), ColumnType::Number)
                | (CellValue::Null, ColumnType::Number)
        )
    }

    /// Convert a caller-supplied value into the slot for `column_type`.
    ///
    /// Numbers written to a text column are rendered as text. Text written to
    /// a number column must parse as a finite number; blank text clears it.
    pub fn coerce(input: CellInput, column_type: ColumnType) -> Result<Self> {
        match (column_type, input) {
            (ColumnType::Text, CellInput::Text(s)) => Ok(CellValue::Text(s)),
            (ColumnType::Text, CellInput::Number(n)) => Ok(CellValue::Text(format_number(n))),
            (ColumnType::Text, CellInput::Null) => Ok(CellValue::Text(String::new())),
            (ColumnType::Number, CellInput::Number(n)) => {
                if n.is_finite() {
                    Ok(CellValue::Number(n))
                } else {
                    Err(EngineError::InvalidValue(format!("{} is not a finite number", n)))
                }
            }
            (ColumnType::Number, CellInput::Text(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(CellValue::Null);
                }
                match parse_number(trimmed) {
                    Some(n) => Ok(CellValue::Number(n)),
                    None => Err(EngineError::InvalidValue(format!(
                        "'{}' is not a number",
                        s
                    ))),
                }
            }
            (ColumnType::Number, CellInput::Null) => Ok(CellValue::Null),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Null => Ok(()),
        }
    }
}

/// A value as it arrives on a cell update request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellInput {
    Number(f64),
    Text(String),
    Null,
}

impl From<&str> for CellInput {
    fn from(s: &str) -> Self {
        CellInput::Text(s.to_string())
    }
}

impl From<String> for CellInput {
    fn from(s: String) -> Self {
        CellInput::Text(s)
    }
}

impl From<f64> for CellInput {
    fn from(n: f64) -> Self {
        CellInput::Number(n)
    }
}

impl From<i64> for CellInput {
    fn from(n: i64) -> Self {
        CellInput::Number(n as f64)
    }
}

/// Parse a number the way user-entered filter and search values are parsed.
/// Returns None for anything that is not a finite number.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Display priority of a column. Each table has one primary column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPriority {
    Primary,
    Secondary,
}

/// A typed column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub table_id: TableId,
    /// Unique within the table
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub display_order: u32,
    pub priority: ColumnPriority,
}

impl Column {
    pub fn default_value(&self) -> CellValue {
        CellValue::default_for(self.column_type)
    }
}

/// Caller-supplied description of a column to add
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub id: ColumnId,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl NewColumn {
    pub fn new(id: impl Into<String>, name: impl Into<String>, column_type: ColumnType) -> Self {
        NewColumn {
            id: id.into(),
            name: name.into(),
            column_type,
        }
    }

    pub fn text(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, ColumnType::Text)
    }

    pub fn number(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, ColumnType::Number)
    }
}
