//! CellValue - the JSON-like value stored under one column of a row.
//!
//! A row document maps column ids to cell values. The value shape is not
//! tied to the column type: the column's declared type is applied when a
//! value is read, edited or retyped (see [`crate::coerce`]).
//!
//! # Example
//!
//! ```rust
//! use lynxky::CellValue;
//!
//! let empty = CellValue::Null;
//! let qty = CellValue::from(3.5);
//! let name = CellValue::from("Alice");
//!
//! assert_eq!(empty.to_string(), "");
//! assert_eq!(qty.to_string(), "3.5");
//! assert_eq!(name.as_text(), Some("Alice"));
//! ```

use serde::{Deserialize, Serialize};

/// A single cell value, serialized as plain JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Get as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// True for null and for empty text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

// Conversions
impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(b),
            serde_json::Value::Number(n) => CellValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => CellValue::Text(s),
            // Nested documents are not cell values; keep their JSON text.
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<CellValue> for serde_json::Value {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Bool(b) => serde_json::Value::Bool(b),
            CellValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::Number(0.into())),
            CellValue::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// Renders the value the way a grid cell shows it. Null is empty.
impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(-2.25).to_string(), "-2.25");
        assert_eq!(CellValue::Bool(true).to_string(), "true");
        assert_eq!(CellValue::from("x").to_string(), "x");
    }

    #[test]
    fn test_untagged_json() {
        let parsed: Vec<CellValue> = serde_json::from_str(r#"[null, true, 4, "four"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                CellValue::Null,
                CellValue::Bool(true),
                CellValue::Number(4.0),
                CellValue::Text("four".to_string()),
            ]
        );

        let json = serde_json::to_string(&CellValue::Number(1.5)).unwrap();
        assert_eq!(json, "1.5");
    }

    #[test]
    fn test_json_value_conversion() {
        let value = CellValue::from(serde_json::json!({"a": 1}));
        assert_eq!(value, CellValue::Text(r#"{"a":1}"#.to_string()));

        let back: serde_json::Value = CellValue::Number(f64::NAN).into();
        assert_eq!(back, serde_json::json!(0));
    }

    #[test]
    fn test_blank() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::from("").is_blank());
        assert!(!CellValue::from(0.0).is_blank());
    }
}
