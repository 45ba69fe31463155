//! Table data model
//!
//! # Overview
//!
//! A table is split in two independently persisted halves:
//! ```text
//! Table (name → TableHandle)
//!   ├─→ Columns (ordered: id, label, type, options, width)
//!   └─→ Rows (RowId → Values document keyed by column id)
//! ```
//!
//! Column order is display and tab order. Row documents are opaque to the
//! stores; only the controller interprets them against the column list.

mod value;

pub use value::CellValue;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::coerce;

/// Stable identifier of a column within one table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ColumnId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Row identifier assigned by the row store.
///
/// Stores hand these out in increasing order, so sorting by `RowId` is the
/// table's identifier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of a table entry in the schema store.
///
/// A 128-bit UUID created once per table name by `SchemaStore::create_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableHandle(Uuid);

impl TableHandle {
    /// Creates a new random handle using UUIDv4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TableHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Select,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Select => "select",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for ColumnType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ColumnType::Text),
            "number" => Ok(ColumnType::Number),
            "select" => Ok(ColumnType::Select),
            other => Err(crate::error::Error::InvalidArgument(format!(
                "Unknown column type '{}'",
                other
            ))),
        }
    }
}

/// One choice of a select column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub color: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Column definition.
///
/// Stored as JSON in the schema store:
/// ```json
/// {
///   "id": "status",
///   "label": "Status",
///   "type": "select",
///   "options": [{"label": "Done", "color": "green"}],
///   "width": 150
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Only meaningful for select columns. Labels are unique.
    #[serde(default)]
    pub options: Vec<SelectOption>,
    /// Display width in pixels.
    pub width: u32,
}

impl Column {
    pub fn new(id: impl Into<ColumnId>, label: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            column_type,
            options: Vec::new(),
            width: 150,
        }
    }

    /// Sets the width (builder pattern).
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Sets the select options (builder pattern).
    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| o.label == label)
    }

    pub fn first_option(&self) -> Option<&str> {
        self.options.first().map(|o| o.label.as_str())
    }
}

/// A row's value document, keyed by column id.
pub type Values = BTreeMap<ColumnId, CellValue>;

/// A row as held by the row store and the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    #[serde(default)]
    pub values: Values,
}

impl Row {
    pub fn new(id: RowId, values: Values) -> Self {
        Self { id, values }
    }
}

/// The aggregate a controller operates on.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    /// Schema store handle, known once the schema has been read or created.
    pub handle: Option<TableHandle>,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| &c.id == id)
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn row_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.id == id)
    }

    /// Cell value; absent keys read as `Null`.
    pub fn cell(&self, row: RowId, column: &ColumnId) -> CellValue {
        self.row(row)
            .and_then(|r| r.values.get(column))
            .cloned()
            .unwrap_or_default()
    }

    /// Cell text as rendered in the grid (absent renders empty).
    pub fn display_value(&self, row: RowId, column: &ColumnId) -> String {
        self.cell(row, column).to_string()
    }

    pub fn has_column_id(&self, id: &str) -> bool {
        self.columns.iter().any(|c| c.id.as_str() == id)
    }
}

/// Reconciles a row document to the current column list.
///
/// The result holds exactly the ids in `columns`: keys of removed columns
/// are dropped and missing keys get the column type's default.
pub fn reconcile(values: &Values, columns: &[Column]) -> Values {
    columns
        .iter()
        .map(|column| {
            let value = values
                .get(&column.id)
                .cloned()
                .unwrap_or_else(|| coerce::default_value(column));
            (column.id.clone(), value)
        })
        .collect()
}

/// Projects a loaded document over the column list without filling gaps.
///
/// Keys of unknown columns are dropped; absent keys stay absent and render
/// as empty.
pub fn project(values: Values, columns: &[Column]) -> Values {
    values
        .into_iter()
        .filter(|(id, _)| columns.iter().any(|c| &c.id == id))
        .collect()
}

/// The three columns seeded the first time a table name is accessed.
pub fn default_columns() -> Vec<Column> {
    vec![
        Column::new("name", "Name", ColumnType::Text).with_width(200),
        Column::new("notes", "Notes", ColumnType::Text).with_width(300),
        Column::new("status", "Status", ColumnType::Select)
            .with_width(150)
            .with_options(vec![
                SelectOption::new("Not started", "gray"),
                SelectOption::new("In progress", "blue"),
                SelectOption::new("Done", "green"),
            ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_json_shape() {
        let column = Column::new("qty", "Quantity", ColumnType::Number).with_width(90);
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "qty",
                "label": "Quantity",
                "type": "number",
                "options": [],
                "width": 90
            })
        );
    }

    #[test]
    fn test_column_type_parse() {
        assert_eq!("Number".parse::<ColumnType>().unwrap(), ColumnType::Number);
        assert_eq!("select".parse::<ColumnType>().unwrap(), ColumnType::Select);
        assert!("date".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_default_columns() {
        let columns = default_columns();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].column_type, ColumnType::Text);
        assert_eq!(columns[1].column_type, ColumnType::Text);
        assert_eq!(columns[2].column_type, ColumnType::Select);
        assert_eq!(columns[2].options.len(), 3);
        assert_eq!(columns[2].first_option(), Some("Not started"));
    }

    #[test]
    fn test_reconcile_drops_and_fills() {
        let columns = vec![
            Column::new("a", "A", ColumnType::Text),
            Column::new("n", "N", ColumnType::Number),
        ];
        let mut values = Values::new();
        values.insert("a".into(), CellValue::from("keep"));
        values.insert("gone".into(), CellValue::from("stale"));

        let reconciled = reconcile(&values, &columns);
        assert_eq!(reconciled.len(), 2);
        assert_eq!(reconciled[&ColumnId::from("a")], CellValue::from("keep"));
        assert_eq!(reconciled[&ColumnId::from("n")], CellValue::Number(0.0));
        assert!(!reconciled.contains_key(&ColumnId::from("gone")));
    }

    #[test]
    fn test_project_keeps_gaps() {
        let columns = vec![Column::new("a", "A", ColumnType::Text)];
        let mut values = Values::new();
        values.insert("x".into(), CellValue::from(1.0));

        let projected = project(values, &columns);
        assert!(projected.is_empty());
    }

    #[test]
    fn test_table_cell_absent_renders_empty() {
        let mut table = Table::empty("t");
        table.columns = default_columns();
        table.rows.push(Row::new(RowId::new(1), Values::new()));

        assert_eq!(table.cell(RowId::new(1), &"name".into()), CellValue::Null);
        assert_eq!(table.display_value(RowId::new(1), &"name".into()), "");
        assert_eq!(table.column_index(&"status".into()), Some(2));
    }
}
