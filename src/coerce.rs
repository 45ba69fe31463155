//! Value coercion between column types.
//!
//! One pure function decides how a value changes when its column changes
//! type. Cell edits use [`coerce_input`], which applies the same number
//! rule but leaves select input untouched.
//!
//! | target   | rule                                                     |
//! |----------|----------------------------------------------------------|
//! | number   | parse as `f64`, `0` on failure                           |
//! | select   | keep if it is an option label, else first option or ""   |
//! | text     | stringify, null becomes ""                               |

use crate::model::{CellValue, Column, ColumnType, SelectOption};

/// Converts `value` from a column of type `from` to a column of type `to`.
///
/// `options` are the target column's options and are only consulted when
/// `to` is [`ColumnType::Select`].
pub fn coerce(
    value: &CellValue,
    from: ColumnType,
    to: ColumnType,
    options: &[SelectOption],
) -> CellValue {
    // Same-type conversions are identities, except select which re-checks
    // against the (possibly edited) option list.
    if from == to && to != ColumnType::Select {
        return value.clone();
    }
    match to {
        ColumnType::Number => CellValue::Number(parse_number(value)),
        ColumnType::Select => {
            let text = value.to_string();
            if options.iter().any(|o| o.label == text) {
                CellValue::Text(text)
            } else {
                CellValue::Text(
                    options
                        .first()
                        .map(|o| o.label.clone())
                        .unwrap_or_default(),
                )
            }
        }
        ColumnType::Text => CellValue::Text(value.to_string()),
    }
}

/// Applies the cell-edit rule for `column` to raw user input.
///
/// Select input is stored as given: the grid only offers option labels, and
/// nothing re-validates here.
pub fn coerce_input(raw: &str, column: &Column) -> CellValue {
    match column.column_type {
        ColumnType::Number => CellValue::Number(parse_or_zero(raw)),
        ColumnType::Select | ColumnType::Text => CellValue::Text(raw.to_string()),
    }
}

/// Type default used for new rows and for reconciliation gaps.
pub fn default_value(column: &Column) -> CellValue {
    match column.column_type {
        ColumnType::Number => CellValue::Number(0.0),
        ColumnType::Select => CellValue::Text(column.first_option().unwrap_or_default().to_string()),
        ColumnType::Text => CellValue::Text(String::new()),
    }
}

/// Numeric sort key; anything that is not a number reads as 0.
pub fn parse_number(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) => parse_or_zero(s),
        _ => 0.0,
    }
}

fn parse_or_zero(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(labels: &[&str]) -> Vec<SelectOption> {
        labels.iter().map(|l| SelectOption::new(*l, "gray")).collect()
    }

    #[test]
    fn test_to_number() {
        let to = ColumnType::Number;
        assert_eq!(coerce(&"12.5".into(), ColumnType::Text, to, &[]), CellValue::Number(12.5));
        assert_eq!(coerce(&" 7 ".into(), ColumnType::Text, to, &[]), CellValue::Number(7.0));
        assert_eq!(coerce(&"abc".into(), ColumnType::Text, to, &[]), CellValue::Number(0.0));
        assert_eq!(coerce(&"".into(), ColumnType::Text, to, &[]), CellValue::Number(0.0));
        assert_eq!(coerce(&CellValue::Null, ColumnType::Text, to, &[]), CellValue::Number(0.0));
        assert_eq!(coerce(&"inf".into(), ColumnType::Text, to, &[]), CellValue::Number(0.0));
    }

    #[test]
    fn test_select_label_to_number_is_zero() {
        let value = CellValue::from("A");
        let result = coerce(&value, ColumnType::Select, ColumnType::Number, &[]);
        assert_eq!(result, CellValue::Number(0.0));
    }

    #[test]
    fn test_to_select() {
        let opts = options(&["Low", "High"]);
        let to = ColumnType::Select;
        assert_eq!(coerce(&"High".into(), ColumnType::Text, to, &opts), CellValue::from("High"));
        assert_eq!(coerce(&"Medium".into(), ColumnType::Text, to, &opts), CellValue::from("Low"));
        assert_eq!(coerce(&"x".into(), ColumnType::Text, to, &[]), CellValue::from(""));

        let numeric = options(&["1", "2"]);
        assert_eq!(coerce(&CellValue::Number(2.0), ColumnType::Number, to, &numeric), CellValue::from("2"));
    }

    #[test]
    fn test_to_text() {
        let to = ColumnType::Text;
        assert_eq!(coerce(&CellValue::Number(4.0), ColumnType::Number, to, &[]), CellValue::from("4"));
        assert_eq!(coerce(&CellValue::Number(0.5), ColumnType::Number, to, &[]), CellValue::from("0.5"));
        assert_eq!(coerce(&CellValue::Null, ColumnType::Number, to, &[]), CellValue::from(""));
        assert_eq!(coerce(&"Done".into(), ColumnType::Select, to, &[]), CellValue::from("Done"));
    }

    #[test]
    fn test_same_type_is_identity() {
        let value = CellValue::from("12");
        assert_eq!(coerce(&value, ColumnType::Number, ColumnType::Number, &[]), value);
        let opts = options(&["A"]);
        assert_eq!(coerce(&"B".into(), ColumnType::Select, ColumnType::Select, &opts), CellValue::from("A"));
    }

    #[test]
    fn test_coerce_input() {
        let number = Column::new("n", "N", ColumnType::Number);
        assert_eq!(coerce_input("3.25", &number), CellValue::Number(3.25));
        assert_eq!(coerce_input("three", &number), CellValue::Number(0.0));

        let select = Column::new("s", "S", ColumnType::Select).with_options(options(&["A"]));
        assert_eq!(coerce_input("Z", &select), CellValue::from("Z"));

        let text = Column::new("t", "T", ColumnType::Text);
        assert_eq!(coerce_input("  spaced ", &text), CellValue::from("  spaced "));
    }

    #[test]
    fn test_default_value() {
        let select = Column::new("s", "S", ColumnType::Select).with_options(options(&["A", "B"]));
        assert_eq!(default_value(&select), CellValue::from("A"));
        let bare = Column::new("s", "S", ColumnType::Select);
        assert_eq!(default_value(&bare), CellValue::from(""));
        assert_eq!(default_value(&Column::new("n", "N", ColumnType::Number)), CellValue::Number(0.0));
        assert_eq!(default_value(&Column::new("t", "T", ColumnType::Text)), CellValue::from(""));
    }
}
