//! Client-side sorting of loaded rows.
//!
//! Clicking a column header cycles ascending, descending, cleared. A click
//! on another column always starts over at ascending. Clearing restores
//! identifier order. Nothing here is persisted.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::coerce::parse_number;
use crate::model::{CellValue, Column, ColumnId, ColumnType, Row};

/// Sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Active sort of a table view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub column: ColumnId,
    pub direction: SortDirection,
}

/// Next state after a click on `column`'s header.
pub fn next_state(current: Option<&SortState>, column: &ColumnId) -> Option<SortState> {
    match current {
        Some(state) if &state.column == column => match state.direction {
            SortDirection::Ascending => Some(SortState {
                column: column.clone(),
                direction: SortDirection::Descending,
            }),
            SortDirection::Descending => None,
        },
        _ => Some(SortState {
            column: column.clone(),
            direction: SortDirection::Ascending,
        }),
    }
}

/// Stable sort of `rows` by `column`.
pub fn sort_rows(rows: &mut [Row], column: &Column, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ord = compare_cells(
            a.values.get(&column.id),
            b.values.get(&column.id),
            column.column_type,
        );
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Restores identifier order.
pub fn identifier_order(rows: &mut [Row]) {
    rows.sort_by_key(|r| r.id);
}

/// Ascending comparison of two cells of a column of type `column_type`.
///
/// Numbers compare numerically with missing values as 0. Everything else
/// compares as text; missing or null cells come first.
pub fn compare_cells(a: Option<&CellValue>, b: Option<&CellValue>, column_type: ColumnType) -> Ordering {
    if column_type == ColumnType::Number {
        let x = a.map(parse_number).unwrap_or(0.0);
        let y = b.map(parse_number).unwrap_or(0.0);
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }

    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => locale_cmp(&x.to_string(), &y.to_string()),
    }
}

/// Collation-style text ordering in three levels.
///
/// Base letters decide first, ignoring accents and case ("éclair" sorts
/// with "e"). Ties are broken by accents (unaccented first), then by case
/// (lowercase first).
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(&base_letters(b))
        .then_with(|| with_accents(a).cmp(&with_accents(b)))
        .then_with(|| b.cmp(a))
}

/// Lowercased canonical decomposition with combining marks removed.
fn base_letters(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn with_accents(text: &str) -> String {
    text.nfd().flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RowId, Values};

    fn row(id: u64, column: &str, value: Option<CellValue>) -> Row {
        let mut values = Values::new();
        if let Some(v) = value {
            values.insert(column.into(), v);
        }
        Row::new(RowId::new(id), values)
    }

    fn ids(rows: &[Row]) -> Vec<u64> {
        rows.iter().map(|r| r.id.as_u64()).collect()
    }

    #[test]
    fn test_toggle_cycle() {
        let x: ColumnId = "x".into();
        let y: ColumnId = "y".into();

        let first = next_state(None, &x);
        assert_eq!(first.as_ref().map(|s| s.direction), Some(SortDirection::Ascending));

        let second = next_state(first.as_ref(), &x);
        assert_eq!(second.as_ref().map(|s| s.direction), Some(SortDirection::Descending));

        let third = next_state(second.as_ref(), &x);
        assert_eq!(third, None);

        let other = next_state(second.as_ref(), &y);
        assert_eq!(
            other,
            Some(SortState {
                column: y,
                direction: SortDirection::Ascending
            })
        );
    }

    #[test]
    fn test_numeric_sort_missing_is_zero() {
        let column = Column::new("n", "N", ColumnType::Number);
        let mut rows = vec![
            row(1, "n", Some(5.0.into())),
            row(2, "n", None),
            row(3, "n", Some((-1.0).into())),
            row(4, "n", Some("2".into())),
        ];
        sort_rows(&mut rows, &column, SortDirection::Ascending);
        assert_eq!(ids(&rows), vec![3, 2, 4, 1]);

        sort_rows(&mut rows, &column, SortDirection::Descending);
        assert_eq!(ids(&rows), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_text_sort_nulls_first_then_last() {
        let column = Column::new("t", "T", ColumnType::Text);
        let mut rows = vec![
            row(1, "t", Some("banana".into())),
            row(2, "t", None),
            row(3, "t", Some("Apple".into())),
            row(4, "t", Some(CellValue::Null)),
            row(5, "t", Some("cherry".into())),
        ];
        sort_rows(&mut rows, &column, SortDirection::Ascending);
        assert_eq!(ids(&rows), vec![2, 4, 3, 1, 5]);

        sort_rows(&mut rows, &column, SortDirection::Descending);
        assert_eq!(ids(&rows), vec![5, 1, 3, 2, 4]);

        identifier_order(&mut rows);
        assert_eq!(ids(&rows), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_locale_cmp() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_accented_letters_sort_with_their_base() {
        assert_eq!(locale_cmp("éclair", "zebra"), Ordering::Less);
        assert_eq!(locale_cmp("Ábaco", "banana"), Ordering::Less);
        assert_eq!(locale_cmp("eclair", "éclair"), Ordering::Less);
        assert_eq!(locale_cmp("Öl", "Ol"), Ordering::Greater);

        let column = Column::new("t", "T", ColumnType::Text);
        let mut rows = vec![
            row(1, "t", Some("zebra".into())),
            row(2, "t", Some("éclair".into())),
            row(3, "t", Some("banana".into())),
            row(4, "t", Some("Ábaco".into())),
        ];
        sort_rows(&mut rows, &column, SortDirection::Ascending);
        assert_eq!(ids(&rows), vec![4, 3, 2, 1]);
    }
}
