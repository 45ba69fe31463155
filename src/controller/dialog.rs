//! Draft state of the "change column type" dialog.
//!
//! The draft lives only in the controller until it is saved. Nothing here
//! touches a store.

use crate::model::{Column, ColumnId, ColumnType, SelectOption};

/// Why a draft edit was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    Empty,
    Duplicate(String),
    NotFound(String),
}

/// Pending type and options for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeChangeDialog {
    pub column_id: ColumnId,
    pub column_type: ColumnType,
    pub options: Vec<SelectOption>,
    /// Text of the "add option" input.
    pub new_option: String,
}

impl TypeChangeDialog {
    /// Starts a draft from the column's current definition.
    pub fn for_column(column: &Column) -> Self {
        Self {
            column_id: column.id.clone(),
            column_type: column.column_type,
            options: column.options.clone(),
            new_option: String::new(),
        }
    }

    /// Adds the trimmed "add option" text with `color` and clears the input.
    pub fn add_option(&mut self, color: String) -> Result<&SelectOption, OptionError> {
        let label = self.new_option.trim();
        if label.is_empty() {
            return Err(OptionError::Empty);
        }
        if self.options.iter().any(|o| o.label == label) {
            return Err(OptionError::Duplicate(label.to_string()));
        }
        let option = SelectOption::new(label, color);
        self.options.push(option);
        self.new_option.clear();
        Ok(&self.options[self.options.len() - 1])
    }

    pub fn remove_option(&mut self, label: &str) -> Result<SelectOption, OptionError> {
        let index = self
            .options
            .iter()
            .position(|o| o.label == label)
            .ok_or_else(|| OptionError::NotFound(label.to_string()))?;
        Ok(self.options.remove(index))
    }

    pub fn set_color(&mut self, label: &str, color: impl Into<String>) -> Result<(), OptionError> {
        let option = self
            .options
            .iter_mut()
            .find(|o| o.label == label)
            .ok_or_else(|| OptionError::NotFound(label.to_string()))?;
        option.color = color.into();
        Ok(())
    }

    /// The column as it would look after saving.
    pub fn apply_to(&self, column: &Column) -> Column {
        Column {
            column_type: self.column_type,
            options: self.options.clone(),
            ..column.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_column() -> Column {
        Column::new("status", "Status", ColumnType::Select)
            .with_options(vec![SelectOption::new("A", "gray")])
    }

    #[test]
    fn test_add_option_trims_and_clears_input() {
        let mut dialog = TypeChangeDialog::for_column(&status_column());
        dialog.new_option = "  B ".to_string();

        let added = dialog.add_option("blue".to_string()).unwrap().clone();
        assert_eq!(added, SelectOption::new("B", "blue"));
        assert!(dialog.new_option.is_empty());
        assert_eq!(dialog.options.len(), 2);
    }

    #[test]
    fn test_add_option_rejects_empty_and_duplicate() {
        let mut dialog = TypeChangeDialog::for_column(&status_column());
        dialog.new_option = "   ".to_string();
        assert_eq!(dialog.add_option("red".to_string()), Err(OptionError::Empty));

        dialog.new_option = "A".to_string();
        assert_eq!(
            dialog.add_option("red".to_string()),
            Err(OptionError::Duplicate("A".to_string()))
        );
        assert_eq!(dialog.options.len(), 1);
        assert_eq!(dialog.new_option, "A");
    }

    #[test]
    fn test_remove_and_recolor() {
        let mut dialog = TypeChangeDialog::for_column(&status_column());
        assert!(dialog.set_color("A", "green").is_ok());
        assert_eq!(dialog.options[0].color, "green");
        assert_eq!(
            dialog.set_color("Z", "green"),
            Err(OptionError::NotFound("Z".to_string()))
        );

        let removed = dialog.remove_option("A").unwrap();
        assert_eq!(removed.label, "A");
        assert!(dialog.options.is_empty());
    }

    #[test]
    fn test_apply_keeps_identity_fields() {
        let column = status_column().with_width(220);
        let mut dialog = TypeChangeDialog::for_column(&column);
        dialog.column_type = ColumnType::Number;

        let applied = dialog.apply_to(&column);
        assert_eq!(applied.id, column.id);
        assert_eq!(applied.label, "Status");
        assert_eq!(applied.width, 220);
        assert_eq!(applied.column_type, ColumnType::Number);
    }
}
