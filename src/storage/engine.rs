//! Schema and row store traits.
//!
//! The controller never talks to a database directly. It consumes two
//! persistence boundaries, both reachable by table name:
//!
//! ```text
//! SchemaStore: name → TableHandle → ordered Vec<Column>
//! RowStore:    name → RowId → Values (opaque document)
//! ```
//!
//! Schema and rows are written separately and never inside one
//! transaction. A column-list replace followed by a row backfill can be
//! interrupted in between, leaving rows with a missing or a stale key.
//! Readers tolerate both: absent keys render empty and unknown keys are
//! dropped the next time the row is written.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Column, Row, RowId, TableHandle, Values};

/// Schema of one table as returned by [`SchemaStore::get_columns`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub handle: TableHandle,
    pub name: String,
    pub columns: Vec<Column>,
}

/// Durable storage of one ordered column list per table name.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Reads the column list for `table`.
    ///
    /// # Returns
    ///
    /// `Some(TableSchema)` if the table entry exists, `None` otherwise.
    /// An existing entry may carry an empty column list.
    async fn get_columns(&self, table: &str) -> Result<Option<TableSchema>>;

    /// Creates the table entry for `table`.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyExists` if an entry with that name exists. Callers
    ///   must read first and only create on `None`.
    /// - `Error::InvalidArgument` for names rejected by [`validate_name`].
    async fn create_table(&self, table: &str) -> Result<TableHandle>;

    /// Replaces the full column list of a table.
    ///
    /// Delete-all-then-insert semantics. Implementations must not leave a
    /// partial list visible to later reads if the write fails.
    async fn replace_columns(&self, handle: TableHandle, columns: &[Column]) -> Result<()>;

    /// Lists all table names, sorted alphabetically.
    async fn list_tables(&self) -> Result<Vec<String>>;
}

/// Durable storage of opaque per-row documents.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Lists the rows of `table` in identifier order.
    async fn list_rows(&self, table: &str) -> Result<Vec<Row>>;

    /// Inserts a row and returns its newly assigned id.
    async fn insert_row(&self, table: &str, values: Values) -> Result<RowId>;

    /// Replaces the whole value document of a row.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the row does not exist
    async fn update_row(&self, id: RowId, values: Values) -> Result<()>;

    /// Merges `patch` into the stored document, leaving other keys alone.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the row does not exist
    async fn patch_row(&self, id: RowId, patch: Values) -> Result<()>;

    /// Deletes a row. Unknown ids are a no-op.
    async fn delete_row(&self, id: RowId) -> Result<()>;

    /// Replaces many documents at once.
    ///
    /// The default issues one `update_row` per entry and stops at the first
    /// failure, so earlier entries stay written. Backends with a batch
    /// primitive should override this with an all-or-nothing write.
    async fn update_many(&self, updates: Vec<(RowId, Values)>) -> Result<()> {
        for (id, values) in updates {
            self.update_row(id, values).await?;
        }
        Ok(())
    }
}

/// Validates a table name.
///
/// Names must follow these rules:
/// 1. Not empty
/// 2. Maximum 128 characters
/// 3. Start with letter (a-z, A-Z) or underscore (_)
/// 4. Contain only letters, numbers, underscores and hyphens
///
/// # Examples
///
/// ```rust
/// use lynxky::storage::validate_name;
///
/// assert!(validate_name("tasks").is_ok());
/// assert!(validate_name("reading-list_2024").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("2024").is_err());
/// assert!(validate_name("my table").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<()> {
    let first_char = match name.chars().next() {
        Some(c) => c,
        None => return Err(Error::InvalidArgument("Name cannot be empty".to_string())),
    };

    if name.len() > 128 {
        return Err(Error::InvalidArgument(
            "Name cannot be longer than 128 characters".to_string(),
        ));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(Error::InvalidArgument(
            "Name must start with a letter or underscore".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidArgument(
            "Name can only contain letters, numbers, underscores and hyphens".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        // Valid names
        assert!(validate_name("tasks").is_ok());
        assert!(validate_name("_scratch").is_ok());
        assert!(validate_name("Inventory-2").is_ok());

        // Invalid names
        assert!(validate_name("").is_err());
        assert!(validate_name("-tasks").is_err());
        assert!(validate_name("tasks.v2").is_err());
        assert!(validate_name("my tasks").is_err());
        assert!(validate_name(&"a".repeat(129)).is_err());
    }
}
