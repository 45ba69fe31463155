//! In-memory schema and row store
//!
//! Used by tests and by embedders that keep tables only for the lifetime of
//! the process. Clones share the same state. Failures can be injected per
//! operation to exercise the controller's error paths.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::model::{Column, Row, RowId, TableHandle, Values};
use crate::storage::engine::{validate_name, RowStore, SchemaStore, TableSchema};

/// Store operations that can be counted and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetColumns,
    CreateTable,
    ReplaceColumns,
    ListTables,
    ListRows,
    InsertRow,
    UpdateRow,
    PatchRow,
    DeleteRow,
    UpdateMany,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Default)]
struct MemoryState {
    tables: BTreeMap<String, TableSchema>,
    rows: BTreeMap<RowId, StoredRow>,
    next_row_id: u64,
}

struct StoredRow {
    table: String,
    values: Values,
}

#[derive(Default)]
struct Faults {
    once: HashSet<StoreOp>,
    always: HashSet<StoreOp>,
    calls: HashMap<StoreOp, usize>,
}

/// In-memory store implementing both [`SchemaStore`] and [`RowStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `op` fail with a storage error.
    pub fn fail_next(&self, op: StoreOp) {
        self.faults.lock().once.insert(op);
    }

    /// Makes every call of `op` fail until [`MemoryStore::clear_failures`].
    pub fn fail_always(&self, op: StoreOp) {
        self.faults.lock().always.insert(op);
    }

    pub fn clear_failures(&self) {
        let mut faults = self.faults.lock();
        faults.once.clear();
        faults.always.clear();
    }

    /// Number of times `op` was called, failed calls included.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.faults.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total number of write calls of any kind.
    pub fn write_calls(&self) -> usize {
        [
            StoreOp::CreateTable,
            StoreOp::ReplaceColumns,
            StoreOp::InsertRow,
            StoreOp::UpdateRow,
            StoreOp::PatchRow,
            StoreOp::DeleteRow,
            StoreOp::UpdateMany,
        ]
        .iter()
        .map(|op| self.calls(*op))
        .sum()
    }

    /// Stored document of a row, bypassing fault injection.
    pub fn row_values(&self, id: RowId) -> Option<Values> {
        self.state.read().rows.get(&id).map(|r| r.values.clone())
    }

    /// Stored columns of a table, bypassing fault injection.
    pub fn stored_columns(&self, table: &str) -> Option<Vec<Column>> {
        self.state
            .read()
            .tables
            .get(table)
            .map(|s| s.columns.clone())
    }

    /// Number of rows stored for `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .read()
            .rows
            .values()
            .filter(|r| r.table == table)
            .count()
    }

    fn check(&self, op: StoreOp) -> Result<()> {
        let mut faults = self.faults.lock();
        *faults.calls.entry(op).or_insert(0) += 1;
        if faults.once.remove(&op) || faults.always.contains(&op) {
            return Err(Error::Storage(format!("injected failure in {}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn get_columns(&self, table: &str) -> Result<Option<TableSchema>> {
        self.check(StoreOp::GetColumns)?;
        Ok(self.state.read().tables.get(table).cloned())
    }

    #[instrument(skip(self))]
    async fn create_table(&self, table: &str) -> Result<TableHandle> {
        self.check(StoreOp::CreateTable)?;
        validate_name(table)?;

        let mut state = self.state.write();
        if state.tables.contains_key(table) {
            return Err(Error::AlreadyExists(format!("Table '{}'", table)));
        }
        let handle = TableHandle::new();
        state.tables.insert(
            table.to_string(),
            TableSchema {
                handle,
                name: table.to_string(),
                columns: Vec::new(),
            },
        );
        debug!(%handle, "Created table entry");
        Ok(handle)
    }

    #[instrument(skip(self, columns), fields(count = columns.len()))]
    async fn replace_columns(&self, handle: TableHandle, columns: &[Column]) -> Result<()> {
        self.check(StoreOp::ReplaceColumns)?;
        let mut state = self.state.write();
        let schema = state
            .tables
            .values_mut()
            .find(|s| s.handle == handle)
            .ok_or_else(|| Error::NotFound(format!("Table handle {}", handle)))?;
        schema.columns = columns.to_vec();
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.check(StoreOp::ListTables)?;
        Ok(self.state.read().tables.keys().cloned().collect())
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn list_rows(&self, table: &str) -> Result<Vec<Row>> {
        self.check(StoreOp::ListRows)?;
        Ok(self
            .state
            .read()
            .rows
            .iter()
            .filter(|(_, r)| r.table == table)
            .map(|(id, r)| Row::new(*id, r.values.clone()))
            .collect())
    }

    async fn insert_row(&self, table: &str, values: Values) -> Result<RowId> {
        self.check(StoreOp::InsertRow)?;
        let mut state = self.state.write();
        state.next_row_id += 1;
        let id = RowId::new(state.next_row_id);
        state.rows.insert(
            id,
            StoredRow {
                table: table.to_string(),
                values,
            },
        );
        Ok(id)
    }

    async fn update_row(&self, id: RowId, values: Values) -> Result<()> {
        self.check(StoreOp::UpdateRow)?;
        let mut state = self.state.write();
        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Row {}", id)))?;
        row.values = values;
        Ok(())
    }

    async fn patch_row(&self, id: RowId, patch: Values) -> Result<()> {
        self.check(StoreOp::PatchRow)?;
        let mut state = self.state.write();
        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Row {}", id)))?;
        row.values.extend(patch);
        Ok(())
    }

    async fn delete_row(&self, id: RowId) -> Result<()> {
        self.check(StoreOp::DeleteRow)?;
        self.state.write().rows.remove(&id);
        Ok(())
    }

    async fn update_many(&self, updates: Vec<(RowId, Values)>) -> Result<()> {
        self.check(StoreOp::UpdateMany)?;
        let mut state = self.state.write();
        if let Some((missing, _)) = updates.iter().find(|(id, _)| !state.rows.contains_key(id)) {
            return Err(Error::NotFound(format!("Row {}", missing)));
        }
        for (id, values) in updates {
            if let Some(row) = state.rows.get_mut(&id) {
                row.values = values;
            }
        }
        Ok(())
    }
}
