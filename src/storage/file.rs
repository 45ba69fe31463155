//! JSON file backed store
//!
//! Keeps every table of one workspace in a single JSON document:
//!
//! ```json
//! {
//!   "tables": { "tasks": { "handle": "…", "name": "tasks", "columns": [ … ] } },
//!   "rows": { "1": { "table": "tasks", "values": { "name": "Buy milk" } } },
//!   "next_row_id": 1
//! }
//! ```
//!
//! Each operation applies to a copy of the state, writes it to a temporary
//! file and renames it over the original, and only then becomes visible.
//! Every single call (bulk updates included) is therefore all-or-nothing
//! on disk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::model::{Column, Row, RowId, TableHandle, Values};
use crate::storage::engine::{validate_name, RowStore, SchemaStore, TableSchema};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FileState {
    #[serde(default)]
    tables: BTreeMap<String, TableSchema>,
    #[serde(default)]
    rows: BTreeMap<RowId, StoredRow>,
    #[serde(default)]
    next_row_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRow {
    table: String,
    values: Values,
}

/// Store implementing [`SchemaStore`] and [`RowStore`] on a JSON file.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

impl FileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// - The file exists but cannot be read or parsed
    /// - The parent directory cannot be created
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Storage(format!("Corrupt store file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileState::default(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), tables = state.tables.len(), rows = state.rows.len(), "Opened file store");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<T>(&self, f: impl FnOnce(&FileState) -> T) -> T {
        let guard = self.state.lock().await;
        f(&guard)
    }

    /// Applies `f` to a copy of the state, persists it, then publishes it.
    async fn commit<T>(&self, f: impl FnOnce(&mut FileState) -> Result<T>) -> Result<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(out)
    }

    async fn persist(&self, state: &FileState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Persisted store file");
        Ok(())
    }
}

#[async_trait]
impl SchemaStore for FileStore {
    async fn get_columns(&self, table: &str) -> Result<Option<TableSchema>> {
        Ok(self.read(|s| s.tables.get(table).cloned()).await)
    }

    #[instrument(skip(self))]
    async fn create_table(&self, table: &str) -> Result<TableHandle> {
        validate_name(table)?;
        self.commit(|state| {
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
            Ok(handle)
        })
        .await
    }

    #[instrument(skip(self, columns), fields(count = columns.len()))]
    async fn replace_columns(&self, handle: TableHandle, columns: &[Column]) -> Result<()> {
        self.commit(|state| {
            let schema = state
                .tables
                .values_mut()
                .find(|s| s.handle == handle)
                .ok_or_else(|| Error::NotFound(format!("Table handle {}", handle)))?;
            schema.columns = columns.to_vec();
            Ok(())
        })
        .await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.read(|s| s.tables.keys().cloned().collect()).await)
    }
}

#[async_trait]
impl RowStore for FileStore {
    async fn list_rows(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self
            .read(|s| {
                s.rows
                    .iter()
                    .filter(|(_, r)| r.table == table)
                    .map(|(id, r)| Row::new(*id, r.values.clone()))
                    .collect()
            })
            .await)
    }

    async fn insert_row(&self, table: &str, values: Values) -> Result<RowId> {
        self.commit(|state| {
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
        })
        .await
    }

    async fn update_row(&self, id: RowId, values: Values) -> Result<()> {
        self.commit(|state| {
            let row = state
                .rows
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("Row {}", id)))?;
            row.values = values;
            Ok(())
        })
        .await
    }

    async fn patch_row(&self, id: RowId, patch: Values) -> Result<()> {
        self.commit(|state| {
            let row = state
                .rows
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("Row {}", id)))?;
            row.values.extend(patch);
            Ok(())
        })
        .await
    }

    async fn delete_row(&self, id: RowId) -> Result<()> {
        self.commit(|state| {
            state.rows.remove(&id);
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    async fn update_many(&self, updates: Vec<(RowId, Values)>) -> Result<()> {
        self.commit(|state| {
            for (id, values) in updates {
                let row = state
                    .rows
                    .get_mut(&id)
                    .ok_or_else(|| Error::NotFound(format!("Row {}", id)))?;
                row.values = values;
            }
            Ok(())
        })
        .await
    }
}
