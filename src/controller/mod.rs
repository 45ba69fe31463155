//! Table view controller
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐   notices, events   ┌──────────┐
//! │   TableController   │ ──────────────────→ │ EventBus │
//! │  (Table in memory)  │                     └──────────┘
//! └─────────┬───────────┘
//!           │ Arc<dyn SchemaStore>, Arc<dyn RowStore>
//!           ↓
//! ┌─────────────────────┐
//! │  MemoryStore/File   │
//! └─────────────────────┘
//! ```
//!
//! The controller owns one [`Table`] and mirrors it to the stores. Edits of
//! single cells and rows touch memory only after the store accepted them.
//! Column-list changes are applied to memory first and then persisted; if
//! persistence fails the in-memory list is left as is and an error notice
//! is published. A type change is the exception: it commits to memory only
//! after both rows and columns were written.
//!
//! The column list and row documents live in separate stores, so a schema
//! change is two writes. A crash in between leaves rows with stale keys or
//! missing defaults. Loading tolerates both.

mod dialog;
mod ids;
mod sort;

pub use dialog::{OptionError, TypeChangeDialog};
pub use ids::ColumnIdGenerator;
pub use sort::{SortDirection, SortState};

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::coerce::{coerce, coerce_input};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::{EventBus, Notice, TableEvent};
use crate::i18n::Translator;
use crate::metrics;
use crate::model::{
    default_columns, project, reconcile, Column, ColumnId, ColumnType, Row, RowId, Table,
    TableHandle, Values,
};
use crate::storage::{RowStore, SchemaStore};

/// Collaborators handed to a controller at construction.
#[derive(Debug, Clone, Default)]
pub struct ControllerContext {
    pub events: EventBus,
    pub translator: Translator,
    pub config: EngineConfig,
}

impl ControllerContext {
    pub fn new(events: EventBus, translator: Translator, config: EngineConfig) -> Self {
        Self {
            events,
            translator,
            config,
        }
    }

    /// Bus sized from `config`, English messages.
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            events: EventBus::new(config.event_capacity),
            translator: Translator::english(),
            config,
        }
    }
}

/// Loading state of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Loading,
    Ready,
}

/// Where a new column goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Immediately before the reference column.
    Left(ColumnId),
    /// Immediately after the reference column.
    Right(ColumnId),
    /// After the last column.
    End,
}

/// Owns one table's in-memory state and keeps it in sync with the stores.
pub struct TableController {
    schema: Arc<dyn SchemaStore>,
    rows: Arc<dyn RowStore>,
    ctx: ControllerContext,
    status: Status,
    table: Table,
    sort: Option<SortState>,
    dialog: Option<TypeChangeDialog>,
    ids: ColumnIdGenerator,
}

impl TableController {
    pub fn new(schema: Arc<dyn SchemaStore>, rows: Arc<dyn RowStore>, ctx: ControllerContext) -> Self {
        Self {
            schema,
            rows,
            ctx,
            status: Status::Loading,
            table: Table::default(),
            sort: None,
            dialog: None,
            ids: ColumnIdGenerator::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn dialog(&self) -> Option<&TypeChangeDialog> {
        self.dialog.as_ref()
    }

    pub fn events(&self) -> &EventBus {
        &self.ctx.events
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Loads `name`, creating and seeding it on first access.
    ///
    /// On failure the previously loaded table stays in place and the status
    /// returns to `Ready`.
    #[instrument(skip(self))]
    pub async fn load(&mut self, name: &str) -> Result<()> {
        self.status = Status::Loading;
        let result = self.fetch(name).await;
        self.status = Status::Ready;

        match result {
            Ok(table) => {
                info!(
                    op = "load",
                    table = %table.name,
                    columns = table.columns.len(),
                    rows = table.rows.len(),
                    "Table loaded"
                );
                metrics::set_loaded_rows(&table.name, table.rows.len());
                self.ctx.events.publish(TableEvent::Loaded {
                    table: table.name.clone(),
                    columns: table.columns.len(),
                    rows: table.rows.len(),
                });
                self.table = table;
                self.sort = None;
                self.dialog = None;
                Ok(())
            }
            Err(e) => {
                self.report_failure("load", name, "table.load.failed", &[("table", name)], &e);
                Err(e)
            }
        }
    }

    /// Reloads the current table.
    pub async fn reload(&mut self) -> Result<()> {
        let name = self.table.name.clone();
        self.load(&name).await
    }

    async fn fetch(&self, name: &str) -> Result<Table> {
        let (handle, columns) = match tally("get_columns", self.schema.get_columns(name).await)? {
            Some(schema) if !schema.columns.is_empty() => (schema.handle, schema.columns),
            Some(schema) => {
                debug!(table = name, "Table has no columns, seeding defaults");
                let columns = default_columns();
                tally(
                    "replace_columns",
                    self.schema.replace_columns(schema.handle, &columns).await,
                )?;
                (schema.handle, columns)
            }
            None => {
                let handle = tally("create_table", self.schema.create_table(name).await)?;
                let columns = default_columns();
                tally(
                    "replace_columns",
                    self.schema.replace_columns(handle, &columns).await,
                )?;
                info!(op = "load", table = name, %handle, "Created table");
                self.notify(Notice::success(
                    "table.load.created",
                    self.ctx
                        .translator
                        .translate_with("table.load.created", &[("table", name)]),
                ));
                (handle, columns)
            }
        };

        let rows = tally("list_rows", self.rows.list_rows(name).await)?
            .into_iter()
            .map(|row| Row::new(row.id, project(row.values, &columns)))
            .collect();

        Ok(Table {
            name: name.to_string(),
            handle: Some(handle),
            columns,
            rows,
        })
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    /// Writes `raw` into a cell after coercing it for the column's type.
    ///
    /// The whole row is persisted, reconciled to the current columns. Memory
    /// changes only once the store accepted the write.
    #[instrument(skip(self, raw), fields(table = %self.table.name))]
    pub async fn edit_cell(&mut self, row_id: RowId, column_id: &ColumnId, raw: &str) -> Result<()> {
        self.ensure_loaded("edit_cell")?;
        let column = match self.table.column(column_id) {
            Some(column) => column.clone(),
            None => return Err(self.column_not_found("edit_cell", column_id)),
        };
        let mut values = match self.table.row(row_id) {
            Some(row) => reconcile(&row.values, &self.table.columns),
            None => return Err(self.row_not_found("edit_cell", row_id)),
        };
        values.insert(column.id.clone(), coerce_input(raw, &column));

        match tally("update_row", self.rows.update_row(row_id, values.clone()).await) {
            Ok(()) => {
                if let Some(row) = self.table.row_mut(row_id) {
                    row.values = values;
                }
                debug!(op = "edit_cell", row = %row_id, column = %column_id, "Cell saved");
                self.ctx.events.publish(TableEvent::CellUpdated {
                    row: row_id,
                    column: column_id.clone(),
                });
                Ok(())
            }
            Err(e) => {
                let target = format!("{}/{}", row_id, column_id);
                self.report_failure("edit_cell", &target, "table.cell.saveFailed", &[], &e);
                Err(e)
            }
        }
    }

    /// Inserts a row holding every column's default and shows it first.
    #[instrument(skip(self), fields(table = %self.table.name))]
    pub async fn add_row(&mut self) -> Result<RowId> {
        self.ensure_loaded("add_row")?;
        let values = reconcile(&Values::new(), &self.table.columns);

        match tally(
            "insert_row",
            self.rows.insert_row(&self.table.name, values.clone()).await,
        ) {
            Ok(id) => {
                self.table.rows.insert(0, Row::new(id, values));
                info!(op = "add_row", row = %id, "Row added");
                metrics::set_loaded_rows(&self.table.name, self.table.rows.len());
                self.ctx.events.publish(TableEvent::RowAdded(id));
                self.notify_success("table.row.added", &[]);
                Ok(id)
            }
            Err(e) => {
                let name = self.table.name.clone();
                self.report_failure("add_row", &name, "table.row.addFailed", &[], &e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self), fields(table = %self.table.name))]
    pub async fn delete_row(&mut self, row_id: RowId) -> Result<()> {
        self.ensure_loaded("delete_row")?;
        if self.table.row(row_id).is_none() {
            return Err(self.row_not_found("delete_row", row_id));
        }

        match tally("delete_row", self.rows.delete_row(row_id).await) {
            Ok(()) => {
                self.table.rows.retain(|r| r.id != row_id);
                info!(op = "delete_row", row = %row_id, "Row deleted");
                metrics::set_loaded_rows(&self.table.name, self.table.rows.len());
                self.ctx.events.publish(TableEvent::RowDeleted(row_id));
                self.notify_success("table.row.deleted", &[]);
                Ok(())
            }
            Err(e) => {
                let row = row_id.to_string();
                self.report_failure("delete_row", &row, "table.row.deleteFailed", &[("row", row.as_str())], &e);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Adds an untitled text column and backfills its default into every row.
    #[instrument(skip(self), fields(table = %self.table.name))]
    pub async fn add_column(&mut self, placement: Placement) -> Result<ColumnId> {
        let handle = self.ensure_loaded("add_column")?;
        let index = match &placement {
            Placement::End => self.table.columns.len(),
            Placement::Left(reference) | Placement::Right(reference) => {
                let at = match self.table.column_index(reference) {
                    Some(at) => at,
                    None => return Err(self.column_not_found("add_column", reference)),
                };
                if matches!(placement, Placement::Right(_)) {
                    at + 1
                } else {
                    at
                }
            }
        };

        let id = self.ids.next(|candidate| self.table.has_column_id(candidate));
        let column = Column::new(
            id.clone(),
            self.ctx.translator.translate("table.column.untitled"),
            ColumnType::Text,
        )
        .with_width(self.ctx.config.default_column_width);
        self.table.columns.insert(index, column);
        self.ctx.events.publish(TableEvent::ColumnsChanged);

        if let Err(e) = self.persist_schema_change(handle).await {
            self.report_failure("add_column", id.as_str(), "table.column.addFailed", &[], &e);
            return Err(e);
        }

        info!(op = "add_column", column = %id, index, "Column added");
        self.notify_success("table.column.added", &[]);
        Ok(id)
    }

    /// Removes a column and strips its key from every row.
    ///
    /// The last remaining column cannot be deleted; that is refused before
    /// any store is touched.
    #[instrument(skip(self), fields(table = %self.table.name))]
    pub async fn delete_column(&mut self, column_id: &ColumnId) -> Result<()> {
        let handle = self.ensure_loaded("delete_column")?;
        let index = match self.table.column_index(column_id) {
            Some(index) => index,
            None => return Err(self.column_not_found("delete_column", column_id)),
        };
        if self.table.columns.len() <= 1 {
            return Err(self.reject("delete_column", column_id.as_str(), "table.column.lastColumn", &[]));
        }

        let removed = self.table.columns.remove(index);
        if self.sort.as_ref().map(|s| &s.column) == Some(column_id) {
            self.sort = None;
        }
        if self.dialog.as_ref().map(|d| &d.column_id) == Some(column_id) {
            self.dialog = None;
        }
        self.ctx.events.publish(TableEvent::ColumnsChanged);

        if let Err(e) = self.persist_schema_change(handle).await {
            self.report_failure(
                "delete_column",
                column_id.as_str(),
                "table.column.deleteFailed",
                &[("column", removed.label.as_str())],
                &e,
            );
            return Err(e);
        }

        info!(op = "delete_column", column = %column_id, "Column deleted");
        self.notify_success("table.column.deleted", &[("column", removed.label.as_str())]);
        Ok(())
    }

    pub async fn rename_column(&mut self, column_id: &ColumnId, label: &str) -> Result<()> {
        let handle = self.ensure_loaded("rename_column")?;
        let label = label.trim();
        if label.is_empty() {
            return Err(self.reject("rename_column", column_id.as_str(), "table.column.emptyLabel", &[]));
        }
        let index = match self.table.column_index(column_id) {
            Some(index) => index,
            None => return Err(self.column_not_found("rename_column", column_id)),
        };

        self.table.columns[index].label = label.to_string();
        self.ctx.events.publish(TableEvent::ColumnsChanged);

        if let Err(e) = self.persist_columns(handle).await {
            self.report_failure("rename_column", column_id.as_str(), "table.column.renameFailed", &[], &e);
            return Err(e);
        }
        debug!(op = "rename_column", column = %column_id, label, "Column renamed");
        Ok(())
    }

    /// Sets a column's width, clamped to the configured bounds. Returns the
    /// width actually applied.
    pub async fn resize_column(&mut self, column_id: &ColumnId, width: u32) -> Result<u32> {
        let handle = self.ensure_loaded("resize_column")?;
        let index = match self.table.column_index(column_id) {
            Some(index) => index,
            None => return Err(self.column_not_found("resize_column", column_id)),
        };

        let width = self.ctx.config.clamp_width(width);
        self.table.columns[index].width = width;
        self.ctx.events.publish(TableEvent::ColumnsChanged);

        if let Err(e) = self.persist_columns(handle).await {
            self.report_failure("resize_column", column_id.as_str(), "table.column.resizeFailed", &[], &e);
            return Err(e);
        }
        debug!(op = "resize_column", column = %column_id, width, "Column resized");
        Ok(width)
    }

    // ------------------------------------------------------------------
    // Type change dialog
    // ------------------------------------------------------------------

    /// Opens the dialog for `column_id`, replacing any open draft.
    pub fn open_type_dialog(&mut self, column_id: &ColumnId) -> Result<()> {
        let draft = match self.table.column(column_id) {
            Some(column) => TypeChangeDialog::for_column(column),
            None => return Err(self.column_not_found("open_type_dialog", column_id)),
        };
        self.dialog = Some(draft);
        Ok(())
    }

    pub fn set_pending_type(&mut self, column_type: ColumnType) -> Result<()> {
        self.draft_mut("set_pending_type")?.column_type = column_type;
        Ok(())
    }

    pub fn set_new_option_text(&mut self, text: &str) -> Result<()> {
        self.draft_mut("set_new_option_text")?.new_option = text.to_string();
        Ok(())
    }

    /// Adds the pending option text to the draft. Colors are handed out
    /// round-robin from the configured palette.
    pub fn add_pending_option(&mut self) -> Result<()> {
        let count = self.draft_mut("add_pending_option")?.options.len();
        let color = self.ctx.config.palette_color(count);
        let result = self
            .draft_mut("add_pending_option")?
            .add_option(color)
            .map(|o| o.label.clone());
        match result {
            Ok(label) => {
                debug!(op = "add_pending_option", option = %label, "Option added to draft");
                Ok(())
            }
            Err(e) => Err(self.option_rejected("add_pending_option", e)),
        }
    }

    pub fn remove_pending_option(&mut self, label: &str) -> Result<()> {
        let result = self.draft_mut("remove_pending_option")?.remove_option(label);
        result
            .map(|_| ())
            .map_err(|e| self.option_rejected("remove_pending_option", e))
    }

    pub fn set_option_color(&mut self, label: &str, color: &str) -> Result<()> {
        let result = self.draft_mut("set_option_color")?.set_color(label, color);
        result.map_err(|e| self.option_rejected("set_option_color", e))
    }

    pub fn cancel_type_dialog(&mut self) {
        self.dialog = None;
    }

    /// Saves the open draft.
    ///
    /// If only options changed, the column list is persisted. If the type
    /// changed, every row is first recomputed with [`coerce`] and written in
    /// one batch, then the column list is written, then memory is updated.
    #[instrument(skip(self), fields(table = %self.table.name))]
    pub async fn save_type_dialog(&mut self) -> Result<()> {
        let draft = match self.dialog.clone() {
            Some(draft) => draft,
            None => return Err(self.dialog_not_open("save_type_dialog")),
        };
        let handle = self.ensure_loaded("save_type_dialog")?;
        let index = match self.table.column_index(&draft.column_id) {
            Some(index) => index,
            None => return Err(self.column_not_found("save_type_dialog", &draft.column_id)),
        };

        let previous = self.table.columns[index].clone();
        let updated = draft.apply_to(&previous);
        let mut columns = self.table.columns.clone();
        columns[index] = updated.clone();

        if previous.column_type != updated.column_type {
            let updates: Vec<(RowId, Values)> = self
                .table
                .rows
                .iter()
                .map(|row| {
                    let mut values = reconcile(&row.values, &columns);
                    let old = row.values.get(&updated.id).cloned().unwrap_or_default();
                    values.insert(
                        updated.id.clone(),
                        coerce(&old, previous.column_type, updated.column_type, &updated.options),
                    );
                    (row.id, values)
                })
                .collect();

            if !updates.is_empty() {
                if let Err(e) = tally("update_many", self.rows.update_many(updates.clone()).await) {
                    self.report_failure(
                        "save_type_dialog",
                        updated.id.as_str(),
                        "table.column.typeChangeFailed",
                        &[("column", updated.label.as_str())],
                        &e,
                    );
                    return Err(e);
                }
            }
            for (id, values) in updates {
                if let Some(row) = self.table.row_mut(id) {
                    row.values = values;
                }
            }
            info!(
                op = "save_type_dialog",
                column = %updated.id,
                from = %previous.column_type,
                to = %updated.column_type,
                rows = self.table.rows.len(),
                "Column values converted"
            );
        }

        if let Err(e) = tally(
            "replace_columns",
            self.schema.replace_columns(handle, &columns).await,
        ) {
            self.report_failure(
                "save_type_dialog",
                updated.id.as_str(),
                "table.column.typeChangeFailed",
                &[("column", updated.label.as_str())],
                &e,
            );
            return Err(e);
        }

        self.table.columns = columns;
        self.dialog = None;
        self.ctx.events.publish(TableEvent::ColumnsChanged);
        self.notify_success("table.column.typeChanged", &[("column", updated.label.as_str())]);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// Cycles the sort on `column_id`: ascending, descending, cleared.
    ///
    /// Returns the direction now in effect, `None` when cleared.
    pub fn toggle_sort(&mut self, column_id: &ColumnId) -> Result<Option<SortDirection>> {
        let column = match self.table.column(column_id) {
            Some(column) => column.clone(),
            None => return Err(self.column_not_found("toggle_sort", column_id)),
        };

        self.sort = sort::next_state(self.sort.as_ref(), column_id);
        match &self.sort {
            Some(state) => sort::sort_rows(&mut self.table.rows, &column, state.direction),
            None => sort::identifier_order(&mut self.table.rows),
        }

        let direction = self.sort.as_ref().map(|s| s.direction);
        debug!(op = "toggle_sort", column = %column_id, ?direction, "Sort changed");
        self.ctx.events.publish(TableEvent::Sorted {
            column: self.sort.as_ref().map(|s| s.column.clone()),
        });
        Ok(direction)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_loaded(&self, op: &str) -> Result<TableHandle> {
        match self.table.handle {
            Some(handle) => Ok(handle),
            None => Err(self.reject(op, "", "table.state.notLoaded", &[])),
        }
    }

    async fn persist_columns(&self, handle: TableHandle) -> Result<()> {
        tally(
            "replace_columns",
            self.schema.replace_columns(handle, &self.table.columns).await,
        )
    }

    /// Persists the column list, then reconciles every row document to it.
    async fn persist_schema_change(&mut self, handle: TableHandle) -> Result<()> {
        self.persist_columns(handle).await?;

        let updates: Vec<(RowId, Values)> = self
            .table
            .rows
            .iter()
            .map(|row| (row.id, reconcile(&row.values, &self.table.columns)))
            .collect();
        if updates.is_empty() {
            return Ok(());
        }

        tally("update_many", self.rows.update_many(updates.clone()).await)?;
        for (id, values) in updates {
            if let Some(row) = self.table.row_mut(id) {
                row.values = values;
            }
        }
        Ok(())
    }

    fn draft_mut(&mut self, op: &str) -> Result<&mut TypeChangeDialog> {
        let ctx = &self.ctx;
        self.dialog
            .as_mut()
            .ok_or_else(|| Error::Rejected(ctx.warn(op, "", "table.dialog.notOpen", &[])))
    }

    fn dialog_not_open(&self, op: &str) -> Error {
        self.reject(op, "", "table.dialog.notOpen", &[])
    }

    fn column_not_found(&self, op: &str, column_id: &ColumnId) -> Error {
        self.not_found(
            op,
            column_id.as_str(),
            "table.column.notFound",
            &[("column", column_id.as_str())],
        )
    }

    fn row_not_found(&self, op: &str, row_id: RowId) -> Error {
        let row = row_id.to_string();
        self.not_found(op, &row, "table.row.notFound", &[("row", row.as_str())])
    }

    fn option_rejected(&self, op: &str, error: OptionError) -> Error {
        match error {
            OptionError::Empty => self.reject(op, "", "table.option.empty", &[]),
            OptionError::Duplicate(label) => {
                self.reject(op, &label, "table.option.duplicate", &[("option", label.as_str())])
            }
            OptionError::NotFound(label) => {
                self.not_found(op, &label, "table.option.notFound", &[("option", label.as_str())])
            }
        }
    }

    /// Warns about a request refused before any store call.
    fn reject(&self, op: &str, target: &str, key: &str, args: &[(&str, &str)]) -> Error {
        Error::Rejected(self.ctx.warn(op, target, key, args))
    }

    /// Warns about a row, column or option that does not exist.
    fn not_found(&self, op: &str, target: &str, key: &str, args: &[(&str, &str)]) -> Error {
        Error::NotFound(self.ctx.warn(op, target, key, args))
    }

    fn report_failure(&self, op: &str, target: &str, key: &str, args: &[(&str, &str)], error: &Error) {
        error!(op, target, error = %error, "Table operation failed");
        let detail = error.to_string();
        let mut args: Vec<(&str, &str)> = args.to_vec();
        args.push(("error", detail.as_str()));
        let message = self.ctx.translator.translate_with(key, &args);
        self.notify(Notice::error(key, message));
    }

    fn notify_success(&self, key: &str, args: &[(&str, &str)]) {
        let message = self.ctx.translator.translate_with(key, args);
        self.notify(Notice::success(key, message));
    }

    fn notify(&self, notice: Notice) {
        self.ctx.notify(notice);
    }
}

impl ControllerContext {
    /// Logs and publishes a warning notice, returning its message.
    fn warn(&self, op: &str, target: &str, key: &str, args: &[(&str, &str)]) -> String {
        let message = self.translator.translate_with(key, args);
        warn!(op, target, key, "{}", message);
        self.notify(Notice::warning(key, message.clone()));
        message
    }

    fn notify(&self, notice: Notice) {
        metrics::record_notice(notice.level);
        self.events.publish(TableEvent::Notice(notice));
    }
}

/// Records the outcome of one store call.
fn tally<T>(op: &str, result: Result<T>) -> Result<T> {
    metrics::record_store_op(op, result.is_ok());
    result
}
