//! Lynxky command-line table editor
//!
//! Every command loads one table from the JSON store file, applies a single
//! operation through the table controller and prints the result.
//!
//! # Examples
//!
//! ```bash
//! # Show the default table (created with Name/Notes/Status on first use)
//! lynxky show
//!
//! # Add a row and fill a cell
//! lynxky add-row
//! lynxky edit 1 name "Write release notes"
//!
//! # Turn a text column into a select column
//! lynxky retype notes select --option Low --option High
//!
//! # Sort by status, descending
//! lynxky sort status --desc
//! ```

use clap::{ArgGroup, Args, Parser, Subcommand};
use lynxky::storage::FileStore;
use lynxky::{
    Catalog, Column, ColumnId, ColumnType, ControllerContext, EngineConfig, EventBus, NoticeLevel,
    Placement, RowId, SchemaStore, SortDirection, TableController, TableEvent, Translator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Lynxky - dynamic tables with user-defined columns
#[derive(Parser, Debug)]
#[command(name = "lynxky")]
#[command(version = lynxky::VERSION)]
#[command(about = "Lynxky - dynamic tables with user-defined columns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = "lynxky.toml", env = "LYNXKY_CONFIG")]
    config: PathBuf,

    /// Store file, overrides `data_file` from the configuration
    #[arg(long, global = true, env = "LYNXKY_DATA")]
    data_file: Option<PathBuf>,

    /// Table to operate on, defaults to `default_table` from the configuration
    #[arg(short, long, global = true)]
    table: Option<String>,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "LYNXKY_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List tables in the store
    Tables,

    /// Print the table
    Show,

    /// Add an empty row at the top
    AddRow,

    /// Delete a row
    DeleteRow { row: u64 },

    /// Set a cell value
    Edit {
        row: u64,
        column: String,
        value: String,
    },

    /// Add an untitled text column
    AddColumn(AddColumnArgs),

    /// Delete a column and its values
    DeleteColumn { column: String },

    /// Rename a column
    RenameColumn { column: String, label: String },

    /// Set a column's width in pixels
    ResizeColumn { column: String, width: u32 },

    /// Change a column's type and select options
    Retype(RetypeArgs),

    /// Print the table sorted by a column
    Sort {
        column: String,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Load the table and print Prometheus metrics
    Metrics,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("placement").args(["left", "right"])))]
struct AddColumnArgs {
    /// Insert before this column
    #[arg(long)]
    left: Option<String>,

    /// Insert after this column
    #[arg(long)]
    right: Option<String>,
}

#[derive(Args, Debug)]
struct RetypeArgs {
    column: String,

    /// New type (text, number, select)
    column_type: ColumnType,

    /// Select option to add (repeatable)
    #[arg(long = "option")]
    options: Vec<String>,

    /// Select option to remove (repeatable)
    #[arg(long = "remove-option")]
    remove: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;
    lynxky::metrics::init_metrics();

    let mut config = EngineConfig::load(Some(&cli.config))?;
    if let Some(path) = &cli.data_file {
        config.data_file = path.clone();
    }
    let table = cli
        .table
        .clone()
        .unwrap_or_else(|| config.default_table.clone());
    debug!(?config, table = %table, "Configuration resolved");

    let store = Arc::new(FileStore::open(&config.data_file).await?);

    if let Commands::Tables = cli.command {
        return tables_command(store.as_ref()).await;
    }

    let translator = load_translator(&config)?;
    let events = EventBus::new(config.event_capacity);
    let mut notices = events.subscribe();
    let ctx = ControllerContext::new(events, translator, config);
    let mut controller = TableController::new(store.clone(), store, ctx);

    let loaded = controller.load(&table).await;
    print_notices(&mut notices);
    loaded?;

    let result = run_command(&mut controller, cli.command).await;
    print_notices(&mut notices);
    result
}

/// Setup logging with rolling files and stderr output
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "lynxky.log");

    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color)
                .compact(),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// English messages, overlaid with the configured catalog if any.
fn load_translator(config: &EngineConfig) -> anyhow::Result<Translator> {
    let catalog = match &config.catalog_file {
        Some(path) => {
            info!(path = %path.display(), locale = %config.locale, "Loading message catalog");
            Catalog::english().merge(Catalog::load(path)?)
        }
        None => Catalog::english(),
    };
    Ok(catalog.into_translator())
}

async fn tables_command(store: &FileStore) -> anyhow::Result<()> {
    let tables = store.list_tables().await?;
    if tables.is_empty() {
        println!("No tables found in {}.", store.path().display());
    } else {
        println!("Tables ({})", tables.len());
        println!("───────────────────────────────");
        for table in tables {
            println!("  • {}", table);
        }
    }
    Ok(())
}

async fn run_command(controller: &mut TableController, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Tables => Ok(()),
        Commands::Show => {
            print_table(controller);
            Ok(())
        }
        Commands::AddRow => {
            let id = controller.add_row().await?;
            println!("Row {}", id);
            Ok(())
        }
        Commands::DeleteRow { row } => {
            controller.delete_row(RowId::new(row)).await?;
            Ok(())
        }
        Commands::Edit { row, column, value } => {
            let row = RowId::new(row);
            let column = ColumnId::from(column);
            if let Some(target) = controller.table().column(&column) {
                check_select_input(target, &value)?;
            }
            controller.edit_cell(row, &column, &value).await?;
            println!(
                "✅ {} = {:?}",
                column,
                controller.table().display_value(row, &column)
            );
            Ok(())
        }
        Commands::AddColumn(args) => {
            let placement = match (args.left, args.right) {
                (Some(left), _) => Placement::Left(left.into()),
                (None, Some(right)) => Placement::Right(right.into()),
                (None, None) => Placement::End,
            };
            let id = controller.add_column(placement).await?;
            println!("Column {}", id);
            Ok(())
        }
        Commands::DeleteColumn { column } => {
            controller.delete_column(&column.into()).await?;
            Ok(())
        }
        Commands::RenameColumn { column, label } => {
            controller.rename_column(&column.into(), &label).await?;
            println!("✅ Column renamed to '{}'", label.trim());
            Ok(())
        }
        Commands::ResizeColumn { column, width } => {
            let applied = controller.resize_column(&column.into(), width).await?;
            println!("✅ Width set to {}px", applied);
            Ok(())
        }
        Commands::Retype(args) => retype_command(controller, args).await,
        Commands::Sort { column, desc } => {
            let column = ColumnId::from(column);
            let wanted = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            while controller.toggle_sort(&column)? != Some(wanted) {}
            print_table(controller);
            Ok(())
        }
        Commands::Metrics => {
            print!("{}", lynxky::metrics::export_metrics());
            Ok(())
        }
    }
}

/// Refuses select values that are not one of the column's labels.
///
/// An empty value clears the cell and is always accepted.
fn check_select_input(column: &Column, value: &str) -> anyhow::Result<()> {
    if column.column_type != ColumnType::Select || value.is_empty() || column.has_option(value) {
        return Ok(());
    }
    let labels: Vec<&str> = column.options.iter().map(|o| o.label.as_str()).collect();
    if labels.is_empty() {
        anyhow::bail!("{} has no options yet; add some with `lynxky retype`", column.label);
    }
    anyhow::bail!(
        "'{}' is not an option of {}. Valid: {}",
        value,
        column.label,
        labels.join(", ")
    )
}

async fn retype_command(controller: &mut TableController, args: RetypeArgs) -> anyhow::Result<()> {
    controller.open_type_dialog(&args.column.into())?;
    controller.set_pending_type(args.column_type)?;
    for label in &args.remove {
        controller.remove_pending_option(label)?;
    }
    for label in &args.options {
        controller.set_new_option_text(label)?;
        controller.add_pending_option()?;
    }
    controller.save_type_dialog().await?;
    Ok(())
}

fn print_notices(rx: &mut broadcast::Receiver<TableEvent>) {
    while let Ok(event) = rx.try_recv() {
        if let TableEvent::Notice(notice) = event {
            match notice.level {
                NoticeLevel::Success => println!("✅ {}", notice.message),
                NoticeLevel::Warning => eprintln!("⚠️  {}", notice.message),
                NoticeLevel::Error => eprintln!("❌ {}", notice.message),
            }
        }
    }
}

const MAX_CELL_WIDTH: usize = 40;

fn print_table(controller: &TableController) {
    let table = controller.table();
    let marker = |id: &ColumnId| match controller.sort() {
        Some(sort) if &sort.column == id => match sort.direction {
            SortDirection::Ascending => " ↑",
            SortDirection::Descending => " ↓",
        },
        _ => "",
    };

    let headers: Vec<String> = std::iter::once("#".to_string())
        .chain(
            table
                .columns
                .iter()
                .map(|c| format!("{} ({}){}", c.label, c.column_type, marker(&c.id))),
        )
        .collect();
    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            std::iter::once(row.id.to_string())
                .chain(
                    table
                        .columns
                        .iter()
                        .map(|c| truncate(&table.display_value(row.id, &c.id))),
                )
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            body.iter()
                .map(|cells| cells[i].chars().count())
                .chain(std::iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    println!("{} ({} rows)", table.name, table.rows.len());
    println!("{}", format_line(&headers, &widths));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─")
    );
    for cells in &body {
        println!("{}", format_line(cells, &widths));
    }
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" │ ")
}

fn truncate(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= MAX_CELL_WIDTH {
        return single_line;
    }
    let cut: String = single_line.chars().take(MAX_CELL_WIDTH - 1).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lynxky::SelectOption;

    fn status() -> Column {
        Column::new("status", "Status", ColumnType::Select).with_options(vec![
            SelectOption::new("Todo", "gray"),
            SelectOption::new("Done", "green"),
        ])
    }

    #[test]
    fn test_select_input_accepts_labels_and_clear() {
        assert!(check_select_input(&status(), "Done").is_ok());
        assert!(check_select_input(&status(), "").is_ok());
        assert!(check_select_input(&Column::new("n", "Notes", ColumnType::Text), "anything").is_ok());
    }

    #[test]
    fn test_select_input_lists_valid_labels() {
        let err = check_select_input(&status(), "done").unwrap_err().to_string();
        assert_eq!(err, "'done' is not an option of Status. Valid: Todo, Done");

        let bare = Column::new("s", "Stage", ColumnType::Select);
        let err = check_select_input(&bare, "x").unwrap_err().to_string();
        assert!(err.starts_with("Stage has no options yet"));
    }
}
