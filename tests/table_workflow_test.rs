//! End-to-end table editing against the JSON file store

use lynxky::{
    CellValue, ColumnId, ColumnType, ControllerContext, FileStore, NoticeLevel, Placement,
    TableController, TableEvent,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn temp_store_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "lynxky_workflow_{}_{}_{}.json",
        tag,
        std::process::id(),
        uuid::Uuid::new_v4()
    ))
}

async fn open_controller(path: &Path) -> TableController {
    let store = Arc::new(FileStore::open(path).await.expect("Failed to open store"));
    TableController::new(store.clone(), store, ControllerContext::default())
}

#[tokio::test]
async fn test_edits_survive_reopen() {
    let path = temp_store_path("reopen");
    let name = ColumnId::from("name");
    let status = ColumnId::from("status");

    let (row, estimate) = {
        let mut controller = open_controller(&path).await;
        controller.load("projects").await.expect("Failed to load");

        let row = controller.add_row().await.expect("Failed to add row");
        controller
            .edit_cell(row, &name, "Ship 1.0")
            .await
            .expect("Failed to edit name");
        controller
            .edit_cell(row, &status, "In progress")
            .await
            .expect("Failed to edit status");

        let estimate = controller
            .add_column(Placement::Right(name.clone()))
            .await
            .expect("Failed to add column");
        controller
            .rename_column(&estimate, "Estimate")
            .await
            .expect("Failed to rename");
        controller
            .edit_cell(row, &estimate, "8")
            .await
            .expect("Failed to edit estimate");

        controller.open_type_dialog(&estimate).unwrap();
        controller.set_pending_type(ColumnType::Number).unwrap();
        controller
            .save_type_dialog()
            .await
            .expect("Failed to change type");
        (row, estimate)
    };

    let mut controller = open_controller(&path).await;
    controller.load("projects").await.expect("Failed to reload");

    let table = controller.table();
    let labels: Vec<&str> = table.columns.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Name", "Estimate", "Notes", "Status"]);
    assert_eq!(table.column(&estimate).unwrap().column_type, ColumnType::Number);
    assert_eq!(table.cell(row, &estimate), CellValue::Number(8.0));
    assert_eq!(table.display_value(row, &name), "Ship 1.0");
    assert_eq!(table.display_value(row, &status), "In progress");
    println!("✓ {} columns and {} row reloaded", table.columns.len(), table.rows.len());

    tokio::fs::remove_file(&path).await.ok();
}

#[tokio::test]
async fn test_tables_are_isolated() {
    let path = temp_store_path("isolated");
    let mut controller = open_controller(&path).await;

    controller.load("first").await.expect("Failed to load first");
    controller.add_row().await.expect("Failed to add row");
    controller.add_row().await.expect("Failed to add row");

    controller.load("second").await.expect("Failed to load second");
    assert!(controller.table().rows.is_empty());
    controller
        .delete_column(&"notes".into())
        .await
        .expect("Failed to delete column");

    controller.load("first").await.expect("Failed to reload first");
    assert_eq!(controller.table().rows.len(), 2);
    assert_eq!(controller.table().columns.len(), 3);

    tokio::fs::remove_file(&path).await.ok();
}

#[tokio::test]
async fn test_last_column_notice_reaches_subscribers() {
    let path = temp_store_path("notice");
    let mut controller = open_controller(&path).await;
    let mut events = controller.events().subscribe();

    controller.load("solo").await.expect("Failed to load");
    controller.delete_column(&"notes".into()).await.unwrap();
    controller.delete_column(&"status".into()).await.unwrap();
    assert!(controller.delete_column(&"name".into()).await.is_err());

    let mut warnings = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let TableEvent::Notice(notice) = event {
            if notice.level == NoticeLevel::Warning {
                warnings.push(notice.key);
            }
        }
    }
    assert_eq!(warnings, vec!["table.column.lastColumn".to_string()]);
    assert_eq!(controller.table().columns.len(), 1);

    tokio::fs::remove_file(&path).await.ok();
}
