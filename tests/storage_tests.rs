//! Integration tests for the repository client
//!
//! Runs against a throwaway on-disk SQLite database per test.

use realm_server_data::{DbClient, DbValue, Row, StorageConfig, TableSchema};
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> StorageConfig {
    let path = dir.path().join("test.db");
    StorageConfig::with_path(path.to_str().expect("utf-8 temp path"))
}

async fn open_client(dir: &TempDir) -> DbClient {
    DbClient::connect(&test_config(dir))
        .await
        .expect("Failed to open test database")
}

fn gear_schema() -> TableSchema {
    TableSchema::new("gear")
        .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
        .column("name", "TEXT NOT NULL DEFAULT ''")
        .column("power", "REAL NOT NULL DEFAULT 0")
        .column("stack", "INTEGER NOT NULL DEFAULT 1")
        .column("note", "TEXT")
}

#[tokio::test]
async fn create_table_if_not_exists_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let client = open_client(&dir).await;

    assert!(!client.table_exists("gear").await.unwrap());
    assert!(client.create_table_if_not_exists(&gear_schema()).await.unwrap());
    assert!(client.table_exists("gear").await.unwrap());

    // Second creation must succeed and leave the table usable
    assert!(client.create_table_if_not_exists(&gear_schema()).await.unwrap());
    let id = client
        .insert("gear", &Row::new().with("name", "axe"))
        .await
        .unwrap();
    assert!(id > 0, "table should be usable after repeated creation");
}

#[tokio::test]
async fn insert_then_query_round_trips_values() {
    let dir = TempDir::new().unwrap();
    let client = open_client(&dir).await;
    client.create_table_if_not_exists(&gear_schema()).await.unwrap();

    let row = Row::new()
        .with("name", "iron_sword")
        .with("power", 12.5)
        .with("stack", 3i64)
        .with("note", DbValue::Null);
    let id = client.insert("gear", &row).await.unwrap();
    assert!(id > 0, "insert should return the generated ID");

    let rows = client
        .query("SELECT * FROM gear WHERE id = ?", &[id.into()])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let loaded = &rows[0];
    assert_eq!(loaded.id("id"), Some(id));
    assert_eq!(loaded.text_or("name", ""), "iron_sword");
    assert_eq!(loaded.float_or("power", 0.0), 12.5);
    assert_eq!(loaded.int_or("stack", 0), 3);
    assert_eq!(loaded.get("note"), Some(&DbValue::Null));
}

#[tokio::test]
async fn empty_result_is_ok_but_bad_sql_is_err() {
    let dir = TempDir::new().unwrap();
    let client = open_client(&dir).await;
    client.create_table_if_not_exists(&gear_schema()).await.unwrap();

    let rows = client
        .query("SELECT * FROM gear WHERE name = ?", &["nothing".into()])
        .await
        .unwrap();
    assert!(rows.is_empty(), "zero rows is a successful result");

    let failure = client.query("SELECT * FROM no_such_table", &[]).await;
    assert!(failure.is_err(), "execution failure must be distinct from empty");
}

#[tokio::test]
async fn update_and_delete_affect_matching_rows() {
    let dir = TempDir::new().unwrap();
    let client = open_client(&dir).await;
    client.create_table_if_not_exists(&gear_schema()).await.unwrap();

    let id = client
        .insert("gear", &Row::new().with("name", "staff").with("power", 5.0))
        .await
        .unwrap();

    let affected = client
        .update(
            "gear",
            &Row::new().with("power", 9.0),
            "id = ?",
            &[id.into()],
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let rows = client
        .query("SELECT * FROM gear WHERE id = ?", &[id.into()])
        .await
        .unwrap();
    assert_eq!(rows[0].float_or("power", 0.0), 9.0);

    let deleted = client.delete("gear", "id = ?", &[id.into()]).await.unwrap();
    assert_eq!(deleted, 1);
    let rows = client
        .query("SELECT * FROM gear WHERE id = ?", &[id.into()])
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn scalar_reads_first_column_of_first_row() {
    let dir = TempDir::new().unwrap();
    let client = open_client(&dir).await;
    client.create_table_if_not_exists(&gear_schema()).await.unwrap();

    for name in ["a", "b", "c"] {
        client
            .insert("gear", &Row::new().with("name", name))
            .await
            .unwrap();
    }
    let count = client
        .scalar_i64("SELECT COUNT(*) FROM gear", &[])
        .await
        .unwrap();
    assert_eq!(count, Some(3));
}

#[tokio::test]
async fn hostile_identifiers_are_rejected() {
    let dir = TempDir::new().unwrap();
    let client = open_client(&dir).await;
    client.create_table_if_not_exists(&gear_schema()).await.unwrap();

    let result = client
        .insert("gear; DROP TABLE gear;--", &Row::new().with("name", "x"))
        .await;
    assert!(result.is_err());

    let result = client
        .insert("gear", &Row::new().with("name\" TEXT); DROP", "x"))
        .await;
    assert!(result.is_err());
    assert!(client.table_exists("gear").await.unwrap());
}
