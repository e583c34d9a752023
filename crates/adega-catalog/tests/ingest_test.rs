// Integration tests for batch ingestion, latest-batch supersession, and
// client lookup, run against in-memory SQLite.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use adega_catalog::service::{CsvUpload, catalog_status, find_client, ingest};
use adega_common::AdegaError;

async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.expect("connect sqlite");
    adega_persistence::schema::create_tables(&db)
        .await
        .expect("create tables");
    db
}

fn upload<'a>(file_name: &'a str, content: &'a str) -> CsvUpload<'a> {
    CsvUpload {
        file_name,
        bytes: content.as_bytes(),
    }
}

const CLIENTS_CSV: &str = "codigo;nome fantasia;cidade;telefone\n\
                           001001;Nome Fantasia X;Registro;11 99999-0000\n";

const INVENTORY_CSV: &str =
    "codigo;descricao;baixados;nro serie mercadoria\n1001;VISA COOLER;-1;RG-777\n";

#[tokio::test]
async fn test_round_trip_resolves_one_canonical_client() {
    let db = test_db().await;

    // Registry says "001001", ledger says "1001": same canonical client.
    let summary = ingest(
        &db,
        upload("01.20.11.csv", CLIENTS_CSV),
        upload("02.02.20.csv", INVENTORY_CSV),
    )
    .await
    .expect("ingest");
    assert_eq!(summary.stats.clients_count, 1);
    assert_eq!(summary.stats.inventory_clients, 1);
    assert_eq!(summary.stats.open_items, 1);

    let lookup = find_client(&db, None, "001001").await.expect("lookup");
    assert_eq!(lookup.matched_code, "1001");
    assert!(lookup.found_anything);
    assert_eq!(lookup.client.nome_fantasia, "Nome Fantasia X");
    assert_eq!(lookup.items.len(), 1);
    assert_eq!(lookup.items[0].rg, "RG-777");

    // Same client under its ledger spelling.
    let lookup = find_client(&db, None, "1001").await.expect("lookup");
    assert!(lookup.found_anything);
    assert_eq!(lookup.items.len(), 1);
}

#[tokio::test]
async fn test_second_batch_supersedes_first() {
    let db = test_db().await;

    ingest(
        &db,
        upload("clients.csv", CLIENTS_CSV),
        upload("inventory.csv", INVENTORY_CSV),
    )
    .await
    .expect("first ingest");

    let second_inventory = "codigo;descricao;baixados;nro serie mercadoria\n\
                            1001;CERVEJEIRA NOVA;-2;RG-888\n";
    let summary = ingest(
        &db,
        upload("clients.csv", CLIENTS_CSV),
        upload("inventory.csv", second_inventory),
    )
    .await
    .expect("second ingest");
    assert_eq!(summary.stats.open_items, 1);

    // Only the latest batch is visible even though first-batch rows remain
    // in storage.
    let lookup = find_client(&db, None, "1001").await.expect("lookup");
    assert_eq!(lookup.items.len(), 1);
    assert_eq!(lookup.items[0].rg, "RG-888");
    assert_eq!(lookup.items[0].description, "CERVEJEIRA NOVA");

    let status = catalog_status(&db).await.expect("status");
    assert!(status.dataset_ready);
    assert_eq!(status.stats.open_items, 1);
    assert!(status.loaded_at.is_some());
}

#[tokio::test]
async fn test_reupload_updates_client_in_place() {
    let db = test_db().await;

    ingest(
        &db,
        upload("clients.csv", CLIENTS_CSV),
        upload("inventory.csv", INVENTORY_CSV),
    )
    .await
    .expect("first ingest");

    let renamed = "codigo;nome fantasia;cidade\n001001;Novo Nome;Registro\n";
    let summary = ingest(
        &db,
        upload("clients.csv", renamed),
        upload("inventory.csv", INVENTORY_CSV),
    )
    .await
    .expect("second ingest");
    // Upsert, not duplicate: still a single client.
    assert_eq!(summary.stats.clients_count, 1);

    let lookup = find_client(&db, None, "1001").await.expect("lookup");
    assert_eq!(lookup.client.nome_fantasia, "Novo Nome");
}

#[tokio::test]
async fn test_manual_fields_are_blanked_on_read() {
    let db = test_db().await;

    ingest(
        &db,
        upload("clients.csv", CLIENTS_CSV),
        upload("inventory.csv", INVENTORY_CSV),
    )
    .await
    .expect("ingest");

    let lookup = find_client(&db, None, "1001").await.expect("lookup");
    // The CSV carried a phone number, but contact fields must be re-entered
    // by staff on every withdrawal.
    assert_eq!(lookup.client.telefone, "");
    assert_eq!(lookup.client.cidade, "Registro");
}

#[tokio::test]
async fn test_empty_upload_is_rejected() {
    let db = test_db().await;

    let error = ingest(&db, upload("clients.csv", ""), upload("inventory.csv", INVENTORY_CSV))
        .await
        .expect_err("empty upload must fail");
    assert!(matches!(
        error.downcast_ref::<AdegaError>(),
        Some(AdegaError::Validation(_))
    ));
}

#[tokio::test]
async fn test_missing_required_column_is_named() {
    let db = test_db().await;

    let no_balance = "codigo;descricao\n1001;VISA COOLER\n";
    let error = ingest(
        &db,
        upload("clients.csv", CLIENTS_CSV),
        upload("inventory.csv", no_balance),
    )
    .await
    .expect_err("missing balance column must fail");
    match error.downcast_ref::<AdegaError>() {
        Some(AdegaError::MissingColumn(field)) => assert_eq!(field, "baixados or saldo"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_client_lookup_synthesizes_blank_record() {
    let db = test_db().await;

    let lookup = find_client(&db, None, "42-42").await.expect("lookup");
    assert!(!lookup.found_anything);
    assert_eq!(lookup.matched_code, "4242");
    assert_eq!(lookup.client.client_code, "4242");
    assert!(lookup.items.is_empty());
}
