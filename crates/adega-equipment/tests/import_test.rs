// Integration tests for the bulk refrigerator CSV import.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use adega_catalog::service::{CsvUpload, ingest};
use adega_common::AdegaError;
use adega_equipment::model::{EquipmentFilter, EquipmentForm, EquipmentStatus};
use adega_equipment::service::{create_equipment, import_equipments_csv, list_equipments};

async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.expect("connect sqlite");
    adega_persistence::schema::create_tables(&db)
        .await
        .expect("create tables");
    db
}

#[tokio::test]
async fn test_import_counts_each_rejection_reason() {
    let db = test_db().await;

    // RG-100 is already deployed per the ledger.
    ingest(
        &db,
        CsvUpload {
            file_name: "clients.csv",
            bytes: b"codigo;nome fantasia\n1001;Bar do Ze\n",
        },
        CsvUpload {
            file_name: "inventory.csv",
            bytes: b"codigo;descricao;baixados;nro serie mercadoria\n1001;GELADEIRA;-1;RG-100\n",
        },
    )
    .await
    .expect("ingest ledger");

    // RG-200 is already in the registry.
    create_equipment(
        &db,
        &EquipmentForm {
            category: "refrigerador".to_string(),
            model_name: "CERVEJEIRA 450L".to_string(),
            brand: "SKOL".to_string(),
            voltage: "110".to_string(),
            rg_code: "RG-200".to_string(),
            tag_code: "TAG-200".to_string(),
            status: "novo".to_string(),
            ..Default::default()
        },
    )
    .await
    .expect("seed registry");

    let csv = "tipo;modelo;marca;voltagem;rg;etiqueta\n\
               refrigerador;VISA COOLER;BRAHMA;220;RG-300;TAG-300\n\
               refrigerador;VISA COOLER;BRAHMA;220;rg 300;TAG-301\n\
               refrigerador;CERVEJEIRA;SKOL;110;RG-200;TAG-302\n\
               refrigerador;GELADEIRA;ANTARCTICA;220;RG-100;TAG-303\n\
               jogo de mesa;JOGO MESA;AMBEV;;RG-400;TAG-304\n\
               refrigerador;FRIGOBAR;CONSUL;440;RG-500;TAG-305\n\
               refrigerador;;CONSUL;220;RG-600;TAG-306\n";
    let report = import_equipments_csv(&db, csv.as_bytes())
        .await
        .expect("import");

    assert_eq!(report.total_rows, 7);
    assert_eq!(report.imported_count, 1);
    assert_eq!(report.duplicates_in_file, 1);
    assert_eq!(report.duplicates_in_registry, 1);
    assert_eq!(report.duplicates_in_ledger, 1);
    assert_eq!(report.duplicated_by_rg, 3);
    assert_eq!(report.ignored_non_refrigerator, 1);
    // Bad voltage and missing model.
    assert_eq!(report.invalid_rows, 2);
    assert_eq!(report.errors.len(), 2);

    let rows = list_equipments(
        &db,
        &EquipmentFilter {
            category: Some("refrigerador".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("list");
    // The seeded unit plus the single imported row.
    assert_eq!(rows.len(), 2);
    let imported = rows
        .iter()
        .find(|row| row.rg_code == "RG-300")
        .expect("imported row present");
    assert_eq!(imported.status, EquipmentStatus::Novo);
    assert_eq!(imported.voltage, "220v");
}

#[tokio::test]
async fn test_import_requires_the_full_header_set() {
    let db = test_db().await;

    let error = import_equipments_csv(&db, b"modelo;marca\nVISA COOLER;BRAHMA\n")
        .await
        .expect_err("missing headers must fail");
    match error.downcast_ref::<AdegaError>() {
        Some(AdegaError::MissingColumn(fields)) => {
            assert!(fields.contains("TIPO"));
            assert!(fields.contains("RG"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_import_rejects_empty_payload() {
    let db = test_db().await;
    let error = import_equipments_csv(&db, b"")
        .await
        .expect_err("empty payload must fail");
    assert!(matches!(
        error.downcast_ref::<AdegaError>(),
        Some(AdegaError::Validation(_))
    ));
}
