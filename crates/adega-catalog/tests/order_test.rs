// Integration tests for withdrawal-order issuance and its workflow.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use adega_catalog::model::{
    InventorySelection, ManualItem, OrderStatus, WithdrawalDocument, WithdrawalRequest,
};
use adega_catalog::service::{
    CsvUpload, WithdrawalRenderer, create_withdrawal, delete_order, find_client, ingest,
    list_orders, update_order_status,
};
use adega_common::AdegaError;

struct StubRenderer;

impl WithdrawalRenderer for StubRenderer {
    fn render(&self, document: &WithdrawalDocument) -> anyhow::Result<Vec<u8>> {
        Ok(format!("%PDF {}", document.order_number).into_bytes())
    }
}

async fn seeded_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.expect("connect sqlite");
    adega_persistence::schema::create_tables(&db)
        .await
        .expect("create tables");

    let clients = "codigo;nome fantasia;cidade\n1001;Bar do Ze;Registro\n";
    let inventory = "codigo;descricao;baixados;nro serie mercadoria\n\
                     1001;VISA COOLER;-1;RG-777\n\
                     1001;CAIXA 600 ML;-3;\n";
    ingest(
        &db,
        CsvUpload {
            file_name: "clients.csv",
            bytes: clients.as_bytes(),
        },
        CsvUpload {
            file_name: "inventory.csv",
            bytes: inventory.as_bytes(),
        },
    )
    .await
    .expect("ingest");
    db
}

#[tokio::test]
async fn test_create_withdrawal_issues_numbered_pending_order() {
    let db = seeded_db().await;

    let lookup = find_client(&db, None, "1001").await.expect("lookup");
    let selections: Vec<InventorySelection> = lookup
        .items
        .iter()
        .map(|item| InventorySelection {
            item_id: item.id,
            // Over-asking gets clamped to the open quantity.
            quantity: 99,
        })
        .collect();

    let request = WithdrawalRequest {
        lookup_code: "1001".to_string(),
        client: lookup.client.clone(),
        selected_inventory: selections,
        data_retirada: "2026-08-01".to_string(),
        hora_retirada: "14:00".to_string(),
        ..Default::default()
    };
    let receipt = create_withdrawal(&db, &StubRenderer, None, &request)
        .await
        .expect("create withdrawal");

    assert!(receipt.order.order_number.starts_with("RET-"));
    assert!(receipt.order.order_number.ends_with(&format!("{:06}", receipt.order.id)));
    assert_eq!(receipt.order.status, OrderStatus::Pendente);
    assert_eq!(receipt.order.withdrawal_date, "01/08/2026");
    assert!(receipt.file_name.starts_with("ordem_retirada_1001_"));
    assert!(!receipt.pdf.is_empty());
    // The refrigerator line carries its RG on the summary.
    assert!(receipt.order.summary_line.contains("RG RG-777"));
    // The crate line carries bottle math (3 crates of 600ml = 72 bottles).
    assert!(receipt.order.summary_line.contains("72 garrafas"));

    let orders = list_orders(&db).await.expect("list orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, receipt.order.id);
}

#[tokio::test]
async fn test_create_withdrawal_accepts_manual_lines_only() {
    let db = seeded_db().await;

    let request = WithdrawalRequest {
        lookup_code: "9999".to_string(),
        manual_items: vec![ManualItem {
            description: "MESA PLASTICA".to_string(),
            quantity: 2,
            item_type: "outro".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    };
    let receipt = create_withdrawal(&db, &StubRenderer, None, &request)
        .await
        .expect("create withdrawal");
    assert!(receipt.order.summary_line.contains("MESA PLASTICA - 2"));
}

#[tokio::test]
async fn test_create_withdrawal_requires_a_line() {
    let db = seeded_db().await;

    let request = WithdrawalRequest {
        lookup_code: "1001".to_string(),
        ..Default::default()
    };
    let error = create_withdrawal(&db, &StubRenderer, None, &request)
        .await
        .expect_err("no lines must fail");
    assert!(matches!(
        error.downcast_ref::<AdegaError>(),
        Some(AdegaError::Validation(_))
    ));
}

#[tokio::test]
async fn test_order_workflow_allows_deleting_only_cancelled() {
    let db = seeded_db().await;

    let request = WithdrawalRequest {
        lookup_code: "1001".to_string(),
        manual_items: vec![ManualItem {
            description: "ENGRADADO".to_string(),
            quantity: 1,
            item_type: "vasilhame_caixa".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    };
    let receipt = create_withdrawal(&db, &StubRenderer, None, &request)
        .await
        .expect("create withdrawal");

    let error = delete_order(&db, receipt.order.id)
        .await
        .expect_err("pending orders are not deletable");
    assert!(matches!(
        error.downcast_ref::<AdegaError>(),
        Some(AdegaError::Validation(_))
    ));

    let updated = update_order_status(&db, receipt.order.id, OrderStatus::Cancelada, "gerente")
        .await
        .expect("cancel order");
    assert_eq!(updated.status, OrderStatus::Cancelada);
    assert_eq!(updated.status_changed_by.as_deref(), Some("gerente"));
    assert!(updated.status_changed_at.is_some());

    delete_order(&db, receipt.order.id)
        .await
        .expect("cancelled orders are deletable");
    assert!(list_orders(&db).await.expect("list").is_empty());

    let error = delete_order(&db, receipt.order.id)
        .await
        .expect_err("already deleted");
    assert!(matches!(
        error.downcast_ref::<AdegaError>(),
        Some(AdegaError::NotFound(_))
    ));
}
