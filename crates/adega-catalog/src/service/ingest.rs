//! Transactional batch ingestion
//!
//! One upload = one batch. The batch row, every merged client upsert, every
//! inventory line, and the final counters are written inside a single
//! transaction: a partial failure leaves no batch visible, and the previous
//! upload stays current until the new one commits.

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime};
use sea_orm::*;
use tracing::{info, warn};

use adega_common::AdegaError;
use adega_persistence::entity::{catalog_client, inventory_item, upload_batch};

use crate::csv::{load_clients_csv, load_inventory_csv};
use crate::merge::merge_clients_with_snapshots;
use crate::model::{BatchSummary, CatalogStats, ClientRecord};

/// One uploaded CSV payload.
pub struct CsvUpload<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

/// Ingest a pair of CSV exports as a new upload batch.
pub async fn ingest(
    db: &DatabaseConnection,
    clients_csv: CsvUpload<'_>,
    inventory_csv: CsvUpload<'_>,
) -> anyhow::Result<BatchSummary> {
    if clients_csv.bytes.is_empty() || inventory_csv.bytes.is_empty() {
        return Err(AdegaError::Validation(
            "both CSV files (client registry and inventory ledger) are required".to_string(),
        )
        .into());
    }

    let clients = load_clients_csv(clients_csv.bytes)?;
    let inventory = load_inventory_csv(inventory_csv.bytes)?;
    let merged = merge_clients_with_snapshots(&clients.by_code, &inventory.by_client);
    let skipped_rows = clients.skipped_rows + inventory.skipped_rows;
    if skipped_rows > 0 {
        warn!(
            skipped_rows,
            "ingestion dropped unparseable or non-open rows"
        );
    }

    let now = Local::now().naive_local();
    let tx = db.begin().await?;

    let batch = upload_batch::ActiveModel {
        clients_file_name: Set(clients_csv.file_name.to_string()),
        inventory_file_name: Set(inventory_csv.file_name.to_string()),
        clients_count: Set(0),
        inventory_clients: Set(0),
        open_items: Set(0),
        skipped_rows: Set(0),
        uploaded_at: Set(now),
        ..Default::default()
    }
    .insert(&tx)
    .await?;

    // Upsert every merged client, keyed by canonical code.
    let codes: Vec<&str> = merged.keys().map(String::as_str).collect();
    let existing: HashMap<String, catalog_client::Model> = catalog_client::Entity::find()
        .filter(catalog_client::Column::ClientCode.is_in(codes))
        .all(&tx)
        .await?
        .into_iter()
        .map(|model| (model.client_code.clone(), model))
        .collect();

    let mut client_ids: HashMap<String, i32> = HashMap::new();
    for (code, record) in &merged {
        let id = match existing.get(code) {
            Some(model) => {
                let mut active: catalog_client::ActiveModel = model.clone().into();
                apply_record(&mut active, record, now);
                active.update(&tx).await?.id
            }
            None => {
                let mut active = catalog_client::ActiveModel {
                    client_code: Set(code.clone()),
                    created_at: Set(now),
                    ..Default::default()
                };
                apply_record(&mut active, record, now);
                active.insert(&tx).await?.id
            }
        };
        client_ids.insert(code.clone(), id);
    }

    let mut open_items = 0i32;
    for (code, items) in &inventory.by_client {
        let client_id = match client_ids.get(code) {
            Some(id) => *id,
            None => {
                // Inventory-only code that slipped past the merger.
                let mut active = catalog_client::ActiveModel {
                    client_code: Set(code.clone()),
                    created_at: Set(now),
                    ..Default::default()
                };
                apply_record(&mut active, &ClientRecord::default(), now);
                let id = active.insert(&tx).await?.id;
                client_ids.insert(code.clone(), id);
                id
            }
        };

        for item in items {
            inventory_item::ActiveModel {
                client_id: Set(client_id),
                batch_id: Set(Some(batch.id)),
                description: Set(item.description.clone()),
                item_type: Set(item.item_type.as_str().to_string()),
                open_quantity: Set(item.open_quantity),
                rg: Set(item.rg.clone()),
                comodato_number: Set(item.comodato_number.clone()),
                invoice_issue_date: Set(item.issue_date.clone()),
                volume_key: Set(item.volume_key.clone()),
                source_baixados: Set(item.source_baixados),
                product_code: Set(item.product_code.clone()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&tx)
            .await?;
            open_items += 1;
        }
    }

    let stats = CatalogStats {
        clients_count: merged.len() as i32,
        inventory_clients: inventory.by_client.len() as i32,
        open_items,
    };
    let mut batch_active: upload_batch::ActiveModel = batch.into();
    batch_active.clients_count = Set(stats.clients_count);
    batch_active.inventory_clients = Set(stats.inventory_clients);
    batch_active.open_items = Set(stats.open_items);
    batch_active.skipped_rows = Set(skipped_rows as i32);
    let batch = batch_active.update(&tx).await?;

    tx.commit().await?;
    info!(
        batch_id = batch.id,
        clients = stats.clients_count,
        open_items = stats.open_items,
        "catalog upload ingested"
    );

    Ok(BatchSummary {
        batch_id: batch.id,
        stats,
        skipped_rows,
    })
}

/// Copy a merged record's payload fields onto an active model. The canonical
/// code is never rewritten; it is the row's identity.
fn apply_record(
    active: &mut catalog_client::ActiveModel,
    record: &ClientRecord,
    now: NaiveDateTime,
) {
    active.nome_fantasia = Set(record.nome_fantasia.clone());
    active.razao_social = Set(record.razao_social.clone());
    active.cnpj_cpf = Set(record.cnpj_cpf.clone());
    active.setor = Set(record.setor.clone());
    active.telefone = Set(record.telefone.clone());
    active.endereco = Set(record.endereco.clone());
    active.bairro = Set(record.bairro.clone());
    active.cidade = Set(record.cidade.clone());
    active.cep = Set(record.cep.clone());
    active.inscricao_estadual = Set(record.inscricao_estadual.clone());
    active.responsavel_cliente = Set(record.responsavel_cliente.clone());
    active.responsavel_retirada = Set(record.responsavel_retirada.clone());
    active.responsavel_conferencia = Set(record.responsavel_conferencia.clone());
    active.updated_at = Set(now);
}
