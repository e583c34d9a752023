//! Client lookup
//!
//! Resolves a possibly unformatted client code against the registry and
//! returns the merged record plus its current-batch open items. Manual
//! contact fields are always blanked on the way out.

use sea_orm::*;

use adega_common::{canonical_code, normalize_spaces};
use adega_persistence::entity::{catalog_client, inventory_item};

use crate::cep::CepResolver;
use crate::model::{ClientLookup, ClientRecord, InventoryItemView, ItemType};
use crate::service::batch::BatchScope;

/// Look up a client and its current open inventory by code.
pub async fn find_client(
    db: &DatabaseConnection,
    cep: Option<&CepResolver>,
    raw_code: &str,
) -> anyhow::Result<ClientLookup> {
    let search_code = canonical_code(raw_code);
    if search_code.is_empty() {
        return Ok(ClientLookup::default());
    }

    let model = catalog_client::Entity::find()
        .filter(catalog_client::Column::ClientCode.eq(search_code.as_str()))
        .one(db)
        .await?;

    let mut items = Vec::new();
    if let Some(model) = &model {
        let scope = BatchScope::resolve(db).await?;
        let rows = scope
            .apply(
                inventory_item::Entity::find()
                    .filter(inventory_item::Column::ClientId.eq(model.id)),
            )
            .order_by_asc(inventory_item::Column::ItemType)
            .order_by_asc(inventory_item::Column::Description)
            .all(db)
            .await?;
        items = rows.iter().map(inventory_item_view).collect();
    }

    let mut client = match &model {
        Some(model) => ClientRecord::from(model),
        None => ClientRecord {
            client_code: search_code.clone(),
            ..Default::default()
        },
    };
    if let Some(resolver) = cep {
        resolver.ensure_client_cep(&mut client).await;
    }
    client.clear_manual_fields();

    Ok(ClientLookup {
        found_anything: model.is_some() || !items.is_empty(),
        matched_code: search_code,
        client,
        items,
    })
}

/// Read-side mapping of a stored inventory row.
pub(crate) fn inventory_item_view(item: &inventory_item::Model) -> InventoryItemView {
    let item_type = ItemType::from_stored(item.item_type.trim());
    InventoryItemView {
        id: item.id,
        description: normalize_spaces(&item.description),
        item_type,
        type_label: item_type.label().to_string(),
        open_quantity: item.open_quantity,
        rg: normalize_spaces(&item.rg),
        comodato_number: normalize_spaces(&item.comodato_number),
        issue_date: normalize_spaces(&item.invoice_issue_date),
        volume_key: normalize_spaces(&item.volume_key),
    }
}
