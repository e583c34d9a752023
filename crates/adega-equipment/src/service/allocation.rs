//! Allocation-matching / sync engine
//!
//! Units manually marked new/available in the local registry may already be
//! deployed at a client according to the latest inventory ledger. This
//! module finds those conflicts: it builds the set of lookup tokens for
//! every refrigerator-classified serial in the current batch and matches
//! registry codes against it by token-set intersection, so punctuation,
//! leading zeros, and case drift still match.

use std::collections::{HashMap, HashSet};

use chrono::{Local, NaiveDate, NaiveDateTime};
use sea_orm::*;
use tracing::info;

use adega_catalog::classify::{classify_item_type, material_type_bucket};
use adega_catalog::model::ItemType;
use adega_catalog::service::batch::BatchScope;
use adega_common::{AdegaError, code_lookup_tokens, normalize_spaces};
use adega_persistence::entity::{catalog_client, equipment, inventory_item};

use crate::model::{
    AllocationLookup, AllocationLookupItem, Category, EquipmentStatus, SyncOutcome,
    normalize_optional_code,
};

const INVOICE_DATE_FORMATS: [&str; 5] =
    ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%y", "%Y/%m/%d"];

/// Union of the lookup tokens of a unit's RG and tag codes.
pub fn equipment_lookup_tokens(rg_code: Option<&str>, tag_code: Option<&str>) -> HashSet<String> {
    let mut tokens = HashSet::new();
    if let Some(rg) = rg_code {
        tokens.extend(code_lookup_tokens(rg));
    }
    if let Some(tag) = tag_code {
        tokens.extend(code_lookup_tokens(tag));
    }
    tokens
}

/// Lookup tokens of every refrigerator serial the current ledger shows as
/// still open at a client. Rows with a generic stored type are re-classified
/// from their description before being counted.
pub async fn allocated_tokens_from_ledger<C: ConnectionTrait>(
    db: &C,
) -> anyhow::Result<HashSet<String>> {
    let scope = BatchScope::resolve(db).await?;
    let rows = scope
        .apply(inventory_item::Entity::find().filter(inventory_item::Column::OpenQuantity.gt(0)))
        .all(db)
        .await?;

    let mut tokens = HashSet::new();
    for row in rows {
        let stored_bucket = material_type_bucket(row.item_type.trim());
        if stored_bucket != ItemType::Refrigerador {
            let description = normalize_spaces(&row.description);
            let inferred = material_type_bucket(classify_item_type(&description).as_str());
            if inferred != ItemType::Refrigerador {
                continue;
            }
        }
        tokens.extend(code_lookup_tokens(&row.rg));
    }
    Ok(tokens)
}

/// Token-set intersection test against a prebuilt ledger set.
pub fn tokens_intersect(
    allocated: &HashSet<String>,
    rg_code: Option<&str>,
    tag_code: Option<&str>,
) -> bool {
    let tokens = equipment_lookup_tokens(rg_code, tag_code);
    !tokens.is_empty() && !tokens.is_disjoint(allocated)
}

/// Is this unit already shown as deployed by the current ledger?
pub async fn is_allocated(
    db: &DatabaseConnection,
    rg_code: Option<&str>,
    tag_code: Option<&str>,
) -> anyhow::Result<bool> {
    let tokens = equipment_lookup_tokens(rg_code, tag_code);
    if tokens.is_empty() {
        return Ok(false);
    }
    let allocated = allocated_tokens_from_ledger(db).await?;
    Ok(!tokens.is_disjoint(&allocated))
}

/// Flip every new/available refrigerator the ledger shows as deployed to
/// "alocado". The whole pass commits once; counts are reported even when
/// nothing matched, and a second run with an unchanged ledger updates
/// nothing.
pub async fn sync_allocation_status(db: &DatabaseConnection) -> anyhow::Result<SyncOutcome> {
    let rows = equipment::Entity::find()
        .filter(equipment::Column::Category.eq(Category::Refrigerador.as_str()))
        .filter(equipment::Column::Status.is_in([
            EquipmentStatus::Novo.as_str(),
            EquipmentStatus::Disponivel.as_str(),
        ]))
        .all(db)
        .await?;
    let scanned_count = rows.len();
    if scanned_count == 0 {
        return Ok(SyncOutcome::default());
    }

    let allocated = allocated_tokens_from_ledger(db).await?;
    if allocated.is_empty() {
        return Ok(SyncOutcome {
            scanned_count,
            ..Default::default()
        });
    }

    let now = Local::now().naive_local();
    let tx = db.begin().await?;
    let mut updated_ids = Vec::new();
    for row in rows {
        if !tokens_intersect(&allocated, row.rg_code.as_deref(), row.tag_code.as_deref()) {
            continue;
        }
        let id = row.id;
        let mut active: equipment::ActiveModel = row.into();
        active.status = Set(EquipmentStatus::Alocado.as_str().to_string());
        active.updated_at = Set(now);
        active.update(&tx).await?;
        updated_ids.push(id);
    }
    tx.commit().await?;

    info!(
        scanned = scanned_count,
        updated = updated_ids.len(),
        "allocation sync finished"
    );
    Ok(SyncOutcome {
        scanned_count,
        matched_count: updated_ids.len(),
        updated_count: updated_ids.len(),
        updated_ids,
    })
}

/// Find where a unit shows up as deployed per the current ledger. A missing
/// RG or tag is resolved from the registry before matching.
pub async fn lookup_allocation(
    db: &DatabaseConnection,
    rg_code: Option<&str>,
    tag_code: Option<&str>,
) -> anyhow::Result<AllocationLookup> {
    let mut resolved_rg = rg_code.and_then(normalize_optional_code);
    let mut resolved_tag = tag_code.and_then(normalize_optional_code);
    if resolved_rg.is_none() && resolved_tag.is_none() {
        return Err(
            AdegaError::Validation("provide an RG or tag code for the lookup".to_string()).into(),
        );
    }

    if resolved_rg.is_none() {
        if let Some(tag) = &resolved_tag {
            let found = equipment::Entity::find()
                .filter(equipment::Column::TagCode.eq(tag.as_str()))
                .order_by_desc(equipment::Column::Id)
                .one(db)
                .await?;
            resolved_rg = found
                .and_then(|model| model.rg_code)
                .as_deref()
                .and_then(normalize_optional_code);
        }
    }
    if resolved_tag.is_none() {
        if let Some(rg) = &resolved_rg {
            let found = equipment::Entity::find()
                .filter(equipment::Column::RgCode.eq(rg.as_str()))
                .order_by_desc(equipment::Column::Id)
                .one(db)
                .await?;
            resolved_tag = found
                .and_then(|model| model.tag_code)
                .as_deref()
                .and_then(normalize_optional_code);
        }
    }

    let rg_out = resolved_rg.clone().unwrap_or_default();
    let tag_out = resolved_tag.clone().unwrap_or_default();
    let target_tokens = equipment_lookup_tokens(resolved_rg.as_deref(), resolved_tag.as_deref());
    if target_tokens.is_empty() {
        return Ok(AllocationLookup {
            rg_code: rg_out,
            tag_code: tag_out,
            total: 0,
            items: Vec::new(),
        });
    }

    let scope = BatchScope::resolve(db).await?;
    let rows = scope
        .apply(inventory_item::Entity::find().filter(inventory_item::Column::OpenQuantity.gt(0)))
        .all(db)
        .await?;
    let mut matched: Vec<inventory_item::Model> = rows
        .into_iter()
        .filter(|row| {
            let row_tokens = code_lookup_tokens(&row.rg);
            !row_tokens.is_empty() && !target_tokens.is_disjoint(&row_tokens)
        })
        .collect();

    let client_ids: HashSet<i32> = matched.iter().map(|row| row.client_id).collect();
    let clients: HashMap<i32, catalog_client::Model> = catalog_client::Entity::find()
        .filter(catalog_client::Column::Id.is_in(client_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|model| (model.id, model))
        .collect();

    matched.sort_by_cached_key(|row| {
        let fantasia = clients
            .get(&row.client_id)
            .map(|client| client.nome_fantasia.to_lowercase())
            .unwrap_or_default();
        (
            parse_issue_date(&row.invoice_issue_date, row.created_at),
            fantasia,
            row.id,
        )
    });
    matched.reverse();

    let items: Vec<AllocationLookupItem> = matched
        .iter()
        .map(|row| {
            let client = clients.get(&row.client_id);
            AllocationLookupItem {
                inventory_item_id: row.id,
                rg_code: normalize_spaces(&row.rg),
                tag_code: tag_out.clone(),
                client_code: client
                    .map(|c| normalize_spaces(&c.client_code))
                    .unwrap_or_default(),
                nome_fantasia: client
                    .map(|c| normalize_spaces(&c.nome_fantasia))
                    .unwrap_or_default(),
                setor: client.map(|c| normalize_spaces(&c.setor)).unwrap_or_default(),
                model_name: normalize_spaces(&row.description),
                invoice_issue_date: normalize_spaces(&row.invoice_issue_date),
            }
        })
        .collect();

    Ok(AllocationLookup {
        rg_code: rg_out,
        tag_code: tag_out,
        total: items.len(),
        items,
    })
}

/// Ledger issue dates arrive in whatever format the export used that week;
/// unparseable values fall back to the row's insertion time.
pub(crate) fn parse_issue_date(raw: &str, fallback: NaiveDateTime) -> NaiveDateTime {
    let text = normalize_spaces(raw);
    if !text.is_empty() {
        for format in INVOICE_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
                if let Some(timestamp) = date.and_hms_opt(0, 0, 0) {
                    return timestamp;
                }
            }
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equipment_lookup_tokens_unions_both_codes() {
        let tokens = equipment_lookup_tokens(Some("RG-001"), Some("TAG 9"));
        assert!(tokens.contains("RG001"));
        assert!(tokens.contains("001"));
        assert!(tokens.contains("TAG9"));
        assert!(equipment_lookup_tokens(None, None).is_empty());
    }

    #[test]
    fn test_tokens_intersect_matches_formatting_drift() {
        let ledger: HashSet<String> = code_lookup_tokens("rg-001");
        assert!(tokens_intersect(&ledger, Some("RG001"), None));
        assert!(!tokens_intersect(&ledger, Some("RG-002"), None));
        assert!(!tokens_intersect(&ledger, None, None));
    }

    #[test]
    fn test_parse_issue_date_formats() {
        let fallback = NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let parsed = parse_issue_date("22/02/2026", fallback);
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2026, 2, 22).unwrap());
        let iso = parse_issue_date("2026-02-22", fallback);
        assert_eq!(iso.date(), NaiveDate::from_ymd_opt(2026, 2, 22).unwrap());
        assert_eq!(parse_issue_date("quando der", fallback), fallback);
    }
}
