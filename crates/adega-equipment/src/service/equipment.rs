//! Equipment registry CRUD
//!
//! Create/update paths normalize the category, status, and voltage
//! vocabularies, enforce RG/tag uniqueness ahead of the insert, and refuse
//! to persist a refrigerator as new/available when the current ledger
//! already shows its codes deployed at a client.

use chrono::Local;
use sea_orm::*;
use tracing::info;

use adega_common::{AdegaError, normalize_spaces};
use adega_persistence::entity::equipment;

use crate::model::{
    Category, EquipmentFilter, EquipmentForm, EquipmentStatus, EquipmentUpdate, EquipmentView,
    normalize_optional_code, normalize_voltage, optional_text,
};
use crate::service::allocation::is_allocated;

const DEFAULT_LIST_LIMIT: u64 = 120;
const MAX_LIST_LIMIT: u64 = 400;

const ALLOCATION_CONFLICT_MESSAGE: &str =
    "unit already appears allocated to a client in the current inventory ledger for the given RG \
     or tag; it cannot be saved as available";

/// Register a new unit.
pub async fn create_equipment(
    db: &DatabaseConnection,
    form: &EquipmentForm,
) -> anyhow::Result<EquipmentView> {
    let category = Category::parse(&form.category)?;
    let is_refrigerator = category == Category::Refrigerador;
    let status = if is_refrigerator {
        EquipmentStatus::parse(&form.status)?
    } else {
        EquipmentStatus::Novo
    };
    let model_name = normalize_spaces(&form.model_name);
    let brand = normalize_spaces(&form.brand);
    let quantity = normalize_quantity(form.quantity, !is_refrigerator)?;
    let voltage = if is_refrigerator {
        normalize_voltage(&form.voltage)?
    } else {
        String::new()
    };
    let rg_code = normalize_optional_code(&form.rg_code);
    let tag_code = normalize_optional_code(&form.tag_code);
    let mut client_name = if is_refrigerator {
        optional_text(&form.client_name)
    } else {
        None
    };
    let notes = optional_text(&form.notes);

    if model_name.is_empty() {
        return Err(AdegaError::Validation("model name is required".to_string()).into());
    }
    if brand.is_empty() {
        return Err(AdegaError::Validation("brand is required".to_string()).into());
    }
    if is_refrigerator && voltage.is_empty() {
        return Err(
            AdegaError::Validation("voltage is required for refrigerators".to_string()).into(),
        );
    }
    if is_refrigerator && rg_code.is_none() {
        return Err(
            AdegaError::Validation("RG code is required for refrigerators".to_string()).into(),
        );
    }
    if is_refrigerator && status == EquipmentStatus::Alocado && client_name.is_none() {
        return Err(AdegaError::Validation(
            "client name is required when the unit is allocated".to_string(),
        )
        .into());
    }
    if status != EquipmentStatus::Alocado {
        client_name = None;
    }

    ensure_unique_codes(db, rg_code.as_deref(), tag_code.as_deref(), None).await?;
    if is_refrigerator
        && status.is_unallocated_stock()
        && is_allocated(db, rg_code.as_deref(), tag_code.as_deref()).await?
    {
        return Err(AdegaError::Conflict(ALLOCATION_CONFLICT_MESSAGE.to_string()).into());
    }

    let now = Local::now().naive_local();
    let model = equipment::ActiveModel {
        category: Set(category.as_str().to_string()),
        model_name: Set(model_name),
        brand: Set(brand),
        quantity: Set(if is_refrigerator { 1 } else { quantity }),
        voltage: Set(voltage),
        rg_code: Set(rg_code),
        tag_code: Set(tag_code),
        status: Set(status.as_str().to_string()),
        client_name: Set(client_name),
        notes: Set(notes),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(equipment_id = model.id, status = %model.status, "equipment registered");
    Ok(EquipmentView::from(&model))
}

/// Partially update a unit; absent fields keep their stored values. The
/// ledger-conflict guard fires only when the codes or status actually
/// change.
pub async fn update_equipment(
    db: &DatabaseConnection,
    equipment_id: i32,
    update: &EquipmentUpdate,
) -> anyhow::Result<EquipmentView> {
    let Some(row) = equipment::Entity::find_by_id(equipment_id).one(db).await? else {
        return Err(AdegaError::NotFound(format!("equipment {equipment_id}")).into());
    };

    let category = match &update.category {
        Some(value) => Category::parse(value)?,
        None => Category::parse(&row.category).unwrap_or_default(),
    };
    let is_refrigerator = category == Category::Refrigerador;
    let model_name = match &update.model_name {
        Some(value) => normalize_spaces(value),
        None => row.model_name.clone(),
    };
    let brand = match &update.brand {
        Some(value) => normalize_spaces(value),
        None => row.brand.clone(),
    };
    let quantity = match update.quantity {
        Some(value) => normalize_quantity(Some(value), !is_refrigerator)?,
        None => row.quantity.max(1),
    };
    let voltage = match (&update.voltage, is_refrigerator) {
        (Some(value), true) => normalize_voltage(value)?,
        (None, true) => row.voltage.clone(),
        (_, false) => String::new(),
    };
    let rg_code = match &update.rg_code {
        Some(value) => normalize_optional_code(value),
        None => row.rg_code.clone(),
    };
    let tag_code = match &update.tag_code {
        Some(value) => normalize_optional_code(value),
        None => row.tag_code.clone(),
    };
    let status = if is_refrigerator {
        match &update.status {
            Some(value) => EquipmentStatus::parse(value)?,
            None => row.status.parse().unwrap_or_default(),
        }
    } else {
        EquipmentStatus::Novo
    };
    let mut client_name = if is_refrigerator {
        match &update.client_name {
            Some(value) => optional_text(value),
            None => row.client_name.clone(),
        }
    } else {
        None
    };
    let notes = match &update.notes {
        Some(value) => optional_text(value),
        None => row.notes.clone(),
    };

    if model_name.is_empty() {
        return Err(AdegaError::Validation("model name is required".to_string()).into());
    }
    if brand.is_empty() {
        return Err(AdegaError::Validation("brand is required".to_string()).into());
    }
    if is_refrigerator && voltage.is_empty() {
        return Err(
            AdegaError::Validation("voltage is required for refrigerators".to_string()).into(),
        );
    }
    if is_refrigerator && rg_code.is_none() {
        return Err(
            AdegaError::Validation("RG code is required for refrigerators".to_string()).into(),
        );
    }
    if is_refrigerator && status == EquipmentStatus::Alocado && client_name.is_none() {
        return Err(AdegaError::Validation(
            "client name is required when the unit is allocated".to_string(),
        )
        .into());
    }
    if status != EquipmentStatus::Alocado {
        client_name = None;
    }

    ensure_unique_codes(db, rg_code.as_deref(), tag_code.as_deref(), Some(row.id)).await?;
    let codes_or_status_changed = row.rg_code != rg_code
        || row.tag_code != tag_code
        || row.status != status.as_str();
    if is_refrigerator
        && status.is_unallocated_stock()
        && codes_or_status_changed
        && is_allocated(db, rg_code.as_deref(), tag_code.as_deref()).await?
    {
        return Err(AdegaError::Conflict(ALLOCATION_CONFLICT_MESSAGE.to_string()).into());
    }

    let mut active: equipment::ActiveModel = row.into();
    active.category = Set(category.as_str().to_string());
    active.model_name = Set(model_name);
    active.brand = Set(brand);
    active.quantity = Set(if is_refrigerator { 1 } else { quantity });
    active.voltage = Set(voltage);
    active.rg_code = Set(rg_code);
    active.tag_code = Set(tag_code);
    active.status = Set(status.as_str().to_string());
    active.client_name = Set(client_name);
    active.notes = Set(notes);
    active.updated_at = Set(Local::now().naive_local());
    let updated = active.update(db).await?;

    Ok(EquipmentView::from(&updated))
}

/// Remove a unit from the registry.
pub async fn delete_equipment(db: &DatabaseConnection, equipment_id: i32) -> anyhow::Result<()> {
    let Some(row) = equipment::Entity::find_by_id(equipment_id).one(db).await? else {
        return Err(AdegaError::NotFound(format!("equipment {equipment_id}")).into());
    };
    equipment::Entity::delete_by_id(row.id).exec(db).await?;
    Ok(())
}

/// List registered units, newest first.
pub async fn list_equipments(
    db: &DatabaseConnection,
    filter: &EquipmentFilter,
) -> anyhow::Result<Vec<EquipmentView>> {
    let mut query = equipment::Entity::find();

    if let Some(category) = &filter.category {
        query = query.filter(equipment::Column::Category.eq(Category::parse(category)?.as_str()));
    }
    if let Some(status) = &filter.status {
        query = query.filter(equipment::Column::Status.eq(EquipmentStatus::parse(status)?.as_str()));
    }
    if let Some(client_name) = &filter.client_name {
        let client_name = normalize_spaces(client_name);
        if !client_name.is_empty() {
            query = query.filter(equipment::Column::ClientName.contains(&client_name));
        }
    }
    if let Some(search) = &filter.search {
        let search = normalize_spaces(search);
        if !search.is_empty() {
            query = query.filter(
                Condition::any()
                    .add(equipment::Column::ModelName.contains(&search))
                    .add(equipment::Column::Brand.contains(&search))
                    .add(equipment::Column::Voltage.contains(&search))
                    .add(equipment::Column::RgCode.contains(&search))
                    .add(equipment::Column::TagCode.contains(&search))
                    .add(equipment::Column::ClientName.contains(&search))
                    .add(equipment::Column::Notes.contains(&search)),
            );
        }
    }

    let limit = if filter.limit == 0 {
        DEFAULT_LIST_LIMIT
    } else {
        filter.limit.min(MAX_LIST_LIMIT)
    };
    let rows = query
        .order_by_desc(equipment::Column::CreatedAt)
        .order_by_desc(equipment::Column::Id)
        .offset(filter.offset)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows.iter().map(EquipmentView::from).collect())
}

/// RG and tag codes are each globally unique when present; checked ahead of
/// the write so callers get a named conflict instead of a driver error.
pub(crate) async fn ensure_unique_codes(
    db: &DatabaseConnection,
    rg_code: Option<&str>,
    tag_code: Option<&str>,
    current_id: Option<i32>,
) -> anyhow::Result<()> {
    if let Some(rg) = rg_code {
        let mut query = equipment::Entity::find().filter(equipment::Column::RgCode.eq(rg));
        if let Some(id) = current_id {
            query = query.filter(equipment::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(AdegaError::Conflict("RG code already registered".to_string()).into());
        }
    }
    if let Some(tag) = tag_code {
        let mut query = equipment::Entity::find().filter(equipment::Column::TagCode.eq(tag));
        if let Some(id) = current_id {
            query = query.filter(equipment::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(AdegaError::Conflict("tag code already registered".to_string()).into());
        }
    }
    Ok(())
}

fn normalize_quantity(value: Option<i32>, required: bool) -> Result<i32, AdegaError> {
    match value {
        None if required => Err(AdegaError::Validation(
            "quantity is required for this category".to_string(),
        )),
        None => Ok(1),
        Some(quantity) if quantity < 1 => Err(AdegaError::Validation(
            "quantity must be greater than zero".to_string(),
        )),
        Some(quantity) => Ok(quantity),
    }
}
