//! Withdrawal-order service
//!
//! Issues withdrawal requests against a client's current open inventory:
//! clamps selected quantities, accepts manual lines, copies the client
//! snapshot onto the order, and hands a plain structured document to the
//! PDF-rendering collaborator. Orders carry a workflow status with audit
//! fields and are deletable only once cancelled.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use sea_orm::*;
use tracing::info;

use adega_common::{AdegaError, canonical_code, normalize_spaces};
use adega_persistence::entity::{
    catalog_client, inventory_item, withdrawal_order, withdrawal_order_item,
};

use crate::cep::CepResolver;
use crate::classify::calculate_bottles_for_crates;
use crate::model::{
    ClientField, ClientRecord, InventorySelection, ItemType, ManualItem, OrderStatus, OrderView,
    WithdrawalDocument, WithdrawalLine, WithdrawalReceipt, WithdrawalRequest,
};
use crate::service::batch::BatchScope;

pub const DEFAULT_COMPANY_NAME: &str = "Ribeira Beer";

const ORDER_LIST_LIMIT: u64 = 300;

const RESELLER_LINES: [&str; 4] = [
    "Ribeira Beer Distribuidora de Bebidas Ltda",
    "Rua Arapongal N 40 - Arapongal",
    "Registro - SP",
    "11900-000",
];

const ORDER_COPIES: [&str; 2] = ["Via do Cliente", "Via da Logística"];

static FILENAME_UNSAFE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[^A-Za-z0-9_-]+").expect("Invalid regex pattern"));

/// PDF-rendering collaborator. Layout is the renderer's business; this
/// service hands over a plain structured document and stores or streams
/// whatever bytes come back.
pub trait WithdrawalRenderer: Send + Sync {
    fn render(&self, document: &WithdrawalDocument) -> anyhow::Result<Vec<u8>>;
}

/// Issue a withdrawal order and render its document.
pub async fn create_withdrawal(
    db: &DatabaseConnection,
    renderer: &dyn WithdrawalRenderer,
    cep: Option<&CepResolver>,
    request: &WithdrawalRequest,
) -> anyhow::Result<WithdrawalReceipt> {
    let lookup = if normalize_spaces(&request.client.client_code).is_empty() {
        request.lookup_code.clone()
    } else {
        request.client.client_code.clone()
    };
    let search_code = canonical_code(&lookup);

    let mut client_model = None;
    let mut inventory_items: Vec<inventory_item::Model> = Vec::new();
    if !search_code.is_empty() {
        client_model = catalog_client::Entity::find()
            .filter(catalog_client::Column::ClientCode.eq(search_code.as_str()))
            .one(db)
            .await?;
        if let Some(model) = &client_model {
            let scope = BatchScope::resolve(db).await?;
            inventory_items = scope
                .apply(
                    inventory_item::Entity::find()
                        .filter(inventory_item::Column::ClientId.eq(model.id)),
                )
                .all(db)
                .await?;
        }
    }

    let mut client_data = merge_client_form_with_db(&request.client, client_model.as_ref());
    if normalize_spaces(&client_data.client_code).is_empty() && !search_code.is_empty() {
        client_data.client_code = search_code.clone();
    }
    if let Some(resolver) = cep {
        resolver.ensure_client_cep(&mut client_data).await;
    }

    let inventory_map: HashMap<i32, &inventory_item::Model> =
        inventory_items.iter().map(|item| (item.id, item)).collect();

    let mut selected_lines: Vec<WithdrawalLine> = Vec::new();
    let mut selected_types: BTreeSet<ItemType> = BTreeSet::new();
    for selection in &request.selected_inventory {
        let Some(item) = inventory_map.get(&selection.item_id) else {
            continue;
        };
        let quantity = clamp_selection(selection, item.open_quantity);
        if quantity <= 0 {
            continue;
        }
        let line = line_from_inventory(item, quantity);
        if line.item_type != ItemType::Outro {
            selected_types.insert(line.item_type);
        }
        selected_lines.push(line);
    }
    for manual in &request.manual_items {
        let description = normalize_spaces(&manual.description);
        if description.is_empty() || manual.quantity <= 0 {
            continue;
        }
        let line = line_from_manual(description, manual);
        if line.item_type != ItemType::Outro {
            selected_types.insert(line.item_type);
        }
        selected_lines.push(line);
    }
    if selected_lines.is_empty() {
        return Err(AdegaError::Validation(
            "select at least one item for the withdrawal".to_string(),
        )
        .into());
    }

    let auto_summary = {
        let provided = normalize_spaces(&request.auto_summary);
        if provided.is_empty() {
            build_summary(&selected_lines)
        } else {
            provided
        }
    };
    let extra = normalize_spaces(&request.observacao_extra);
    let observation = if extra.is_empty() {
        auto_summary.clone()
    } else {
        format!("{auto_summary} | {extra}")
    };
    let withdrawal_date = format_brazil_date(&request.data_retirada);
    let withdrawal_time = normalize_spaces(&request.hora_retirada);
    let company_name = {
        let provided = normalize_spaces(&request.company_name);
        if provided.is_empty() {
            DEFAULT_COMPANY_NAME.to_string()
        } else {
            provided
        }
    };
    let open_summary = open_equipment_summary(&inventory_items, &selected_types);

    let now = Local::now().naive_local();
    let tx = db.begin().await?;

    // Backfill a discovered CEP onto the registry row.
    if let Some(model) = &client_model {
        if normalize_spaces(&model.cep).is_empty() && !normalize_spaces(&client_data.cep).is_empty()
        {
            let mut active: catalog_client::ActiveModel = model.clone().into();
            active.cep = Set(client_data.cep.clone());
            active.updated_at = Set(now);
            active.update(&tx).await?;
        }
    }

    let order = withdrawal_order::ActiveModel {
        order_number: Set(None),
        company_name: Set(company_name.clone()),
        client_id: Set(client_model.as_ref().map(|model| model.id)),
        client_code: Set(normalize_spaces(&client_data.client_code)),
        nome_fantasia: Set(normalize_spaces(&client_data.nome_fantasia)),
        razao_social: Set(normalize_spaces(&client_data.razao_social)),
        cnpj_cpf: Set(normalize_spaces(&client_data.cnpj_cpf)),
        setor: Set(normalize_spaces(&client_data.setor)),
        telefone: Set(normalize_spaces(&client_data.telefone)),
        endereco: Set(normalize_spaces(&client_data.endereco)),
        bairro: Set(normalize_spaces(&client_data.bairro)),
        cidade: Set(normalize_spaces(&client_data.cidade)),
        cep: Set(normalize_spaces(&client_data.cep)),
        inscricao_estadual: Set(normalize_spaces(&client_data.inscricao_estadual)),
        responsavel_cliente: Set(normalize_spaces(&client_data.responsavel_cliente)),
        responsavel_retirada: Set(normalize_spaces(&client_data.responsavel_retirada)),
        responsavel_conferencia: Set(normalize_spaces(&client_data.responsavel_conferencia)),
        withdrawal_date: Set(withdrawal_date.clone()),
        withdrawal_time: Set(withdrawal_time.clone()),
        summary_line: Set(auto_summary.clone()),
        observation: Set(observation.clone()),
        selected_types: Set(selected_types
            .iter()
            .map(|item_type| item_type.as_str())
            .collect::<Vec<_>>()
            .join(",")),
        status: Set(OrderStatus::Pendente.as_str().to_string()),
        status_changed_by: Set(None),
        status_changed_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&tx)
    .await?;

    let order_number = format!("RET-{}-{:06}", Local::now().format("%Y%m%d"), order.id);
    let mut order_active: withdrawal_order::ActiveModel = order.into();
    order_active.order_number = Set(Some(order_number.clone()));
    let order = order_active.update(&tx).await?;

    for line in &selected_lines {
        withdrawal_order_item::ActiveModel {
            order_id: Set(order.id),
            description: Set(line.description.clone()),
            item_type: Set(line.item_type.as_str().to_string()),
            quantity: Set(line.quantity),
            quantity_text: Set(line.quantity_text.clone()),
            rg: Set(line.rg.clone()),
            volume_key: Set(line.volume_key.clone()),
            ..Default::default()
        }
        .insert(&tx)
        .await?;
    }
    tx.commit().await?;

    let document = WithdrawalDocument {
        order_number: order_number.clone(),
        company_name,
        client: client_data.clone(),
        items: selected_lines,
        summary_line: auto_summary,
        observation,
        withdrawal_date,
        withdrawal_time,
        generated_at: Local::now().format("%d/%m/%Y %H:%M").to_string(),
        copies: ORDER_COPIES.iter().map(|s| s.to_string()).collect(),
        reseller_lines: RESELLER_LINES.iter().map(|s| s.to_string()).collect(),
        open_equipment_summary: open_summary,
    };
    let pdf = renderer.render(&document)?;

    let chunk = if search_code.is_empty() {
        client_data.client_code.clone()
    } else {
        search_code
    };
    let file_name = format!(
        "ordem_retirada_{}_{}.pdf",
        safe_filename_chunk(&chunk),
        Local::now().format("%Y%m%d_%H%M")
    );
    info!(order_id = order.id, order_number = %order_number, "withdrawal order issued");

    Ok(WithdrawalReceipt {
        order: order_view(&order),
        file_name,
        pdf,
    })
}

/// List issued orders, newest first.
pub async fn list_orders(db: &DatabaseConnection) -> anyhow::Result<Vec<OrderView>> {
    let rows = withdrawal_order::Entity::find()
        .order_by_desc(withdrawal_order::Column::Id)
        .limit(ORDER_LIST_LIMIT)
        .all(db)
        .await?;
    Ok(rows.iter().map(order_view).collect())
}

/// Move an order through its workflow, stamping who changed it and when.
pub async fn update_order_status(
    db: &DatabaseConnection,
    order_id: i32,
    status: OrderStatus,
    changed_by: &str,
) -> anyhow::Result<OrderView> {
    let Some(order) = withdrawal_order::Entity::find_by_id(order_id).one(db).await? else {
        return Err(AdegaError::NotFound(format!("withdrawal order {order_id}")).into());
    };

    let mut active: withdrawal_order::ActiveModel = order.into();
    active.status = Set(status.as_str().to_string());
    active.status_changed_by = Set(Some(normalize_spaces(changed_by)));
    active.status_changed_at = Set(Some(Local::now().naive_local()));
    let updated = active.update(db).await?;
    Ok(order_view(&updated))
}

/// Delete an order and its lines. Only cancelled orders may be deleted.
pub async fn delete_order(db: &DatabaseConnection, order_id: i32) -> anyhow::Result<()> {
    let Some(order) = withdrawal_order::Entity::find_by_id(order_id).one(db).await? else {
        return Err(AdegaError::NotFound(format!("withdrawal order {order_id}")).into());
    };
    if order.status != OrderStatus::Cancelada.as_str() {
        return Err(
            AdegaError::Validation("only cancelled orders can be deleted".to_string()).into(),
        );
    }

    let tx = db.begin().await?;
    withdrawal_order_item::Entity::delete_many()
        .filter(withdrawal_order_item::Column::OrderId.eq(order.id))
        .exec(&tx)
        .await?;
    withdrawal_order::Entity::delete_by_id(order.id)
        .exec(&tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

fn order_view(order: &withdrawal_order::Model) -> OrderView {
    OrderView {
        id: order.id,
        order_number: order.order_number.clone().unwrap_or_default(),
        client_code: order.client_code.clone(),
        nome_fantasia: order.nome_fantasia.clone(),
        withdrawal_date: order.withdrawal_date.clone(),
        summary_line: order.summary_line.clone(),
        status: order.status.parse().unwrap_or_default(),
        status_changed_by: order.status_changed_by.clone(),
        status_changed_at: order.status_changed_at,
        created_at: order.created_at,
    }
}

fn clamp_selection(selection: &InventorySelection, open_quantity: i32) -> i32 {
    selection.quantity.max(1).min(open_quantity)
}

/// The staff form wins; empty non-manual fields are filled from the
/// registry. Manual fields stay exactly as typed.
fn merge_client_form_with_db(
    form: &ClientRecord,
    model: Option<&catalog_client::Model>,
) -> ClientRecord {
    let mut merged = form.clone();
    let Some(model) = model else {
        return merged;
    };
    let stored = ClientRecord::from(model);
    for field in ClientField::ALL {
        if ClientField::MANUAL.contains(&field) {
            continue;
        }
        if merged.field(field).trim().is_empty() {
            let incoming = stored.field(field).trim().to_string();
            merged.set_field(field, incoming);
        }
    }
    merged
}

fn quantity_text(item_type: ItemType, volume_key: &str, quantity: i32) -> String {
    if item_type != ItemType::VasilhameCaixa {
        return quantity.to_string();
    }
    match calculate_bottles_for_crates(volume_key, quantity) {
        Some(bottles) if quantity > 0 => format!("{quantity} caixas - {bottles} garrafas"),
        _ => format!("{quantity} caixas"),
    }
}

fn line_from_inventory(item: &inventory_item::Model, quantity: i32) -> WithdrawalLine {
    let item_type = ItemType::from_stored(item.item_type.trim());
    let volume_key = normalize_spaces(&item.volume_key);
    WithdrawalLine {
        description: normalize_spaces(&item.description),
        item_type,
        type_label: item_type.label().to_string(),
        quantity,
        quantity_text: quantity_text(item_type, &volume_key, quantity),
        rg: normalize_spaces(&item.rg),
        volume_key,
    }
}

fn line_from_manual(description: String, manual: &ManualItem) -> WithdrawalLine {
    let item_type = ItemType::from_stored(normalize_spaces(&manual.item_type).as_str());
    let volume_key = normalize_spaces(&manual.volume_key);
    WithdrawalLine {
        description,
        item_type,
        type_label: item_type.label().to_string(),
        quantity: manual.quantity,
        quantity_text: quantity_text(item_type, &volume_key, manual.quantity),
        rg: normalize_spaces(&manual.rg),
        volume_key,
    }
}

/// Refrigerators are identified by RG on the summary line.
fn build_summary(lines: &[WithdrawalLine]) -> String {
    lines
        .iter()
        .map(|line| {
            if line.item_type == ItemType::Refrigerador && !line.rg.is_empty() {
                format!("{} (RG {}) - {}", line.description, line.rg, line.quantity_text)
            } else {
                format!("{} - {}", line.description, line.quantity_text)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

struct EquipmentGroup {
    quantity: i32,
    rgs: Vec<String>,
}

/// Per-type summary of the client's still-open equipment for the selected
/// item types, printed on the document footer.
fn open_equipment_summary(
    items: &[inventory_item::Model],
    selected_types: &BTreeSet<ItemType>,
) -> Vec<String> {
    if selected_types.is_empty() {
        return Vec::new();
    }

    let mut grouped: BTreeMap<ItemType, BTreeMap<String, EquipmentGroup>> = BTreeMap::new();
    for item in items {
        let item_type = ItemType::from_stored(item.item_type.trim());
        let description = normalize_spaces(&item.description);
        let group = grouped
            .entry(item_type)
            .or_default()
            .entry(description)
            .or_insert(EquipmentGroup {
                quantity: 0,
                rgs: Vec::new(),
            });
        group.quantity += item.open_quantity;
        let rg = normalize_spaces(&item.rg);
        if item_type == ItemType::Refrigerador && !rg.is_empty() {
            group.rgs.push(rg);
        }
    }

    let mut lines = Vec::new();
    for item_type in selected_types {
        let Some(groups) = grouped.get(item_type) else {
            continue;
        };
        for (description, group) in groups {
            if *item_type == ItemType::Refrigerador && !group.rgs.is_empty() {
                lines.push(format!(
                    "{description} - {} un. | RGs: {}",
                    group.quantity,
                    group.rgs.join(", ")
                ));
            } else {
                lines.push(format!("{description} - {}", group.quantity));
            }
        }
    }
    lines
}

/// Withdrawal dates are displayed Brazilian-style; an absent date means
/// today, and anything unparseable passes through verbatim.
fn format_brazil_date(value: &str) -> String {
    let raw = normalize_spaces(value);
    if raw.is_empty() {
        return Local::now().format("%d/%m/%Y").to_string();
    }
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => raw,
    }
}

fn safe_filename_chunk(text: &str) -> String {
    let raw = normalize_spaces(text);
    if raw.is_empty() {
        return "sem_codigo".to_string();
    }
    let chunk = FILENAME_UNSAFE.replace_all(&raw, "_");
    let trimmed = chunk.trim_matches('_');
    if trimmed.is_empty() {
        "sem_codigo".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_text_for_crates() {
        assert_eq!(
            quantity_text(ItemType::VasilhameCaixa, "600ml", 3),
            "3 caixas - 72 garrafas"
        );
        assert_eq!(quantity_text(ItemType::VasilhameCaixa, "", 3), "3 caixas");
        assert_eq!(quantity_text(ItemType::Refrigerador, "600ml", 2), "2");
    }

    #[test]
    fn test_build_summary_annotates_refrigerator_rg() {
        let lines = vec![
            WithdrawalLine {
                description: "VISA COOLER".to_string(),
                item_type: ItemType::Refrigerador,
                type_label: "Refrigerador".to_string(),
                quantity: 1,
                quantity_text: "1".to_string(),
                rg: "RG-777".to_string(),
                volume_key: String::new(),
            },
            WithdrawalLine {
                description: "CAIXA 600ML".to_string(),
                item_type: ItemType::VasilhameCaixa,
                type_label: "Vasilhame (Caixa)".to_string(),
                quantity: 2,
                quantity_text: "2 caixas - 48 garrafas".to_string(),
                rg: String::new(),
                volume_key: "600ml".to_string(),
            },
        ];
        assert_eq!(
            build_summary(&lines),
            "VISA COOLER (RG RG-777) - 1; CAIXA 600ML - 2 caixas - 48 garrafas"
        );
    }

    #[test]
    fn test_format_brazil_date() {
        assert_eq!(format_brazil_date("2026-02-22"), "22/02/2026");
        assert_eq!(format_brazil_date("22/02/2026"), "22/02/2026");
        assert!(!format_brazil_date("").is_empty());
    }

    #[test]
    fn test_safe_filename_chunk() {
        assert_eq!(safe_filename_chunk("10/01 A"), "10_01_A");
        assert_eq!(safe_filename_chunk("   "), "sem_codigo");
        assert_eq!(safe_filename_chunk("___"), "sem_codigo");
    }

    #[test]
    fn test_clamp_selection_limits_to_open_quantity() {
        let selection = InventorySelection {
            item_id: 1,
            quantity: 10,
        };
        assert_eq!(clamp_selection(&selection, 4), 4);
        let zero = InventorySelection {
            item_id: 1,
            quantity: 0,
        };
        // Requests below one are raised to one, then capped by stock.
        assert_eq!(clamp_selection(&zero, 4), 1);
        assert_eq!(clamp_selection(&zero, 0), 0);
    }
}
