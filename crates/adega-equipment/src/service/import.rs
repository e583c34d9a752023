//! Bulk refrigerator import
//!
//! Reuses the catalog's tolerant CSV pipeline to load a registry export and
//! inserts the acceptable rows in one transaction. Every rejected row is
//! counted by reason; duplicates are detected against the file itself, the
//! registry, and the current ledger's allocation set.

use std::collections::{HashMap, HashSet};

use chrono::Local;
use sea_orm::*;
use tracing::info;

use adega_catalog::csv::read_csv_table;
use adega_common::{AdegaError, code_lookup_tokens, normalize_spaces};
use adega_persistence::entity::equipment;

use crate::model::{
    Category, EquipmentStatus, ImportReport, normalize_optional_code, normalize_voltage,
};
use crate::service::allocation::{allocated_tokens_from_ledger, equipment_lookup_tokens};

/// Import header labels with their accepted aliases.
const IMPORT_HEADERS: [(&str, &[&str]); 6] = [
    ("TIPO", &["tipo", "type"]),
    ("MODELO", &["modelo", "model", "material", "descricao", "descrição"]),
    ("MARCA", &["marca", "brand"]),
    ("VOLTAGEM", &["voltagem", "voltage"]),
    ("RG", &["rg", "r.g", "r g"]),
    ("ETIQUETA", &["etiqueta", "tag", "tag_code"]),
];

/// Per-import cap on collected row error messages.
const ERROR_LIMIT: usize = 30;

/// Import refrigerators from a registry CSV export.
pub async fn import_equipments_csv(
    db: &DatabaseConnection,
    raw_bytes: &[u8],
) -> anyhow::Result<ImportReport> {
    if raw_bytes.is_empty() {
        return Err(AdegaError::Validation("empty CSV file".to_string()).into());
    }

    let table = read_csv_table(raw_bytes)?;
    let mut columns: HashMap<&str, usize> = HashMap::new();
    let mut missing: Vec<&str> = Vec::new();
    for (label, aliases) in IMPORT_HEADERS {
        match table.column(aliases) {
            Some(index) => {
                columns.insert(label, index);
            }
            None => missing.push(label),
        }
    }
    if !missing.is_empty() {
        return Err(AdegaError::MissingColumn(missing.join(", ")).into());
    }

    let mut existing_rg_tokens: HashSet<String> = HashSet::new();
    let mut existing_tags: HashSet<String> = HashSet::new();
    for row in equipment::Entity::find().all(db).await? {
        if let Some(rg) = &row.rg_code {
            existing_rg_tokens.extend(code_lookup_tokens(rg));
        }
        if let Some(tag) = row.tag_code.as_deref().and_then(normalize_optional_code) {
            existing_tags.insert(tag);
        }
    }
    let ledger_tokens = allocated_tokens_from_ledger(db).await?;

    let mut report = ImportReport::default();
    let mut seen_rg_tokens: HashSet<String> = HashSet::new();
    let mut seen_tags: HashSet<String> = HashSet::new();
    let mut pending: Vec<equipment::ActiveModel> = Vec::new();
    let now = Local::now().naive_local();

    for (offset, row) in table.rows.iter().enumerate() {
        // Header occupies line 1 of the file.
        let line = offset + 2;
        if row.iter().all(|cell| normalize_spaces(cell).is_empty()) {
            continue;
        }
        report.total_rows += 1;

        let raw_tipo = normalize_spaces(&row[columns["TIPO"]]);
        if !raw_tipo.is_empty() {
            match Category::parse(&raw_tipo) {
                Ok(Category::Refrigerador) => {}
                Ok(_) => {
                    report.ignored_non_refrigerator += 1;
                    continue;
                }
                Err(_) => {
                    report.invalid_rows += 1;
                    push_error(
                        &mut report.errors,
                        format!("line {line}: invalid category ({raw_tipo})"),
                    );
                    continue;
                }
            }
        }

        let model_name = normalize_spaces(&row[columns["MODELO"]]);
        let brand = normalize_spaces(&row[columns["MARCA"]]);
        let raw_voltage = normalize_spaces(&row[columns["VOLTAGEM"]]);
        let rg_code = normalize_optional_code(&row[columns["RG"]]);
        let tag_code = normalize_optional_code(&row[columns["ETIQUETA"]]);

        let Some(rg_code) = rg_code else {
            report.invalid_rows += 1;
            push_error(
                &mut report.errors,
                format!("line {line}: model, brand, voltage, and RG are required"),
            );
            continue;
        };
        if model_name.is_empty() || brand.is_empty() || raw_voltage.is_empty() {
            report.invalid_rows += 1;
            push_error(
                &mut report.errors,
                format!("line {line}: model, brand, voltage, and RG are required"),
            );
            continue;
        }

        let voltage = match normalize_voltage(&raw_voltage) {
            Ok(voltage) if !voltage.is_empty() => voltage,
            _ => {
                report.invalid_rows += 1;
                push_error(
                    &mut report.errors,
                    format!("line {line}: invalid voltage ({raw_voltage})"),
                );
                continue;
            }
        };

        let rg_tokens = code_lookup_tokens(&rg_code);
        if rg_tokens.is_empty() {
            report.invalid_rows += 1;
            push_error(&mut report.errors, format!("line {line}: invalid RG"));
            continue;
        }
        let unit_tokens = equipment_lookup_tokens(Some(&rg_code), tag_code.as_deref());

        if rg_tokens.iter().any(|token| seen_rg_tokens.contains(token)) {
            report.duplicates_in_file += 1;
            report.duplicated_by_rg += 1;
            continue;
        }
        if rg_tokens
            .iter()
            .any(|token| existing_rg_tokens.contains(token))
        {
            report.duplicates_in_registry += 1;
            report.duplicated_by_rg += 1;
            continue;
        }
        if unit_tokens.iter().any(|token| ledger_tokens.contains(token)) {
            report.duplicates_in_ledger += 1;
            report.duplicated_by_rg += 1;
            continue;
        }
        if let Some(tag) = &tag_code {
            if existing_tags.contains(tag) || seen_tags.contains(tag) {
                report.invalid_rows += 1;
                push_error(
                    &mut report.errors,
                    format!("line {line}: tag already registered ({tag})"),
                );
                continue;
            }
        }

        pending.push(equipment::ActiveModel {
            category: Set(Category::Refrigerador.as_str().to_string()),
            model_name: Set(model_name),
            brand: Set(brand),
            quantity: Set(1),
            voltage: Set(voltage),
            rg_code: Set(Some(rg_code)),
            tag_code: Set(tag_code.clone()),
            status: Set(EquipmentStatus::Novo.as_str().to_string()),
            client_name: Set(None),
            notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });
        report.imported_count += 1;
        seen_rg_tokens.extend(rg_tokens);
        if let Some(tag) = tag_code {
            seen_tags.insert(tag);
        }
    }

    if !pending.is_empty() {
        let tx = db.begin().await?;
        for active in pending {
            active.insert(&tx).await?;
        }
        tx.commit().await?;
    }

    info!(
        total = report.total_rows,
        imported = report.imported_count,
        duplicated = report.duplicated_by_rg,
        "refrigerator import finished"
    );
    Ok(report)
}

fn push_error(errors: &mut Vec<String>, message: String) {
    if errors.len() < ERROR_LIMIT {
        errors.push(message);
    }
}
