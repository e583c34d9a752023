// Equipment data models and normalization
// Category, status, and voltage vocabularies with their accepted aliases,
// plus the service request/response shapes.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use adega_common::{AdegaError, normalize_lookup_text, normalize_spaces};
use adega_persistence::entity::equipment;

/// Equipment categories tracked by the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Refrigerador,
    CaixaTermica,
    JogoMesa,
    Outro,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Refrigerador => "refrigerador",
            Category::CaixaTermica => "caixa_termica",
            Category::JogoMesa => "jogo_mesa",
            Category::Outro => "outro",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Refrigerador => "Refrigeradores",
            Category::CaixaTermica => "Caixa térmica",
            Category::JogoMesa => "Jogos de mesa",
            Category::Outro => "Outros",
        }
    }

    /// Parse a user-supplied category, accepting the dashboard vocabulary.
    pub fn parse(value: &str) -> Result<Category, AdegaError> {
        match normalize_lookup_text(value).as_str() {
            "refrigerador" | "refrigeradores" | "geladeira" | "geladeiras" | "frigobar"
            | "frigorifico" => Ok(Category::Refrigerador),
            "caixa termica" | "caixas termicas" | "caixa termicas" => Ok(Category::CaixaTermica),
            "jogo de mesa" | "jogos de mesa" | "jogo mesa" | "jogos mesa" => Ok(Category::JogoMesa),
            "outro" | "outros" => Ok(Category::Outro),
            _ => Err(AdegaError::Validation(format!("invalid category: {value}"))),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a registered unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentStatus {
    #[default]
    Novo,
    Disponivel,
    Recap,
    Sucata,
    Alocado,
}

impl EquipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EquipmentStatus::Novo => "novo",
            EquipmentStatus::Disponivel => "disponivel",
            EquipmentStatus::Recap => "recap",
            EquipmentStatus::Sucata => "sucata",
            EquipmentStatus::Alocado => "alocado",
        }
    }

    pub fn parse(value: &str) -> Result<EquipmentStatus, AdegaError> {
        normalize_lookup_text(value)
            .parse()
            .map_err(|_| AdegaError::Validation(format!("invalid status: {value}")))
    }

    /// Statuses the allocation sync engine scans: units the registry claims
    /// are still on hand.
    pub fn is_unallocated_stock(self) -> bool {
        matches!(self, EquipmentStatus::Novo | EquipmentStatus::Disponivel)
    }
}

impl Display for EquipmentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "novo" => Ok(EquipmentStatus::Novo),
            "disponivel" => Ok(EquipmentStatus::Disponivel),
            "recap" => Ok(EquipmentStatus::Recap),
            "sucata" => Ok(EquipmentStatus::Sucata),
            "alocado" => Ok(EquipmentStatus::Alocado),
            _ => Err(format!("Invalid equipment status: {}", s)),
        }
    }
}

const VOLTAGE_ALIASES: &[(&str, &str)] = &[
    ("", ""),
    ("110", "110v"),
    ("110v", "110v"),
    ("127", "127v"),
    ("127v", "127v"),
    ("220", "220v"),
    ("220v", "220v"),
    ("bivolt", "bivolt"),
    ("bi volt", "bivolt"),
    ("nao informado", "nao_informado"),
    ("nao informada", "nao_informado"),
    ("nao se aplica", "nao_informado"),
    ("n/a", "nao_informado"),
];

/// Normalize a voltage value to its stored form.
pub fn normalize_voltage(value: &str) -> Result<String, AdegaError> {
    let lookup = normalize_lookup_text(value);
    VOLTAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lookup)
        .map(|(_, stored)| stored.to_string())
        .ok_or_else(|| AdegaError::Validation(format!("invalid voltage: {value}")))
}

/// Upper-cased code or `None` when blank; RG and tag codes are stored in
/// this form.
pub fn normalize_optional_code(value: &str) -> Option<String> {
    let text = normalize_spaces(value);
    if text.is_empty() {
        None
    } else {
        Some(text.to_uppercase())
    }
}

/// Space-collapsed text or `None` when blank.
pub fn optional_text(value: &str) -> Option<String> {
    let text = normalize_spaces(value);
    if text.is_empty() { None } else { Some(text) }
}

/// Creation payload for one equipment row; values arrive as typed by staff.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EquipmentForm {
    pub category: String,
    pub model_name: String,
    pub brand: String,
    pub quantity: Option<i32>,
    pub voltage: String,
    pub rg_code: String,
    pub tag_code: String,
    pub status: String,
    pub client_name: String,
    pub notes: String,
}

/// Partial update payload; absent fields keep their stored values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EquipmentUpdate {
    pub category: Option<String>,
    pub model_name: Option<String>,
    pub brand: Option<String>,
    pub quantity: Option<i32>,
    pub voltage: Option<String>,
    pub rg_code: Option<String>,
    pub tag_code: Option<String>,
    pub status: Option<String>,
    pub client_name: Option<String>,
    pub notes: Option<String>,
}

/// Listing filters for the registry.
#[derive(Clone, Debug, Default)]
pub struct EquipmentFilter {
    pub category: Option<String>,
    pub status: Option<String>,
    pub client_name: Option<String>,
    pub search: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

/// Read-side view of one registered unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentView {
    pub id: i32,
    pub category: Category,
    pub model_name: String,
    pub brand: String,
    pub quantity: i32,
    pub voltage: String,
    pub rg_code: String,
    pub tag_code: String,
    pub status: EquipmentStatus,
    pub client_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&equipment::Model> for EquipmentView {
    fn from(value: &equipment::Model) -> Self {
        EquipmentView {
            id: value.id,
            category: Category::parse(&value.category).unwrap_or_default(),
            model_name: normalize_spaces(&value.model_name),
            brand: normalize_spaces(&value.brand),
            quantity: value.quantity.max(1),
            voltage: value.voltage.clone(),
            rg_code: value.rg_code.clone().unwrap_or_default(),
            tag_code: value.tag_code.clone().unwrap_or_default(),
            status: value.status.parse().unwrap_or_default(),
            client_name: value.client_name.clone(),
            notes: value.notes.clone(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Result of one allocation sync pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub scanned_count: usize,
    pub matched_count: usize,
    pub updated_count: usize,
    pub updated_ids: Vec<i32>,
}

/// One ledger row a registry code resolved to.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationLookupItem {
    pub inventory_item_id: i32,
    pub rg_code: String,
    pub tag_code: String,
    pub client_code: String,
    pub nome_fantasia: String,
    pub setor: String,
    pub model_name: String,
    pub invoice_issue_date: String,
}

/// Where a unit shows up as deployed per the current ledger.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationLookup {
    pub rg_code: String,
    pub tag_code: String,
    pub total: usize,
    pub items: Vec<AllocationLookupItem>,
}

/// Counters of one bulk refrigerator import.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub total_rows: usize,
    pub imported_count: usize,
    pub duplicated_by_rg: usize,
    pub duplicates_in_file: usize,
    pub duplicates_in_ledger: usize,
    pub duplicates_in_registry: usize,
    pub invalid_rows: usize,
    pub ignored_non_refrigerator: usize,
    pub errors: Vec<String>,
}
