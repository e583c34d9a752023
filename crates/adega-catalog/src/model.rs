// Catalog data models and structures
// Typed records the CSV pipeline maps into at the boundary, plus the
// request/response shapes of the catalog services.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use adega_persistence::entity::catalog_client;

/// Closed set of equipment-type buckets used across the catalog and the
/// equipment dashboards.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Refrigerador,
    Garrafeira,
    VasilhameCaixa,
    VasilhameGarrafa,
    CaixaTermica,
    JogoMesa,
    #[default]
    Outro,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Refrigerador => "refrigerador",
            ItemType::Garrafeira => "garrafeira",
            ItemType::VasilhameCaixa => "vasilhame_caixa",
            ItemType::VasilhameGarrafa => "vasilhame_garrafa",
            ItemType::CaixaTermica => "caixa_termica",
            ItemType::JogoMesa => "jogo_mesa",
            ItemType::Outro => "outro",
        }
    }

    /// Display label shown on withdrawal documents and dashboards.
    pub fn label(self) -> &'static str {
        match self {
            ItemType::Refrigerador => "Refrigerador",
            ItemType::Garrafeira => "Garrafeira",
            ItemType::VasilhameCaixa => "Vasilhame (Caixa)",
            ItemType::VasilhameGarrafa => "Vasilhame (Garrafa)",
            ItemType::CaixaTermica => "Caixa térmica",
            ItemType::JogoMesa => "Jogo de mesa",
            ItemType::Outro => "Outro",
        }
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refrigerador" => Ok(ItemType::Refrigerador),
            "garrafeira" => Ok(ItemType::Garrafeira),
            "vasilhame_caixa" => Ok(ItemType::VasilhameCaixa),
            "vasilhame_garrafa" => Ok(ItemType::VasilhameGarrafa),
            "caixa_termica" => Ok(ItemType::CaixaTermica),
            "jogo_mesa" => Ok(ItemType::JogoMesa),
            "outro" => Ok(ItemType::Outro),
            _ => Err(format!("Invalid item type: {}", s)),
        }
    }
}

impl ItemType {
    /// Stored item-type strings from earlier schema versions fall back to
    /// `Outro` instead of failing the read.
    pub fn from_stored(value: &str) -> ItemType {
        value.parse().unwrap_or(ItemType::Outro)
    }
}

/// The client form fields carried by both CSV sources, the registry table,
/// and the withdrawal-order snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientField {
    ClientCode,
    NomeFantasia,
    RazaoSocial,
    CnpjCpf,
    Setor,
    Telefone,
    Endereco,
    Bairro,
    Cidade,
    Cep,
    InscricaoEstadual,
    ResponsavelCliente,
    ResponsavelRetirada,
    ResponsavelConferencia,
}

impl ClientField {
    pub const ALL: [ClientField; 14] = [
        ClientField::ClientCode,
        ClientField::NomeFantasia,
        ClientField::RazaoSocial,
        ClientField::CnpjCpf,
        ClientField::Setor,
        ClientField::Telefone,
        ClientField::Endereco,
        ClientField::Bairro,
        ClientField::Cidade,
        ClientField::Cep,
        ClientField::InscricaoEstadual,
        ClientField::ResponsavelCliente,
        ClientField::ResponsavelRetirada,
        ClientField::ResponsavelConferencia,
    ];

    /// Fields that must always be entered manually by staff. Whatever the
    /// CSVs contained, these are blanked on every client-facing read so
    /// stale contact data is never silently trusted.
    pub const MANUAL: [ClientField; 4] = [
        ClientField::Telefone,
        ClientField::ResponsavelCliente,
        ClientField::ResponsavelRetirada,
        ClientField::ResponsavelConferencia,
    ];
}

/// One client record, merged across the registry and ledger exports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRecord {
    pub client_code: String,
    pub nome_fantasia: String,
    pub razao_social: String,
    pub cnpj_cpf: String,
    pub setor: String,
    pub telefone: String,
    pub endereco: String,
    pub bairro: String,
    pub cidade: String,
    pub cep: String,
    pub inscricao_estadual: String,
    pub responsavel_cliente: String,
    pub responsavel_retirada: String,
    pub responsavel_conferencia: String,
}

impl ClientRecord {
    pub fn field(&self, field: ClientField) -> &str {
        match field {
            ClientField::ClientCode => &self.client_code,
            ClientField::NomeFantasia => &self.nome_fantasia,
            ClientField::RazaoSocial => &self.razao_social,
            ClientField::CnpjCpf => &self.cnpj_cpf,
            ClientField::Setor => &self.setor,
            ClientField::Telefone => &self.telefone,
            ClientField::Endereco => &self.endereco,
            ClientField::Bairro => &self.bairro,
            ClientField::Cidade => &self.cidade,
            ClientField::Cep => &self.cep,
            ClientField::InscricaoEstadual => &self.inscricao_estadual,
            ClientField::ResponsavelCliente => &self.responsavel_cliente,
            ClientField::ResponsavelRetirada => &self.responsavel_retirada,
            ClientField::ResponsavelConferencia => &self.responsavel_conferencia,
        }
    }

    pub fn set_field(&mut self, field: ClientField, value: String) {
        let slot = match field {
            ClientField::ClientCode => &mut self.client_code,
            ClientField::NomeFantasia => &mut self.nome_fantasia,
            ClientField::RazaoSocial => &mut self.razao_social,
            ClientField::CnpjCpf => &mut self.cnpj_cpf,
            ClientField::Setor => &mut self.setor,
            ClientField::Telefone => &mut self.telefone,
            ClientField::Endereco => &mut self.endereco,
            ClientField::Bairro => &mut self.bairro,
            ClientField::Cidade => &mut self.cidade,
            ClientField::Cep => &mut self.cep,
            ClientField::InscricaoEstadual => &mut self.inscricao_estadual,
            ClientField::ResponsavelCliente => &mut self.responsavel_cliente,
            ClientField::ResponsavelRetirada => &mut self.responsavel_retirada,
            ClientField::ResponsavelConferencia => &mut self.responsavel_conferencia,
        };
        *slot = value;
    }

    /// Blank the must-be-manually-entered fields (see `ClientField::MANUAL`).
    pub fn clear_manual_fields(&mut self) {
        for field in ClientField::MANUAL {
            self.set_field(field, String::new());
        }
    }
}

impl From<&catalog_client::Model> for ClientRecord {
    fn from(value: &catalog_client::Model) -> Self {
        ClientRecord {
            client_code: value.client_code.clone(),
            nome_fantasia: value.nome_fantasia.clone(),
            razao_social: value.razao_social.clone(),
            cnpj_cpf: value.cnpj_cpf.clone(),
            setor: value.setor.clone(),
            telefone: value.telefone.clone(),
            endereco: value.endereco.clone(),
            bairro: value.bairro.clone(),
            cidade: value.cidade.clone(),
            cep: value.cep.clone(),
            inscricao_estadual: value.inscricao_estadual.clone(),
            responsavel_cliente: value.responsavel_cliente.clone(),
            responsavel_retirada: value.responsavel_retirada.clone(),
            responsavel_conferencia: value.responsavel_conferencia.clone(),
        }
    }
}

/// One accepted open-inventory line, typed at the CSV boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub description: String,
    pub item_type: ItemType,
    pub open_quantity: i32,
    pub rg: String,
    pub comodato_number: String,
    pub issue_date: String,
    pub volume_key: String,
    /// The negative balance the open quantity was derived from
    pub source_baixados: i32,
    pub product_code: String,
    /// Verbatim client fields carried by the ledger row, used by the merger
    pub client_snapshot: ClientRecord,
}

/// Output of the clients CSV parser, keyed by canonical code.
#[derive(Clone, Debug, Default)]
pub struct ParsedClients {
    pub by_code: BTreeMap<String, ClientRecord>,
    pub skipped_rows: u32,
}

/// Output of the inventory CSV parser, keyed by canonical code.
#[derive(Clone, Debug, Default)]
pub struct ParsedInventory {
    pub by_client: BTreeMap<String, Vec<InventoryRecord>>,
    pub skipped_rows: u32,
}

/// Counters stamped onto an upload batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub clients_count: i32,
    pub inventory_clients: i32,
    pub open_items: i32,
}

/// Result of one batch ingestion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub batch_id: i32,
    pub stats: CatalogStats,
    /// Rows the tolerant parsers dropped (unparseable, non-open, blank)
    pub skipped_rows: u32,
}

/// Dataset readiness and latest-batch counters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatus {
    pub dataset_ready: bool,
    pub loaded_at: Option<NaiveDateTime>,
    pub stats: CatalogStats,
}

/// Read-side view of one open inventory line.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemView {
    pub id: i32,
    pub description: String,
    pub item_type: ItemType,
    pub type_label: String,
    pub open_quantity: i32,
    pub rg: String,
    pub comodato_number: String,
    pub issue_date: String,
    pub volume_key: String,
}

/// Result of a client lookup by (possibly unformatted) code.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientLookup {
    pub matched_code: String,
    pub found_anything: bool,
    pub client: ClientRecord,
    pub items: Vec<InventoryItemView>,
}

/// Workflow status of a withdrawal order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pendente,
    Concluida,
    Cancelada,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pendente => "pendente",
            OrderStatus::Concluida => "concluida",
            OrderStatus::Cancelada => "cancelada",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendente" => Ok(OrderStatus::Pendente),
            "concluida" => Ok(OrderStatus::Concluida),
            "cancelada" => Ok(OrderStatus::Cancelada),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }
}

/// Selection of an existing inventory line for a withdrawal.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySelection {
    pub item_id: i32,
    pub quantity: i32,
}

/// A manually typed withdrawal line.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManualItem {
    pub description: String,
    pub quantity: i32,
    pub item_type: String,
    pub rg: String,
    pub volume_key: String,
}

/// Form structure for withdrawal-order creation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub lookup_code: String,
    pub client: ClientRecord,
    pub selected_inventory: Vec<InventorySelection>,
    pub manual_items: Vec<ManualItem>,
    pub auto_summary: String,
    pub observacao_extra: String,
    /// ISO date (YYYY-MM-DD); empty means "today"
    pub data_retirada: String,
    pub hora_retirada: String,
    pub company_name: String,
}

/// One rendered withdrawal line.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalLine {
    pub description: String,
    pub item_type: ItemType,
    pub type_label: String,
    pub quantity: i32,
    pub quantity_text: String,
    pub rg: String,
    pub volume_key: String,
}

/// Plain structured payload handed to the PDF-rendering collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalDocument {
    pub order_number: String,
    pub company_name: String,
    pub client: ClientRecord,
    pub items: Vec<WithdrawalLine>,
    pub summary_line: String,
    pub observation: String,
    pub withdrawal_date: String,
    pub withdrawal_time: String,
    pub generated_at: String,
    pub copies: Vec<String>,
    pub reseller_lines: Vec<String>,
    pub open_equipment_summary: Vec<String>,
}

/// Listing view of an issued order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: i32,
    pub order_number: String,
    pub client_code: String,
    pub nome_fantasia: String,
    pub withdrawal_date: String,
    pub summary_line: String,
    pub status: OrderStatus,
    pub status_changed_by: Option<String>,
    pub status_changed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Result of issuing a withdrawal order.
#[derive(Clone, Debug)]
pub struct WithdrawalReceipt {
    pub order: OrderView,
    pub file_name: String,
    pub pdf: Vec<u8>,
}
