//! Withdrawal order entity
//!
//! A generated withdrawal request. Client fields are a copied snapshot, not
//! a live reference, so later registry updates never rewrite issued orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawal_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, nullable)]
    pub order_number: Option<String>,
    pub company_name: String,
    #[sea_orm(nullable)]
    pub client_id: Option<i32>,
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
    pub withdrawal_date: String,
    pub withdrawal_time: String,
    #[sea_orm(column_type = "Text")]
    pub summary_line: String,
    #[sea_orm(column_type = "Text")]
    pub observation: String,
    pub selected_types: String,
    /// pendente | concluida | cancelada
    pub status: String,
    #[sea_orm(nullable)]
    pub status_changed_by: Option<String>,
    #[sea_orm(nullable)]
    pub status_changed_at: Option<DateTime>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
