//! Pickup-catalog client entity
//!
//! One row per canonical client code. Rows are created or refreshed on each
//! CSV upload batch and never deleted; the code is immutable once assigned.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Canonical client code, the join key across both CSV sources
    #[sea_orm(unique)]
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
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
