//! Equipment registry entity
//!
//! Locally owned, manually tracked physical units. RG and tag codes are each
//! globally unique when present.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "equipments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub category: String,
    pub model_name: String,
    pub brand: String,
    pub quantity: i32,
    pub voltage: String,
    #[sea_orm(unique, nullable)]
    pub rg_code: Option<String>,
    #[sea_orm(unique, nullable)]
    pub tag_code: Option<String>,
    /// novo | disponivel | recap | sucata | alocado
    pub status: String,
    #[sea_orm(nullable)]
    pub client_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
