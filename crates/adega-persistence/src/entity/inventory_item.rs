//! Open-inventory ledger line entity
//!
//! One row per open (negative-balance) line of the ledger CSV, scoped to a
//! client and an upload batch. Rows from superseded batches stay stored for
//! audit but are excluded from "current" queries; `batch_id` is null only
//! for pre-batching legacy data.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub client_id: i32,
    #[sea_orm(nullable)]
    pub batch_id: Option<i32>,
    pub description: String,
    pub item_type: String,
    pub open_quantity: i32,
    /// Serial/RG code as printed in the ledger, verbatim
    pub rg: String,
    pub comodato_number: String,
    pub invoice_issue_date: String,
    pub volume_key: String,
    /// The negative source balance the open quantity was derived from
    pub source_baixados: i32,
    pub product_code: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
