//! Upload batch entity
//!
//! One row per CSV ingestion event. Immutable after creation; the highest id
//! is the "current" batch and partitions the inventory rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "upload_batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub clients_file_name: String,
    pub inventory_file_name: String,
    /// Merged client records written by this batch
    pub clients_count: i32,
    /// Distinct client codes that carried open inventory lines
    pub inventory_clients: i32,
    /// Open inventory lines written by this batch
    pub open_items: i32,
    /// Rows dropped by the tolerant parsers (unparseable, non-open, blank)
    pub skipped_rows: i32,
    pub uploaded_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
