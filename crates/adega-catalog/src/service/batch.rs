//! Current-batch resolution and catalog status
//!
//! "Currently open" inventory is always scoped to the single most recent
//! upload batch. That retention policy lives here as a named, testable
//! object instead of being re-derived by every query site.

use sea_orm::*;

use adega_persistence::entity::{catalog_client, inventory_item, upload_batch};

use crate::model::{CatalogStats, CatalogStatus};

/// How reads should scope inventory rows to the current dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchScope {
    /// Pre-batching legacy data: no row carries a batch id, everything is
    /// current.
    Unbatched,
    /// Batching in use: only rows of this batch are current.
    Latest(i32),
    /// Batching in use but no batch row exists: nothing is current.
    Empty,
}

impl BatchScope {
    /// Resolve the scope for the data currently in storage.
    pub async fn resolve<C: ConnectionTrait>(db: &C) -> anyhow::Result<BatchScope> {
        let uses_batches = inventory_item::Entity::find()
            .filter(inventory_item::Column::BatchId.is_not_null())
            .limit(1)
            .one(db)
            .await?
            .is_some();
        if !uses_batches {
            return Ok(BatchScope::Unbatched);
        }
        match latest_batch_id(db).await? {
            Some(id) => Ok(BatchScope::Latest(id)),
            None => Ok(BatchScope::Empty),
        }
    }

    /// Restrict an inventory query to the current dataset.
    pub fn apply(&self, select: Select<inventory_item::Entity>) -> Select<inventory_item::Entity> {
        match self {
            BatchScope::Unbatched => select,
            BatchScope::Latest(id) => select.filter(inventory_item::Column::BatchId.eq(*id)),
            BatchScope::Empty => select.filter(inventory_item::Column::Id.eq(-1)),
        }
    }
}

/// Id of the most recently created upload batch, if any.
pub async fn latest_batch_id<C: ConnectionTrait>(db: &C) -> anyhow::Result<Option<i32>> {
    Ok(upload_batch::Entity::find()
        .order_by_desc(upload_batch::Column::Id)
        .one(db)
        .await?
        .map(|batch| batch.id))
}

/// Dataset readiness and counters: the latest batch's stamped counters, or a
/// direct count over the tables for pre-batching legacy data.
pub async fn catalog_status(db: &DatabaseConnection) -> anyhow::Result<CatalogStatus> {
    if let Some(latest) = upload_batch::Entity::find()
        .order_by_desc(upload_batch::Column::Id)
        .one(db)
        .await?
    {
        return Ok(CatalogStatus {
            dataset_ready: true,
            loaded_at: Some(latest.uploaded_at),
            stats: CatalogStats {
                clients_count: latest.clients_count,
                inventory_clients: latest.inventory_clients,
                open_items: latest.open_items,
            },
        });
    }

    let clients_count = catalog_client::Entity::find().count(db).await? as i32;
    let open_items = inventory_item::Entity::find().count(db).await? as i32;
    let inventory_clients = inventory_item::Entity::find()
        .select_only()
        .column(inventory_item::Column::ClientId)
        .distinct()
        .into_tuple::<i32>()
        .all(db)
        .await?
        .len() as i32;

    Ok(CatalogStatus {
        dataset_ready: clients_count > 0 || open_items > 0,
        loaded_at: None,
        stats: CatalogStats {
            clients_count,
            inventory_clients,
            open_items,
        },
    })
}
