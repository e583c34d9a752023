//! Idempotent schema bootstrap
//!
//! Builds `CREATE TABLE IF NOT EXISTS` statements from the entity
//! definitions. The surrounding application runs this once at boot; the
//! integration tests run it against in-memory SQLite.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

use crate::entity::{
    catalog_client, equipment, inventory_item, upload_batch, withdrawal_order,
    withdrawal_order_item,
};

/// Create every Adega table that does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(catalog_client::Entity),
        schema.create_table_from_entity(upload_batch::Entity),
        schema.create_table_from_entity(inventory_item::Entity),
        schema.create_table_from_entity(equipment::Entity),
        schema.create_table_from_entity(withdrawal_order::Entity),
        schema.create_table_from_entity(withdrawal_order_item::Entity),
    ];
    for statement in &mut statements {
        db.execute(backend.build(statement.if_not_exists())).await?;
    }
    Ok(())
}
