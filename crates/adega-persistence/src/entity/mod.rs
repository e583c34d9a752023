//! Entity definitions for the Adega tables

pub mod catalog_client;
pub mod equipment;
pub mod inventory_item;
pub mod upload_batch;
pub mod withdrawal_order;
pub mod withdrawal_order_item;
