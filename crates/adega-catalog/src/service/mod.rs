//! Catalog service layer
//!
//! Database-backed operations for the pickup catalog: transactional batch
//! ingestion, current-batch resolution, client lookup, and withdrawal-order
//! generation.

pub mod batch;
pub mod client;
pub mod ingest;
pub mod order;

pub use batch::{BatchScope, catalog_status, latest_batch_id};
pub use client::find_client;
pub use ingest::{CsvUpload, ingest};
pub use order::{
    WithdrawalRenderer, create_withdrawal, delete_order, list_orders, update_order_status,
};
