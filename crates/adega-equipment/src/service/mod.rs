//! Equipment service layer
//!
//! Registry CRUD with uniqueness and allocation-conflict guards, bulk CSV
//! import, and the allocation-matching sync engine.

pub mod allocation;
pub mod equipment;
pub mod import;

pub use allocation::{
    allocated_tokens_from_ledger, equipment_lookup_tokens, is_allocated, lookup_allocation,
    sync_allocation_status,
};
pub use equipment::{create_equipment, delete_equipment, list_equipments, update_equipment};
pub use import::import_equipments_csv;
