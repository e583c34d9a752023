//! Adega Equipment - registry and allocation-matching engine
//!
//! This crate tracks the locally owned physical units (refrigerators plus
//! ancillary categories) and reconciles them against the external inventory
//! ledger:
//! - CRUD with uniqueness and allocation-conflict guards
//! - Bulk CSV import of refrigerators
//! - The allocation sync engine that flips registry statuses when the
//!   ledger already shows a unit deployed at a client

pub mod model;
pub mod service;

// Re-export commonly used types
pub use model::*;
