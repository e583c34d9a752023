//! Adega Persistence - relational entities and schema bootstrap
//!
//! This crate defines the SeaORM entities for the six Adega tables and the
//! idempotent create-tables helper run once at boot and by the integration
//! tests. Services live in `adega-catalog` and `adega-equipment`; this crate
//! is storage shape only.

pub mod entity;
pub mod schema;
