//! Client/inventory merger
//!
//! Reconciles the client registry rows with the per-row client snapshots
//! embedded in the inventory ledger. Registry data always wins: only empty
//! registry fields are back-filled from a snapshot, and codes that exist
//! only in the ledger get a synthesized record seeded from their first row.

use std::collections::BTreeMap;

use crate::model::{ClientField, ClientRecord, InventoryRecord};

/// Merge parsed registry clients with ledger snapshots, producing one record
/// per canonical code.
pub fn merge_clients_with_snapshots(
    clients: &BTreeMap<String, ClientRecord>,
    inventory: &BTreeMap<String, Vec<InventoryRecord>>,
) -> BTreeMap<String, ClientRecord> {
    let mut merged = clients.clone();

    for (code, items) in inventory {
        let Some(first) = items.first() else {
            continue;
        };
        let snapshot = &first.client_snapshot;

        let entry = merged.entry(code.clone()).or_insert_with(|| ClientRecord {
            client_code: if snapshot.client_code.trim().is_empty() {
                code.clone()
            } else {
                snapshot.client_code.clone()
            },
            ..Default::default()
        });

        for field in ClientField::ALL {
            let current = entry.field(field).trim();
            let incoming = snapshot.field(field).trim().to_string();
            if current.is_empty() && !incoming.is_empty() {
                entry.set_field(field, incoming);
            }
        }
    }

    merged
}
