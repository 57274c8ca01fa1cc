//! Reconciliation of a device's offline write-ahead buffer against server
//! state.
//!
//! Each item is decided independently: the server wins, the client wins, or
//! the two conflict. Conflicts are surfaced in the report, never silently
//! dropped and never auto-merged - last-writer-wins is deliberately NOT
//! applied to concurrent-divergent writes.

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};

use crate::crypto::payload_checksum;
use crate::db::queries;
use crate::error::{AppError, Result, msg};
use crate::models::{SyncConflict, SyncItem, SyncReport, SyncUpdated};

/// Reconcile a batch of client-held (entity, key, payload, version) tuples.
///
/// Per item:
/// 1. No server entry (or an expired one, which readers treat as absent) -
///    store the item at the client's version.
/// 2. Server version greater - server is authoritative; report `updated`,
///    write nothing.
/// 3. Server version less - client is authoritative; overwrite, assigning a
///    fresh server version.
/// 4. Versions equal - checksums decide: equal content is the steady-state
///    no-op, diverged content is reported in `conflicts` with both sides'
///    versions, and nothing is written.
///
/// The batch is non-transactional by design: an item's write lands even if
/// a later item conflicts. Each single item's read-compare-write runs in its
/// own IMMEDIATE transaction so concurrent writers of the same key cannot
/// cause a lost update between the comparison and the write.
pub fn reconcile(
    conn: &mut Connection,
    principal_id: &str,
    device_id: &str,
    items: &[SyncItem],
) -> Result<SyncReport> {
    for item in items {
        if item.entity.trim().is_empty() {
            return Err(AppError::BadRequest(msg::ENTITY_EMPTY.into()));
        }
        if item.key.trim().is_empty() {
            return Err(AppError::BadRequest(msg::KEY_EMPTY.into()));
        }
    }

    let now = Utc::now().timestamp();
    let mut report = SyncReport::default();

    for item in items {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing =
            queries::get_cache_entry(&tx, principal_id, device_id, &item.entity, &item.key)?
                .filter(|entry| !entry.is_expired(now));

        match existing {
            None => {
                queries::save_cache_entry_within(
                    &tx,
                    principal_id,
                    device_id,
                    &item.entity,
                    &item.key,
                    &item.payload,
                    None,
                    Some(item.version),
                )?;
            }
            Some(server) if server.version > item.version => {
                report.updated.push(SyncUpdated {
                    entity: item.entity.clone(),
                    key: item.key.clone(),
                    server_version: server.version,
                });
            }
            Some(server) if server.version < item.version => {
                queries::save_cache_entry_within(
                    &tx,
                    principal_id,
                    device_id,
                    &item.entity,
                    &item.key,
                    &item.payload,
                    None,
                    None,
                )?;
            }
            Some(server) => {
                let client_checksum = payload_checksum(&item.payload);
                if client_checksum != server.checksum {
                    report.conflicts.push(SyncConflict {
                        entity: item.entity.clone(),
                        key: item.key.clone(),
                        server_version: server.version,
                        client_version: item.version,
                        server_checksum: server.checksum,
                        client_checksum,
                    });
                }
                // Equal checksum: both sides already agree - the common
                // steady-state case, reported as nothing at all.
            }
        }

        tx.commit()?;
    }

    Ok(report)
}
