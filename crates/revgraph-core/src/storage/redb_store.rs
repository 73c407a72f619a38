//! # redb-backed Record Storage
//!
//! A disk-backed store of transfer records using the redb embedded database:
//! ACID transactions, copy-on-write crash safety, concurrent readers.
//!
//! Records are keyed by the 128-bit form of their identifier and stored
//! postcard-encoded. The engine never queries storage itself, so this store
//! plays the persistence collaborator: `fetch_scope` loads records, rebuilds
//! the arena and hands back exactly what the walker would select.

use crate::record::TransferRecord;
use crate::registry::Registry;
use crate::resolver::resolve_into_store;
use crate::store::EntityStore;
use crate::walker::Walker;
use crate::{Depth, EntityId, EntityKind, RevgraphError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::BTreeMap;
use std::path::Path;

/// Table for records: EntityId (u128) -> postcard-encoded TransferRecord
const RECORDS: TableDefinition<u128, &[u8]> = TableDefinition::new("records");

pub struct RedbStore {
    db: Database,
    /// In-memory index of every stored identifier and its kind.
    kinds: BTreeMap<EntityId, EntityKind>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("records", &self.kinds.len())
            .finish_non_exhaustive()
    }
}

fn io_err(e: impl std::fmt::Display) -> RevgraphError {
    RevgraphError::IoError(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<TransferRecord, RevgraphError> {
    postcard::from_bytes(bytes).map_err(|e| RevgraphError::SerializationError(e.to_string()))
}

impl RedbStore {
    /// Open or create a record database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RevgraphError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(RECORDS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let mut store = Self {
            db,
            kinds: BTreeMap::new(),
        };
        store.kinds = store
            .load_all()?
            .iter()
            .map(|record| (record.id(), record.kind()))
            .collect();

        tracing::debug!(
            path = %path.as_ref().display(),
            records = store.kinds.len(),
            "opened record store"
        );
        Ok(store)
    }

    /// Write records in a single transaction, replacing any stored version.
    pub fn put_records(&mut self, records: &[TransferRecord]) -> Result<(), RevgraphError> {
        self.write_batch(records, &[]).map(|_| ())
    }

    /// Upsert `put` and delete `remove` in one ACID transaction.
    ///
    /// Returns how many of the `remove` identifiers were stored.
    pub fn write_batch(
        &mut self,
        put: &[TransferRecord],
        remove: &[EntityId],
    ) -> Result<usize, RevgraphError> {
        if put.is_empty() && remove.is_empty() {
            return Ok(0);
        }

        let write_txn = self.db.begin_write().map_err(io_err)?;
        let mut removed = 0;
        {
            let mut table = write_txn.open_table(RECORDS).map_err(io_err)?;
            for record in put {
                let bytes = postcard::to_allocvec(record)
                    .map_err(|e| RevgraphError::SerializationError(e.to_string()))?;
                table
                    .insert(record.id().as_u128(), bytes.as_slice())
                    .map_err(io_err)?;
            }
            for id in remove {
                if table.remove(id.as_u128()).map_err(io_err)?.is_some() {
                    removed += 1;
                }
            }
        }
        write_txn.commit().map_err(io_err)?;

        // Update in-memory state only after successful commit.
        for record in put {
            self.kinds.insert(record.id(), record.kind());
        }
        for id in remove {
            self.kinds.remove(id);
        }
        tracing::trace!(put = put.len(), removed, "record batch committed");
        Ok(removed)
    }

    pub fn get_record(&self, id: EntityId) -> Result<Option<TransferRecord>, RevgraphError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RECORDS).map_err(io_err)?;
        table
            .get(id.as_u128())
            .map_err(io_err)?
            .map(|data| decode(data.value()))
            .transpose()
    }

    /// Delete the given records in one transaction. Returns how many existed.
    pub fn remove(&mut self, ids: &[EntityId]) -> Result<usize, RevgraphError> {
        self.write_batch(&[], ids)
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.kinds.contains_key(&id)
    }

    #[must_use]
    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.kinds.get(&id).copied()
    }

    /// Number of stored records, as reported by the table.
    pub fn len(&self) -> Result<usize, RevgraphError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RECORDS).map_err(io_err)?;
        let count = table.len().map_err(io_err)?;
        usize::try_from(count).map_err(io_err)
    }

    pub fn is_empty(&self) -> Result<bool, RevgraphError> {
        Ok(self.len()? == 0)
    }

    /// Every stored record, in identifier order.
    pub fn load_all(&self) -> Result<Vec<TransferRecord>, RevgraphError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RECORDS).map_err(io_err)?;

        let mut records = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }

    /// Rebuild the full arena from storage.
    pub fn load_store(&self, registry: &Registry) -> Result<EntityStore, RevgraphError> {
        resolve_into_store(registry, &self.load_all()?)
    }

    /// The records the walker selects from `root` within `depth`, in walk
    /// order.
    pub fn fetch_scope(
        &self,
        registry: &Registry,
        root: EntityId,
        depth: Depth,
    ) -> Result<Vec<TransferRecord>, RevgraphError> {
        let store = self.load_store(registry)?;
        let ids = Walker::new(registry, &store).associated(root, depth)?;
        Ok(ids
            .into_iter()
            .filter_map(|id| store.get(id))
            .map(|entity| entity.to_record())
            .collect())
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), RevgraphError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
