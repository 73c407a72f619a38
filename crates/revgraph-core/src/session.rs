//! # Session Module
//!
//! The transport-facing entry point: a `Registry` plus the storage backend
//! the entities live in.
//!
//! ## Storage Backends
//!
//! - `InMemory`: an `EntityStore` arena (fast, volatile unless exported)
//! - `Persistent`: a `RedbStore` of transfer records (ACID, on disk)
//!
//! Persistent mutations rebuild the arena from storage, apply the change,
//! and write back every record the change touched in one transaction.

use crate::model::Entity;
use crate::projector::Projector;
use crate::record::TransferRecord;
use crate::registry::Registry;
use crate::resolver::{LookupTable, resolve_batch_against};
use crate::storage::RedbStore;
use crate::store::EntityStore;
use crate::{Depth, EntityId, RevgraphError};
use std::path::Path;

/// Where a session's entities are kept.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory arena (fast, volatile).
    InMemory(EntityStore),
    /// Disk-backed record store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(EntityStore::new())
    }
}

/// Outcome of `Session::apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Records resolved from the batch.
    pub resolved: usize,
    /// Every stored entity whose state changed, batch entities included.
    pub changed: Vec<EntityId>,
}

/// What a mutation touched, for write-back to persistent storage.
#[derive(Debug, Default)]
struct Changes {
    dirty: Vec<EntityId>,
    deleted: Vec<EntityId>,
}

/// A registry bound to a storage backend.
///
/// Session does NOT implement Clone; the redb handle cannot be cloned.
#[derive(Debug)]
pub struct Session {
    registry: Registry,
    backend: StorageBackend,
}

impl Session {
    /// Empty in-memory session.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::with_store(registry, EntityStore::new())
    }

    #[must_use]
    pub fn with_store(registry: Registry, store: EntityStore) -> Self {
        Self {
            registry,
            backend: StorageBackend::InMemory(store),
        }
    }

    /// Open (or create) a persistent session at `path`.
    pub fn with_redb(registry: Registry, path: impl AsRef<Path>) -> Result<Self, RevgraphError> {
        Ok(Self::with_redb_store(registry, RedbStore::open(path)?))
    }

    #[must_use]
    pub fn with_redb_store(registry: Registry, store: RedbStore) -> Self {
        Self {
            registry,
            backend: StorageBackend::Persistent(store),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Depth-scoped projection rooted at `root`, in walk order.
    pub fn fetch(
        &self,
        root: EntityId,
        depth: Depth,
    ) -> Result<Vec<TransferRecord>, RevgraphError> {
        match &self.backend {
            StorageBackend::InMemory(store) => {
                Projector::new(&self.registry).project_scope(store, root, depth)
            }
            StorageBackend::Persistent(redb) => redb.fetch_scope(&self.registry, root, depth),
        }
    }

    /// A detached copy of the whole arena.
    pub fn snapshot(&self) -> Result<EntityStore, RevgraphError> {
        match &self.backend {
            StorageBackend::InMemory(store) => Ok(store.clone()),
            StorageBackend::Persistent(redb) => redb.load_store(&self.registry),
        }
    }

    /// Every stored entity projected, in identifier order.
    pub fn records(&self) -> Result<Vec<TransferRecord>, RevgraphError> {
        match &self.backend {
            StorageBackend::InMemory(store) => Ok(store.records()),
            StorageBackend::Persistent(redb) => redb.load_all(),
        }
    }

    pub fn entity_count(&self) -> Result<usize, RevgraphError> {
        match &self.backend {
            StorageBackend::InMemory(store) => Ok(store.len()),
            StorageBackend::Persistent(redb) => redb.len(),
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        match &self.backend {
            StorageBackend::InMemory(store) => store.contains(id),
            StorageBackend::Persistent(redb) => redb.contains(id),
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Resolve a batch against the stored entities and merge it in.
    ///
    /// Relations to stored entities the batch does not carry are kept. The
    /// whole batch is rejected if any record fails to resolve.
    pub fn apply(&mut self, records: &[TransferRecord]) -> Result<ApplyReport, RevgraphError> {
        let report = self.mutate(|registry, store| {
            let base = LookupTable::from_store(store);
            let entities = resolve_batch_against(registry, records, &base)?;
            let changed = store.merge(registry, entities)?;
            let report = ApplyReport {
                resolved: records.len(),
                changed: changed.clone(),
            };
            Ok((
                report,
                Changes {
                    dirty: changed,
                    deleted: Vec::new(),
                },
            ))
        })?;

        tracing::info!(
            resolved = report.resolved,
            changed = report.changed.len(),
            "applied record batch"
        );
        Ok(report)
    }

    /// Store an entity as given, replacing any previous version of the same
    /// kind.
    pub fn insert(&mut self, entity: impl Into<Entity>) -> Result<EntityId, RevgraphError> {
        let entity = entity.into();
        self.registry.ensure_registered(entity.kind())?;
        let id = entity.id();

        self.mutate(|registry, store| {
            match store.kind_of(id) {
                Some(stored) if stored != entity.kind() => {
                    return Err(RevgraphError::TypeMismatch {
                        id,
                        expected: stored,
                        found: entity.kind(),
                    });
                }
                _ => {}
            }
            let dirty = store.merge(registry, vec![entity])?;
            let changes = Changes {
                dirty,
                deleted: Vec::new(),
            };
            Ok((id, changes))
        })
    }

    /// Move `child` into `owner`'s containment relation `relation`.
    pub fn attach(
        &mut self,
        owner: EntityId,
        relation: &str,
        child: EntityId,
    ) -> Result<bool, RevgraphError> {
        self.mutate(|registry, store| {
            let previous = store.get(child).and_then(Entity::container);
            let added = store.attach(registry, owner, relation, child)?;
            let dirty = [Some(owner), Some(child), previous]
                .into_iter()
                .flatten()
                .collect();
            let changes = Changes {
                dirty,
                deleted: Vec::new(),
            };
            Ok((added, changes))
        })
    }

    /// Remove an entity and its contained subtree. Returns the removed ids.
    ///
    /// References other entities held to the removed ids are dropped.
    pub fn remove(&mut self, id: EntityId) -> Result<Vec<EntityId>, RevgraphError> {
        let removed = self.mutate(|registry, store| {
            let removal = store.remove(registry, id)?;
            let removed = removal.removed_ids();
            let changes = Changes {
                dirty: removal.changed,
                deleted: removed.clone(),
            };
            Ok((removed, changes))
        })?;

        tracing::info!(%id, removed = removed.len(), "removed entity");
        Ok(removed)
    }

    /// Run a mutation against the arena, writing touched records back when
    /// the backend is persistent.
    fn mutate<T>(
        &mut self,
        f: impl FnOnce(&Registry, &mut EntityStore) -> Result<(T, Changes), RevgraphError>,
    ) -> Result<T, RevgraphError> {
        match &mut self.backend {
            StorageBackend::InMemory(store) => {
                let (value, _) = f(&self.registry, store)?;
                Ok(value)
            }
            StorageBackend::Persistent(redb) => {
                let mut store = redb.load_store(&self.registry)?;
                let (value, changes) = f(&self.registry, &mut store)?;

                let put: Vec<TransferRecord> = changes
                    .dirty
                    .iter()
                    .filter_map(|id| store.get(*id))
                    .map(Entity::to_record)
                    .collect();
                redb.write_batch(&put, &changes.deleted)?;
                Ok(value)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
