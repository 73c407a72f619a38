//! # Projector
//!
//! Entity -> transfer record. Scalars are copied verbatim and relations as
//! identifiers; no relation is followed beyond one hop.

use crate::model::Entity;
use crate::record::TransferRecord;
use crate::registry::Registry;
use crate::store::EntityStore;
use crate::walker::Walker;
use crate::{Depth, EntityId, RevgraphError};

/// Projects entities whose types are registered.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'a> {
    registry: &'a Registry,
}

impl<'a> Projector<'a> {
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Project one entity. Pure: the entity is not modified.
    pub fn project(&self, entity: &Entity) -> Result<TransferRecord, RevgraphError> {
        self.registry.ensure_registered(entity.kind())?;
        Ok(entity.to_record())
    }

    /// Project every entity, preserving order.
    pub fn project_batch<'e>(
        &self,
        entities: impl IntoIterator<Item = &'e Entity>,
    ) -> Result<Vec<TransferRecord>, RevgraphError> {
        entities.into_iter().map(|e| self.project(e)).collect()
    }

    /// Walk from `root` and project what the walk collects.
    pub fn project_scope(
        &self,
        store: &EntityStore,
        root: EntityId,
        depth: Depth,
    ) -> Result<Vec<TransferRecord>, RevgraphError> {
        let entities = Walker::new(self.registry, store).associated_entities(root, depth)?;
        self.project_batch(entities)
    }
}

/// Project a batch against `registry`.
pub fn project_batch<'e>(
    registry: &Registry,
    entities: impl IntoIterator<Item = &'e Entity>,
) -> Result<Vec<TransferRecord>, RevgraphError> {
    Projector::new(registry).project_batch(entities)
}

// =============================================================================
// TESTS
// =============================================================================
