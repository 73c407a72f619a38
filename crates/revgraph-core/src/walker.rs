//! # Graph Walker
//!
//! Collects the entities reachable from a root through registered relations,
//! bounded by a depth budget.
//!
//! At each entity the walker asks the registry for the relations whose tier
//! fits the remaining budget, reads their current identifiers and recurses
//! into every target not yet collected. The budget drops by one per hop
//! except at zero, where it stays: tier-0 relations keep expanding while
//! anything deeper stops.
//!
//! Identity deduplication before recursing is what terminates the walk on
//! cyclic graphs; no separate cycle detection exists.

use crate::model::Entity;
use crate::primitives::MAX_WALK_DEPTH;
use crate::registry::Registry;
use crate::store::EntityStore;
use crate::{Depth, EntityId, RevgraphError, TypeRef};
use std::collections::BTreeSet;

/// Depth-bounded traversal over an `EntityStore`.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'a> {
    registry: &'a Registry,
    store: &'a EntityStore,
}

impl<'a> Walker<'a> {
    #[must_use]
    pub fn new(registry: &'a Registry, store: &'a EntityStore) -> Self {
        Self { registry, store }
    }

    /// Identifiers reachable from `root` within `depth`, root first, in
    /// insertion order.
    ///
    /// A negative depth selects nothing. Identifiers the store does not hold
    /// (partially loaded graph) are skipped.
    pub fn associated(
        &self,
        root: EntityId,
        depth: Depth,
    ) -> Result<Vec<EntityId>, RevgraphError> {
        if depth < 0 {
            return Ok(Vec::new());
        }
        let entity = self
            .store
            .get(root)
            .ok_or(RevgraphError::EntityNotFound(root))?;

        // Enforce computational bound
        let bounded_depth = depth.min(MAX_WALK_DEPTH);

        let mut visited = BTreeSet::new();
        let mut order = Vec::new();
        visited.insert(root);
        order.push(root);
        self.expand(entity, bounded_depth, &mut visited, &mut order)?;

        tracing::debug!(%root, depth = bounded_depth, collected = order.len(), "walk complete");
        Ok(order)
    }

    /// Same walk, yielding the entities themselves.
    pub fn associated_entities(
        &self,
        root: EntityId,
        depth: Depth,
    ) -> Result<Vec<&'a Entity>, RevgraphError> {
        let store = self.store;
        Ok(self
            .associated(root, depth)?
            .into_iter()
            .filter_map(|id| store.get(id))
            .collect())
    }

    /// Recursive DFS helper. `entity` is already collected.
    fn expand(
        &self,
        entity: &Entity,
        depth: Depth,
        visited: &mut BTreeSet<EntityId>,
        order: &mut Vec<EntityId>,
    ) -> Result<(), RevgraphError> {
        let next_depth = if depth == 0 { 0 } else { depth - 1 };

        for decl in self
            .registry
            .scoped_properties(depth, TypeRef::Concrete(entity.kind()))?
        {
            let targets = entity
                .related(decl.name)
                .ok_or_else(|| RevgraphError::UnknownRelation {
                    kind: entity.kind(),
                    relation: decl.name.to_string(),
                })?;

            for target in targets {
                if visited.contains(&target) {
                    continue;
                }
                let Some(related) = self.store.get(target) else {
                    tracing::trace!(
                        from = %entity.id(),
                        relation = decl.name,
                        %target,
                        "related entity not loaded, skipped"
                    );
                    continue;
                };

                visited.insert(target);
                order.push(target);
                self.expand(related, next_depth, visited, order)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
