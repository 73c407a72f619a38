//! # Entity Store
//!
//! The flat arena every live entity sits in, keyed by identifier.
//!
//! Relations are identifiers into this arena, so the store is the only owner
//! of entity memory. Containment is the one relation with lifetime
//! semantics: `attach`/`detach` move children between owners, and `remove`
//! takes an entity's contained subtree with it.
//!
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::containment::Contained;
use crate::model::Entity;
use crate::record::TransferRecord;
use crate::registry::Registry;
use crate::resolver::{LookupTable, Resolver};
use crate::{EntityId, EntityKind, RevgraphError};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of `EntityStore::remove`.
#[derive(Debug, Clone, Default)]
pub struct Removal {
    /// Removed entities, root first.
    pub removed: Vec<Entity>,
    /// Surviving entities that changed: the former owner and every entity
    /// whose references to a removed identifier were dropped.
    pub changed: Vec<EntityId>,
}

impl Removal {
    #[must_use]
    pub fn removed_ids(&self) -> Vec<EntityId> {
        self.removed.iter().map(Entity::id).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, Entity>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an arena from already-consistent entities.
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            entities: entities.into_iter().map(|e| (e.id(), e)).collect(),
        }
    }

    /// Insert or replace an entity. Returns the replaced version, if any.
    ///
    /// No containment bookkeeping happens here; use `attach` to give the
    /// entity an owner.
    pub fn insert(&mut self, entity: impl Into<Entity>) -> Option<Entity> {
        let entity = entity.into();
        self.entities.insert(entity.id(), entity)
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    #[must_use]
    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.entities.get(&id).map(Entity::kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Projection of every entity, in identifier order.
    #[must_use]
    pub fn records(&self) -> Vec<TransferRecord> {
        self.entities.values().map(Entity::to_record).collect()
    }

    pub fn into_entities(self) -> BTreeMap<EntityId, Entity> {
        self.entities
    }

    // =========================================================================
    // CONTAINMENT
    // =========================================================================

    /// Move `child` into `owner`'s containment relation `relation`.
    ///
    /// The child leaves its former owner's list first, so it is never held
    /// by two lists. Returns `Ok(false)` if it was already in this list.
    pub fn attach(
        &mut self,
        registry: &Registry,
        owner: EntityId,
        relation: &str,
        child: EntityId,
    ) -> Result<bool, RevgraphError> {
        let owner_kind = self
            .kind_of(owner)
            .ok_or(RevgraphError::EntityNotFound(owner))?;
        let child_kind = self
            .kind_of(child)
            .ok_or(RevgraphError::EntityNotFound(child))?;

        let decl = registry.relation(owner_kind, relation)?;
        if !decl.is_containment() {
            return Err(RevgraphError::NotContainment {
                kind: owner_kind,
                relation: relation.to_string(),
            });
        }
        if !registry.accepts(decl.target, child_kind) {
            return Err(RevgraphError::RelationTargetMismatch {
                relation: decl.name,
                target: child,
                expected: decl.target,
                found: child_kind,
            });
        }
        if self.is_ancestor_or_self(child, owner) {
            return Err(RevgraphError::ContainmentCycle { owner, child });
        }

        if let Some(previous) = self.get(child).and_then(Entity::container) {
            let already_here = previous == owner
                && self
                    .get(owner)
                    .and_then(|e| e.related(decl.name))
                    .is_some_and(|ids| ids.contains(&child));
            if already_here {
                return Ok(false);
            }
            self.forget_child(previous, child);
        }

        // Take the child out so owner and child can be borrowed together.
        let mut item = self
            .entities
            .remove(&child)
            .ok_or(RevgraphError::EntityNotFound(child))?;
        let added = match self
            .entities
            .get_mut(&owner)
            .and_then(|e| e.containment_mut(decl.name))
        {
            Some(list) => list.add(&mut item),
            None => Err(RevgraphError::UnknownRelation {
                kind: owner_kind,
                relation: relation.to_string(),
            }),
        };
        self.entities.insert(child, item);

        if let Ok(true) = added {
            tracing::trace!(%owner, relation = decl.name, %child, "attached");
        }
        added
    }

    /// Take `child` out of its owner's list and clear its container.
    ///
    /// Returns the former owner, if there was one.
    pub fn detach(&mut self, child: EntityId) -> Result<Option<EntityId>, RevgraphError> {
        let entity = self
            .entities
            .get_mut(&child)
            .ok_or(RevgraphError::EntityNotFound(child))?;
        let previous = entity.container();
        entity.set_container(None);

        if let Some(owner) = previous {
            self.forget_child(owner, child);
        }
        Ok(previous)
    }

    /// Remove an entity together with everything it contains.
    ///
    /// The entity leaves its owner's list, and every surviving entity that
    /// referred to a removed identifier is re-resolved against what remains,
    /// which drops those references the same way loading a shallow batch
    /// would.
    pub fn remove(&mut self, registry: &Registry, id: EntityId) -> Result<Removal, RevgraphError> {
        if !self.contains(id) {
            return Err(RevgraphError::EntityNotFound(id));
        }
        let owner = self.detach(id)?;

        let mut removed = Vec::new();
        self.remove_subtree(id, &mut removed);

        let gone: BTreeSet<EntityId> = removed.iter().map(Entity::id).collect();
        let mut changed = self.unlink(registry, &gone)?;
        changed.extend(owner);

        tracing::debug!(
            %id,
            removed = removed.len(),
            unlinked = changed.len(),
            "removed entity subtree"
        );
        Ok(Removal {
            removed,
            changed: changed.into_iter().collect(),
        })
    }

    /// Re-resolve every entity holding an identifier in `gone`.
    fn unlink(
        &mut self,
        registry: &Registry,
        gone: &BTreeSet<EntityId>,
    ) -> Result<BTreeSet<EntityId>, RevgraphError> {
        let referrers: BTreeSet<EntityId> = self
            .entities
            .values()
            .filter(|entity| refers_to_any(entity, gone))
            .map(Entity::id)
            .collect();
        if referrers.is_empty() {
            return Ok(referrers);
        }

        let lookup = LookupTable::from_store(self);
        let resolver = Resolver::new(registry);
        for &id in &referrers {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            let record = entity.to_record();
            let mut fresh = resolver.instantiate(&record)?;
            resolver.resolve(&mut fresh, &record, &lookup)?;
            *entity = fresh;
        }
        Ok(referrers)
    }

    fn remove_subtree(&mut self, id: EntityId, removed: &mut Vec<Entity>) {
        let Some(entity) = self.entities.remove(&id) else {
            return;
        };
        let children = entity.contained_ids();
        removed.push(entity);

        for child in children {
            let owned_here = self.get(child).and_then(Entity::container) == Some(id);
            if owned_here {
                self.remove_subtree(child, removed);
            }
        }
    }

    /// Drop `child` from every containment list of `owner`.
    fn forget_child(&mut self, owner: EntityId, child: EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(&owner) else {
            return false;
        };
        let kind = entity.kind();
        let mut forgotten = false;
        for decl in kind.declared_relations().iter().filter(|d| d.is_containment()) {
            if let Some(list) = entity.containment_mut(decl.name) {
                forgotten |= list.forget(child);
            }
        }
        forgotten
    }

    /// Whether `candidate` is `start` or one of its containers.
    fn is_ancestor_or_self(&self, candidate: EntityId, start: EntityId) -> bool {
        let mut visited = BTreeSet::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if id == candidate {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            cursor = self.get(id).and_then(Entity::container);
        }
        false
    }

    // =========================================================================
    // MERGE & RESTAMP
    // =========================================================================

    /// Insert resolved entities, replacing older versions, then re-establish
    /// containment with the merged entities' lists taking precedence.
    ///
    /// Returns every identifier whose stored state changed.
    pub fn merge(
        &mut self,
        registry: &Registry,
        entities: Vec<Entity>,
    ) -> Result<Vec<EntityId>, RevgraphError> {
        let mut merged = BTreeSet::new();
        for entity in entities {
            merged.insert(entity.id());
            self.entities.insert(entity.id(), entity);
        }

        let restamped = self.restamp_with_priority(registry, &merged)?;
        merged.extend(restamped);
        Ok(merged.into_iter().collect())
    }

    /// Make every containment list and container back-reference agree.
    ///
    /// Lists are authoritative: the first owner (in identifier order) that
    /// lists a child claims it and later lists drop it. A child whose
    /// container does not list it is appended to that container's matching
    /// list when there is one and orphaned otherwise. Any container cycle is
    /// broken at its lowest identifier.
    ///
    /// Returns the identifiers that were modified.
    pub fn restamp_containment(
        &mut self,
        registry: &Registry,
    ) -> Result<Vec<EntityId>, RevgraphError> {
        let changed = self.restamp_with_priority(registry, &BTreeSet::new())?;
        Ok(changed.into_iter().collect())
    }

    fn restamp_with_priority(
        &mut self,
        registry: &Registry,
        priority: &BTreeSet<EntityId>,
    ) -> Result<BTreeSet<EntityId>, RevgraphError> {
        let mut changed = BTreeSet::new();
        let mut claimed: BTreeMap<EntityId, EntityId> = BTreeMap::new();

        let owners: Vec<EntityId> = priority
            .iter()
            .copied()
            .filter(|id| self.contains(*id))
            .chain(self.ids().filter(|id| !priority.contains(id)))
            .collect();

        // Pass 1: owners claim the children they list.
        for &owner in &owners {
            let kind = self
                .kind_of(owner)
                .ok_or(RevgraphError::EntityNotFound(owner))?;
            for decl in registry.containment_relations(kind)? {
                let listed = self
                    .get(owner)
                    .and_then(|e| e.related(decl.name))
                    .unwrap_or_default();
                for child in listed {
                    let acceptable = self
                        .kind_of(child)
                        .is_some_and(|k| registry.accepts(decl.target, k));
                    if acceptable && !claimed.contains_key(&child) {
                        claimed.insert(child, owner);
                        continue;
                    }

                    tracing::warn!(
                        %owner,
                        relation = decl.name,
                        %child,
                        "dropping child claimed elsewhere or unavailable"
                    );
                    if let Some(list) = self
                        .entities
                        .get_mut(&owner)
                        .and_then(|e| e.containment_mut(decl.name))
                    {
                        list.forget(child);
                    }
                    changed.insert(owner);
                }
            }
        }

        // Pass 2: back-references follow the claims.
        for &id in &owners {
            let Some(stamped) = self.get(id).map(Entity::container) else {
                continue;
            };
            match (claimed.get(&id).copied(), stamped) {
                (Some(owner), Some(current)) if owner == current => {}
                (Some(owner), _) => {
                    self.set_container(id, Some(owner));
                    changed.insert(id);
                }
                (None, None) => {}
                (None, Some(owner)) => {
                    if self.adopt(registry, owner, id)? {
                        claimed.insert(id, owner);
                        changed.insert(owner);
                    } else {
                        self.set_container(id, None);
                    }
                    changed.insert(id);
                }
            }
        }

        // Pass 3: no entity may (transitively) contain itself.
        for &id in &owners {
            if self.in_container_cycle(id) {
                tracing::warn!(%id, "breaking containment cycle");
                self.detach(id)?;
                changed.insert(id);
            }
        }

        Ok(changed)
    }

    /// Append `child` to the first containment list of `owner` that accepts it.
    fn adopt(
        &mut self,
        registry: &Registry,
        owner: EntityId,
        child: EntityId,
    ) -> Result<bool, RevgraphError> {
        let (Some(owner_kind), Some(child_kind)) = (self.kind_of(owner), self.kind_of(child))
        else {
            return Ok(false);
        };
        if owner == child {
            return Ok(false);
        }

        let Some(decl) = registry
            .containment_relations(owner_kind)?
            .find(|decl| registry.accepts(decl.target, child_kind))
        else {
            return Ok(false);
        };

        let mut item = self
            .entities
            .remove(&child)
            .ok_or(RevgraphError::EntityNotFound(child))?;
        let added = match self
            .entities
            .get_mut(&owner)
            .and_then(|e| e.containment_mut(decl.name))
        {
            Some(list) => list.add(&mut item).map(|_| true),
            None => Ok(false),
        };
        self.entities.insert(child, item);
        added
    }

    fn set_container(&mut self, id: EntityId, container: Option<EntityId>) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.set_container(container);
        }
    }

    fn in_container_cycle(&self, id: EntityId) -> bool {
        match self.get(id).and_then(Entity::container) {
            Some(parent) => self.is_ancestor_or_self(id, parent),
            None => false,
        }
    }
}

fn refers_to_any(entity: &Entity, ids: &BTreeSet<EntityId>) -> bool {
    entity.container().is_some_and(|c| ids.contains(&c))
        || entity
            .kind()
            .declared_relations()
            .iter()
            .filter_map(|decl| entity.related(decl.name))
            .flatten()
            .any(|target| ids.contains(&target))
}

// =============================================================================
// TESTS
// =============================================================================
