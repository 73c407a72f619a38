//! # Resolver
//!
//! Reconstructs live entities from a batch of transfer records.
//!
//! Resolution is two-phase: every record is first instantiated as a bare
//! entity and entered into a `LookupTable`, then each entity's relations are
//! populated from its record. Forward references therefore resolve no matter
//! in which order the records arrived.
//!
//! A relation target that is absent from the lookup is not an error: the
//! batch may be intentionally shallow, so the relation is left unset.
//! A target that is present but of a kind the relation does not accept is
//! an error, as is a record whose type tag disagrees with its entity.

use crate::model::Entity;
use crate::primitives::MAX_BATCH_RECORDS;
use crate::record::TransferRecord;
use crate::registry::Registry;
use crate::store::EntityStore;
use crate::{EntityId, EntityKind, RelationDecl, RevgraphError};
use std::collections::BTreeMap;

// =============================================================================
// LOOKUP TABLE
// =============================================================================

/// Identifier -> concrete kind of every entity visible to one batch.
///
/// Holds kinds rather than entities so that each entity can be mutated in
/// place while the table is consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    kinds: BTreeMap<EntityId, EntityKind>,
}

impl LookupTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let kinds = entities.into_iter().map(|e| (e.id(), e.kind())).collect();
        Self { kinds }
    }

    /// Every entity currently held by `store`.
    #[must_use]
    pub fn from_store(store: &EntityStore) -> Self {
        Self::from_entities(store.iter())
    }

    /// Register an entity. Returns the kind previously held for `id`, if any.
    pub fn insert(&mut self, id: EntityId, kind: EntityKind) -> Option<EntityKind> {
        self.kinds.insert(id, kind)
    }

    #[must_use]
    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.kinds.get(&id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.kinds.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

// =============================================================================
// LINKER
// =============================================================================

/// Per-entity view of the lookup used by `EntityType::resolve`.
///
/// Checks every candidate target against the declared relation and drops
/// the ones the batch does not hold.
pub struct Linker<'a> {
    registry: &'a Registry,
    lookup: &'a LookupTable,
    kind: EntityKind,
}

impl<'a> Linker<'a> {
    fn new(registry: &'a Registry, lookup: &'a LookupTable, kind: EntityKind) -> Self {
        Self {
            registry,
            lookup,
            kind,
        }
    }

    /// `Ok(true)` if `target` is present and acceptable, `Ok(false)` if absent.
    fn admit(&self, decl: &RelationDecl, target: EntityId) -> Result<bool, RevgraphError> {
        match self.lookup.kind_of(target) {
            None => {
                tracing::trace!(
                    kind = %self.kind,
                    relation = decl.name,
                    %target,
                    "relation target not in batch, left unset"
                );
                Ok(false)
            }
            Some(found) if self.registry.accepts(decl.target, found) => Ok(true),
            Some(found) => Err(RevgraphError::RelationTargetMismatch {
                relation: decl.name,
                target,
                expected: decl.target,
                found,
            }),
        }
    }

    /// Resolve a zero-or-one relation.
    pub fn single(
        &self,
        relation: &str,
        target: Option<EntityId>,
    ) -> Result<Option<EntityId>, RevgraphError> {
        let decl = self.registry.relation(self.kind, relation)?;
        match target {
            Some(id) if self.admit(decl, id)? => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    /// Resolve a collection relation, keeping only targets the batch holds.
    pub fn multi(
        &self,
        relation: &str,
        targets: &[EntityId],
    ) -> Result<Vec<EntityId>, RevgraphError> {
        let decl = self.registry.relation(self.kind, relation)?;
        let mut resolved = Vec::with_capacity(targets.len());
        for &id in targets {
            if self.admit(decl, id)? {
                resolved.push(id);
            }
        }
        Ok(resolved)
    }

    /// The container back-reference, if the batch holds the container.
    #[must_use]
    pub fn container(&self, container: Option<EntityId>) -> Option<EntityId> {
        container.filter(|id| self.lookup.contains(*id))
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Populates entities from records against a shared registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a Registry,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Instantiate the bare entity a record's type tag names.
    pub fn instantiate(&self, record: &TransferRecord) -> Result<Entity, RevgraphError> {
        self.registry.ensure_registered(record.kind())?;
        Ok(Entity::from_record(record))
    }

    /// Populate `entity`'s relations from `record`.
    ///
    /// On error the entity is left untouched.
    pub fn resolve(
        &self,
        entity: &mut Entity,
        record: &TransferRecord,
        lookup: &LookupTable,
    ) -> Result<(), RevgraphError> {
        if entity.kind() != record.kind() {
            return Err(RevgraphError::TypeMismatch {
                id: entity.id(),
                expected: entity.kind(),
                found: record.kind(),
            });
        }
        if entity.id() != record.id() {
            return Err(RevgraphError::IdentityMismatch {
                entity: entity.id(),
                record: record.id(),
            });
        }
        self.registry.ensure_registered(entity.kind())?;

        let links = Linker::new(self.registry, lookup, entity.kind());
        entity.resolve_from(record, &links)
    }
}

// =============================================================================
// BATCH OPERATIONS
// =============================================================================

/// Resolve a self-contained batch.
///
/// Entities come back in record order, with containment re-stamped so that
/// every child listed by an owner in the batch points back at that owner.
pub fn resolve_batch(
    registry: &Registry,
    records: &[TransferRecord],
) -> Result<Vec<Entity>, RevgraphError> {
    check_batch_size(records)?;
    let mut entities = resolve_into_store(registry, records)?.into_entities();
    Ok(records
        .iter()
        .filter_map(|record| entities.remove(&record.id()))
        .collect())
}

/// Rebuild a complete arena from a self-contained record set.
///
/// Not subject to `MAX_BATCH_RECORDS`: this is how stored data is loaded,
/// and a store may outgrow any single transfer batch.
pub fn resolve_into_store(
    registry: &Registry,
    records: &[TransferRecord],
) -> Result<EntityStore, RevgraphError> {
    let entities = resolve_records(registry, records, &LookupTable::new())?;
    let mut store = EntityStore::from_entities(entities);
    store.restamp_containment(registry)?;
    Ok(store)
}

/// Resolve a batch against entities the receiver already holds.
///
/// `base` lists the receiver's entities; the batch is added on top of it, so
/// relations to entities the batch does not carry still resolve. A record
/// whose type tag disagrees with the stored entity of the same identifier is
/// a `TypeMismatch`. Containment is not re-stamped here: merge the result
/// with `EntityStore::merge`.
pub fn resolve_batch_against(
    registry: &Registry,
    records: &[TransferRecord],
    base: &LookupTable,
) -> Result<Vec<Entity>, RevgraphError> {
    check_batch_size(records)?;
    resolve_records(registry, records, base)
}

fn check_batch_size(records: &[TransferRecord]) -> Result<(), RevgraphError> {
    if records.len() > MAX_BATCH_RECORDS {
        return Err(RevgraphError::BatchTooLarge {
            size: records.len(),
            max: MAX_BATCH_RECORDS,
        });
    }
    Ok(())
}

fn resolve_records(
    registry: &Registry,
    records: &[TransferRecord],
    base: &LookupTable,
) -> Result<Vec<Entity>, RevgraphError> {
    let resolver = Resolver::new(registry);

    // Phase 1: instantiate everything before touching any relation.
    let mut batch = LookupTable::new();
    let mut entities = Vec::with_capacity(records.len());
    for record in records {
        let entity = resolver.instantiate(record)?;
        match base.kind_of(entity.id()) {
            Some(stored) if stored != entity.kind() => {
                return Err(RevgraphError::TypeMismatch {
                    id: entity.id(),
                    expected: stored,
                    found: entity.kind(),
                });
            }
            _ => {}
        }
        if batch.insert(entity.id(), entity.kind()).is_some() {
            return Err(RevgraphError::DuplicateRecord(entity.id()));
        }
        entities.push(entity);
    }

    let mut lookup = base.clone();
    for entity in &entities {
        lookup.insert(entity.id(), entity.kind());
    }

    // Phase 2: link.
    for (entity, record) in entities.iter_mut().zip(records) {
        resolver.resolve(entity, record, &lookup)?;
    }

    tracing::debug!(
        records = records.len(),
        lookup = lookup.len(),
        "resolved batch"
    );
    Ok(entities)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containment::Contained;
    use crate::model::{Comment, Note, Participant, Project, Reply, Task};
    use crate::record::{CommentRecord, NoteRecord, ReplyRecord, TaskRecord};
    use crate::{Category, TypeRef};

    fn id(n: u128) -> EntityId {
        EntityId::from_u128(n)
    }

    fn registry() -> Registry {
        Registry::standard().expect("registry")
    }

    fn task_record(n: u128) -> TaskRecord {
        TaskRecord {
            id: id(n),
            container: None,
            title: format!("task {}", n),
            description: String::new(),
            status: Default::default(),
            author: None,
            assignees: Vec::new(),
            created_comments: Vec::new(),
        }
    }

    fn comment_record(n: u128) -> CommentRecord {
        CommentRecord {
            id: id(n),
            container: None,
            content: format!("comment {}", n),
            created_on: 0,
            author: None,
            created_inside: None,
            replies: Vec::new(),
        }
    }

    fn note_record(n: u128) -> NoteRecord {
        NoteRecord {
            id: id(n),
            container: None,
            content: format!("note {}", n),
            resolved: false,
            author: None,
            subject: None,
        }
    }

    fn reply_record(n: u128, reply_to: Option<EntityId>) -> ReplyRecord {
        ReplyRecord {
            id: id(n),
            container: None,
            content: format!("reply {}", n),
            author: None,
            reply_to,
        }
    }

    #[test]
    fn forward_references_resolve_regardless_of_order() {
        let registry = registry();
        let mut task = task_record(1);
        task.created_comments = vec![id(9)];
        let mut comment = comment_record(9);
        comment.created_inside = Some(id(1));
        comment.container = Some(id(1));

        // Comment arrives before the task it points at.
        let records = vec![TransferRecord::from(comment), TransferRecord::from(task)];
        let entities = resolve_batch(&registry, &records).expect("resolve");

        let Entity::Comment(comment) = &entities[0] else {
            unreachable!("expected a comment");
        };
        assert_eq!(comment.created_inside, Some(id(1)));
        assert_eq!(comment.container(), Some(id(1)));

        let Entity::Task(task) = &entities[1] else {
            unreachable!("expected a task");
        };
        assert_eq!(task.created_comments.ids(), &[id(9)]);
    }

    #[test]
    fn absent_targets_leave_relations_unset() {
        let registry = registry();
        let mut task = task_record(1);
        task.author = Some(id(50));
        task.assignees = vec![id(50), id(51)];
        task.created_comments = vec![id(52)];
        task.container = Some(id(53));

        let entities = resolve_batch(&registry, &[task.into()]).expect("resolve");
        let Entity::Task(task) = &entities[0] else {
            unreachable!("expected a task");
        };
        assert!(task.author.is_none());
        assert!(task.assignees.is_empty());
        assert!(task.created_comments.is_empty());
        assert!(task.container().is_none());
    }

    #[test]
    fn scalars_survive_resolution() {
        let registry = registry();
        let mut task = task_record(1);
        task.description = "mass budget".to_string();
        let entities = resolve_batch(&registry, &[task.into()]).expect("resolve");
        let Entity::Task(task) = &entities[0] else {
            unreachable!("expected a task");
        };
        assert_eq!(task.title, "task 1");
        assert_eq!(task.description, "mass budget");
    }

    #[test]
    fn abstract_target_yields_concrete_implementer() {
        let registry = registry();
        let records = vec![
            TransferRecord::from(comment_record(1)),
            TransferRecord::from(note_record(2)),
            TransferRecord::from(reply_record(3, Some(id(2)))),
        ];
        let store = resolve_into_store(&registry, &records).expect("resolve");

        let Some(Entity::Reply(reply)) = store.get(id(3)) else {
            unreachable!("expected a reply");
        };
        let target = reply.reply_to.expect("reply_to resolved");
        assert!(matches!(store.get(target), Some(Entity::Note(_))));
        assert_eq!(store.kind_of(target), Some(EntityKind::Note));
    }

    #[test]
    fn target_of_wrong_kind_is_rejected() {
        let registry = registry();
        // reply_to expects an annotation; a task is not one.
        let records = vec![
            TransferRecord::from(task_record(1)),
            TransferRecord::from(reply_record(2, Some(id(1)))),
        ];
        let result = resolve_batch(&registry, &records);
        assert!(matches!(
            result,
            Err(RevgraphError::RelationTargetMismatch {
                relation: "reply_to",
                expected: TypeRef::Abstract(Category::Annotation),
                found: EntityKind::Task,
                ..
            })
        ));
    }

    #[test]
    fn record_of_other_kind_is_type_mismatch() {
        let registry = registry();
        let resolver = Resolver::new(&registry);
        let mut entity = Entity::from(Reply::with_id(id(1), "reply"));
        let record = TransferRecord::from(comment_record(1));

        let result = resolver.resolve(&mut entity, &record, &LookupTable::new());
        assert!(matches!(
            result,
            Err(RevgraphError::TypeMismatch {
                expected: EntityKind::Reply,
                found: EntityKind::Comment,
                ..
            })
        ));
    }

    #[test]
    fn record_of_other_identity_is_rejected() {
        let registry = registry();
        let resolver = Resolver::new(&registry);
        let mut entity = Entity::from(Task::with_id(id(1), "one"));
        let record = TransferRecord::from(task_record(2));

        let result = resolver.resolve(&mut entity, &record, &LookupTable::new());
        assert!(matches!(result, Err(RevgraphError::IdentityMismatch { .. })));
    }

    #[test]
    fn failed_resolve_leaves_entity_untouched() {
        let registry = registry();
        let resolver = Resolver::new(&registry);
        let mut entity = Entity::from(Reply::with_id(id(3), "reply"));
        let mut record = reply_record(3, Some(id(1)));
        record.author = Some(id(2));

        let mut lookup = LookupTable::new();
        lookup.insert(id(1), EntityKind::Task);
        lookup.insert(id(2), EntityKind::Participant);

        assert!(resolver.resolve(&mut entity, &record.into(), &lookup).is_err());
        let Entity::Reply(reply) = entity else {
            unreachable!("expected a reply");
        };
        assert!(reply.author.is_none());
    }

    #[test]
    fn duplicate_records_are_rejected() {
        let registry = registry();
        let records = vec![
            TransferRecord::from(task_record(1)),
            TransferRecord::from(task_record(1)),
        ];
        let result = resolve_batch(&registry, &records);
        assert!(matches!(result, Err(RevgraphError::DuplicateRecord(_))));
    }

    #[test]
    fn unregistered_kind_fails_fast() {
        let registry = Registry::build(&[
            EntityKind::Participant,
            EntityKind::Task,
            EntityKind::Comment,
            EntityKind::Reply,
            EntityKind::Note,
        ])
        .expect("registry");
        let project = Project::new("Orbiter");
        let record = Entity::from(project).to_record();

        let result = resolve_batch(&registry, &[record]);
        assert!(matches!(
            result,
            Err(RevgraphError::UnregisteredType(EntityKind::Project))
        ));
    }

    #[test]
    fn resolve_against_base_keeps_links_outside_the_batch() {
        let registry = registry();
        let author = Participant::with_id(id(7), "Ada", "reviewer");
        let mut base = LookupTable::new();
        base.insert(author.id(), EntityKind::Participant);

        let mut task = task_record(1);
        task.author = Some(id(7));

        let entities =
            resolve_batch_against(&registry, &[task.into()], &base).expect("resolve");
        let Entity::Task(task) = &entities[0] else {
            unreachable!("expected a task");
        };
        assert_eq!(task.author, Some(id(7)));
    }

    #[test]
    fn record_retagging_a_stored_entity_is_type_mismatch() {
        let registry = registry();
        let mut base = LookupTable::new();
        base.insert(id(10), EntityKind::Task);

        let result = resolve_batch_against(&registry, &[comment_record(10).into()], &base);
        assert!(matches!(
            result,
            Err(RevgraphError::TypeMismatch {
                expected: EntityKind::Task,
                found: EntityKind::Comment,
                ..
            })
        ));
    }

    #[test]
    fn oversized_batch_is_rejected_but_store_rebuild_is_not() {
        let registry = registry();
        let records: Vec<TransferRecord> = (1..=MAX_BATCH_RECORDS as u128 + 1)
            .map(|n| Entity::from(Participant::with_id(id(n), "p", "reviewer")).to_record())
            .collect();

        assert!(matches!(
            resolve_batch(&registry, &records),
            Err(RevgraphError::BatchTooLarge { .. })
        ));
        assert!(matches!(
            resolve_batch_against(&registry, &records, &LookupTable::new()),
            Err(RevgraphError::BatchTooLarge { .. })
        ));

        let store = resolve_into_store(&registry, &records).expect("rebuild");
        assert_eq!(store.len(), MAX_BATCH_RECORDS + 1);
    }

    #[test]
    fn lookup_table_from_entities() {
        let entities = vec![
            Entity::from(Comment::with_id(id(1), "c")),
            Entity::from(Note::with_id(id(2), "n")),
        ];
        let lookup = LookupTable::from_entities(&entities);
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.kind_of(id(2)), Some(EntityKind::Note));
        assert!(!lookup.contains(id(3)));
    }
}
