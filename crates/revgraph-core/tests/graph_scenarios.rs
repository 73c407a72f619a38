//! # Graph Scenario Tests (T0-T3)
//!
//! If ANY tier fails, projection and resolution cannot be trusted.
//!
//! ## Tiers
//! - T0: Registry Integrity
//! - T1: Bounded Walks
//! - T2: Projection / Resolution Round Trip
//! - T3: Ownership and Persistence

use revgraph_core::{
    Category, Comment, Contained, Entity, EntityId, EntityKind, EntityStore, LookupTable, Note,
    Participant, Project, Projector, Registry, Reply, RevgraphError, Task, TransferRecord,
    TypeRef, Walker, resolve_batch, resolve_into_store,
};

fn id(n: u128) -> EntityId {
    EntityId::from_u128(n)
}

fn registry() -> Registry {
    Registry::standard().expect("registry")
}

/// Project#1 { participants: [Participant#2], tasks: [Task#3] }
/// Task#3 { author: Participant#2, created_comments: [Comment#4] }
/// Comment#4 { created_inside: Task#3, replies: [Reply#5] }
/// Reply#5 { reply_to: Comment#4, author: Participant#2 }
/// Note#6 in Project#1 annotations, subject: Comment#4
fn review_graph(registry: &Registry) -> EntityStore {
    let mut store = EntityStore::new();
    store.insert(Project::with_id(id(1), "Orbiter"));
    store.insert(Participant::with_id(id(2), "Ada", "reviewer"));

    let mut task = Task::with_id(id(3), "Check mass budget");
    task.author = Some(id(2));
    task.assignees = vec![id(2)];
    store.insert(task);

    let mut comment = Comment::with_id(id(4), "Over budget by 3 kg");
    comment.created_inside = Some(id(3));
    comment.author = Some(id(2));
    comment.created_on = 1_700_000_000_000;
    store.insert(comment);

    let mut reply = Reply::with_id(id(5), "Fixed in rev B");
    reply.reply_to = Some(id(4));
    reply.author = Some(id(2));
    store.insert(reply);

    let mut note = Note::with_id(id(6), "Check units");
    note.subject = Some(id(4));
    store.insert(note);

    for (owner, relation, child) in [
        (1, "participants", 2),
        (1, "tasks", 3),
        (3, "created_comments", 4),
        (4, "replies", 5),
        (1, "annotations", 6),
    ] {
        store
            .attach(registry, id(owner), relation, id(child))
            .expect("attach");
    }
    store
}

// =============================================================================
// TIER T0: REGISTRY INTEGRITY
// =============================================================================

mod t0_registry_integrity {
    use super::*;

    /// T0.1: Every built-in kind registers without inconsistency.
    #[test]
    fn standard_registry_builds() {
        let registry = registry();
        assert_eq!(registry.kinds().count(), EntityKind::ALL.len());
    }

    /// T0.2: Tier-0 relations are in scope at any non-negative depth.
    #[test]
    fn tier_zero_always_in_scope() {
        let registry = registry();
        for kind in EntityKind::ALL {
            for depth in [0, 1, 5] {
                let scoped = registry
                    .scoped_properties(depth, kind.into())
                    .expect("scoped");
                for decl in registry.relations(kind).expect("registered") {
                    if decl.tier == 0 {
                        assert!(scoped.iter().any(|d| d.name == decl.name));
                    }
                }
            }
        }
    }

    /// T0.3: An abstract category scopes the union of its implementers.
    #[test]
    fn abstract_scope_unions_implementers() {
        let registry = registry();
        let scoped = registry
            .scoped_properties(1, Category::Annotation.into())
            .expect("scoped");
        for kind in registry.implementers(Category::Annotation) {
            for decl in registry.relations(*kind).expect("registered") {
                assert!(scoped.iter().any(|d| d.name == decl.name));
            }
        }
    }

    /// T0.4: A forgotten registration fails at build time, not at walk time.
    #[test]
    fn missing_registration_fails_fast() {
        let result = Registry::build(&[EntityKind::Project]);
        assert!(matches!(result, Err(RevgraphError::UnregisteredType(_))));
    }
}

// =============================================================================
// TIER T1: BOUNDED WALKS
// =============================================================================

mod t1_bounded_walks {
    use super::*;

    /// T1.1: Task#1 owns Comment#9 which points back; depth 0 yields both.
    #[test]
    fn task_comment_back_reference_at_depth_zero() {
        let registry = registry();
        let mut store = EntityStore::new();
        store.insert(Task::with_id(id(1), "Task"));
        let mut comment = Comment::with_id(id(9), "Comment");
        comment.created_inside = Some(id(1));
        comment.author = Some(id(2));
        store.insert(comment);
        store.insert(Participant::with_id(id(2), "Ada", "reviewer"));
        store
            .attach(&registry, id(1), "created_comments", id(9))
            .expect("attach");

        let walker = Walker::new(&registry, &store);
        assert_eq!(
            walker.associated(id(1), 0).expect("walk"),
            vec![id(1), id(9)]
        );
    }

    /// T1.2: The root is always first.
    #[test]
    fn root_always_included() {
        let registry = registry();
        let store = review_graph(&registry);
        let walker = Walker::new(&registry, &store);
        for root in 1..=6 {
            for depth in 0..4 {
                let ids = walker.associated(id(root), depth).expect("walk");
                assert_eq!(ids.first(), Some(&id(root)));
            }
        }
    }

    /// T1.3: Negative depth never fails and selects nothing.
    #[test]
    fn negative_depth_selects_nothing() {
        let registry = registry();
        let store = review_graph(&registry);
        let walker = Walker::new(&registry, &store);
        assert!(walker.associated(id(1), -1).expect("walk").is_empty());
    }

    /// T1.4: Deeper walks collect a superset.
    #[test]
    fn deeper_walks_grow_monotonically() {
        let registry = registry();
        let store = review_graph(&registry);
        let walker = Walker::new(&registry, &store);
        let mut previous = walker.associated(id(1), 0).expect("walk");
        for depth in 1..5 {
            let current = walker.associated(id(1), depth).expect("walk");
            for entity in &previous {
                assert!(current.contains(entity));
            }
            previous = current;
        }
        assert_eq!(previous.len(), 6);
    }

    /// T1.5: No identity appears twice.
    #[test]
    fn walk_is_identity_deduplicated() {
        let registry = registry();
        let store = review_graph(&registry);
        let walker = Walker::new(&registry, &store);
        let ids = walker.associated(id(5), 10).expect("walk");
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }
}

// =============================================================================
// TIER T2: PROJECTION / RESOLUTION ROUND TRIP
// =============================================================================

mod t2_round_trip {
    use super::*;

    /// T2.1: Every relation inside the batch is re-linked; scalars survive.
    #[test]
    fn full_graph_roundtrip() {
        let registry = registry();
        let store = review_graph(&registry);
        let records = Projector::new(&registry)
            .project_scope(&store, id(1), 5)
            .expect("project");
        let rebuilt = resolve_into_store(&registry, &records).expect("resolve");

        assert_eq!(rebuilt.records(), store.records());
    }

    /// T2.2: A shallow batch leaves relations to absent entities unset.
    #[test]
    fn shallow_batch_leaves_gaps() {
        let registry = registry();
        let store = review_graph(&registry);
        let records = Projector::new(&registry)
            .project_scope(&store, id(3), 0)
            .expect("project");
        let ids: Vec<_> = records.iter().map(TransferRecord::id).collect();
        assert_eq!(ids, vec![id(3), id(4)]);

        let entities = resolve_batch(&registry, &records).expect("resolve");
        let Entity::Task(task) = &entities[0] else {
            unreachable!("expected a task");
        };
        assert!(task.author.is_none(), "participant not in batch");
        assert_eq!(task.created_comments.ids(), &[id(4)]);
        assert!(task.container().is_none(), "project not in batch");

        let Entity::Comment(comment) = &entities[1] else {
            unreachable!("expected a comment");
        };
        assert_eq!(comment.created_inside, Some(id(3)));
        assert!(comment.replies.is_empty(), "reply not in batch");
    }

    /// T2.3: Arrival order does not matter.
    #[test]
    fn reversed_batch_resolves_identically() {
        let registry = registry();
        let store = review_graph(&registry);
        let mut records = store.records();
        let forward = resolve_into_store(&registry, &records).expect("resolve");
        records.reverse();
        let backward = resolve_into_store(&registry, &records).expect("resolve");
        assert_eq!(forward.records(), backward.records());
    }

    /// T2.4: An abstract relation resolves to the concrete implementer named
    /// by the lookup.
    #[test]
    fn abstract_relation_resolves_to_concrete() {
        let registry = registry();
        let store = review_graph(&registry);
        let rebuilt = resolve_into_store(&registry, &store.records()).expect("resolve");

        let Some(Entity::Note(note)) = rebuilt.get(id(6)) else {
            unreachable!("expected a note");
        };
        let subject = note.subject.expect("subject resolved");
        assert_eq!(rebuilt.kind_of(subject), Some(EntityKind::Comment));
        assert!(registry.accepts(TypeRef::Abstract(Category::Annotation), EntityKind::Comment));
    }

    /// T2.5: Lookup tables see the whole store.
    #[test]
    fn lookup_from_store() {
        let registry = registry();
        let store = review_graph(&registry);
        let lookup = LookupTable::from_store(&store);
        assert_eq!(lookup.len(), store.len());
        assert_eq!(lookup.kind_of(id(5)), Some(EntityKind::Reply));
    }
}

// =============================================================================
// TIER T3: OWNERSHIP AND PERSISTENCE
// =============================================================================

mod t3_ownership {
    use super::*;
    use revgraph_core::{Session, batch_from_bytes, batch_to_bytes};

    /// T3.1: Every listed child points back at its owner.
    #[test]
    fn containment_invariant_holds() {
        let registry = registry();
        let store = review_graph(&registry);
        for owner in store.iter() {
            for child in owner.contained_ids() {
                assert_eq!(
                    store.get(child).and_then(Entity::container),
                    Some(owner.id())
                );
            }
        }
    }

    /// T3.2: Moving a child never leaves it pointing at the old owner.
    #[test]
    fn moved_child_points_at_new_owner() {
        let registry = registry();
        let mut store = review_graph(&registry);
        store.insert(Task::with_id(id(7), "Second task"));
        store
            .attach(&registry, id(7), "created_comments", id(4))
            .expect("move");

        assert_eq!(store.get(id(4)).and_then(Entity::container), Some(id(7)));
        assert_eq!(
            store.get(id(3)).and_then(|e| e.related("created_comments")),
            Some(vec![])
        );
    }

    /// T3.3: Removing an owner removes everything it contains.
    #[test]
    fn removal_follows_ownership() {
        let registry = registry();
        let mut store = review_graph(&registry);
        let removal = store.remove(&registry, id(3)).expect("remove");

        assert_eq!(removal.removed_ids(), vec![id(3), id(4), id(5)]);
        // The note that remarked on the comment stays, without its subject.
        assert!(store.contains(id(6)));
        assert!(removal.changed.contains(&id(6)));
        assert_eq!(
            store.get(id(6)).and_then(|e| e.related("subject")),
            Some(vec![])
        );
        let walker = Walker::new(&registry, &store);
        assert_eq!(walker.associated(id(6), 3).expect("walk"), vec![id(6)]);
    }

    /// T3.4: Binary batches survive a persistent session.
    #[test]
    fn persistent_session_accepts_exported_batch() {
        let registry = registry();
        let store = review_graph(&registry);
        let bytes = batch_to_bytes(&store.records()).expect("encode");

        let temp = tempfile::tempdir().expect("temp dir");
        let mut session =
            Session::with_redb(registry, temp.path().join("review.redb")).expect("open");
        let records = batch_from_bytes(&bytes).expect("decode");
        session.apply(&records).expect("apply");

        assert_eq!(session.entity_count().expect("count"), 6);
        assert_eq!(session.records().expect("records"), store.records());
    }
}
