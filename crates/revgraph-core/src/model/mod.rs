//! # Domain Model
//!
//! The closed catalogue of entity types reviewed by the service.
//!
//! Each concrete type is a plain struct holding its scalar fields and its
//! relations as identifiers (arena-and-index): entities never point at each
//! other directly, so cyclic graphs such as Task ↔ Comment cost nothing at
//! the memory level. Ownership is expressed by `ContainmentList` fields and
//! the `container` back-reference.
//!
//! `Entity` is the sum type over all concrete types; the engine operates on
//! it and dispatches to the per-type `EntityType` implementation.

mod annotation;
mod participant;
mod project;
mod reply;
mod task;

pub use annotation::{Comment, Note};
pub use participant::Participant;
pub use project::Project;
pub use reply::Reply;
pub use task::{Task, TaskStatus};

use crate::containment::{Contained, ContainmentList};
use crate::record::TransferRecord;
use crate::resolver::Linker;
use crate::{EntityId, EntityKind, RelationDecl, RevgraphError};

// =============================================================================
// ENTITY TYPE TRAIT
// =============================================================================

/// What every concrete entity type declares and implements.
///
/// `RELATIONS` is the registration table the `Registry` reads at startup;
/// `related` is its accessor. The two must agree: every declared name must be
/// answered by `related`, and every containment relation by `containment_mut`.
pub trait EntityType: Contained + Sized {
    const KIND: EntityKind;
    const RELATIONS: &'static [RelationDecl];

    type Record;

    /// Current identifiers held by the named relation, or `None` if the type
    /// has no such relation.
    fn related(&self, relation: &str) -> Option<Vec<EntityId>>;

    /// Mutable access to the named containment list.
    fn containment_mut(&mut self, relation: &str) -> Option<&mut ContainmentList> {
        let _ = relation;
        None
    }

    /// Project into the flat record (identifiers only).
    fn to_record(&self) -> Self::Record;

    /// Instantiate a bare entity: identifier and scalars, no relations.
    fn from_record(record: &Self::Record) -> Self;

    /// Populate relations from `record`, keeping only targets the batch holds.
    ///
    /// Nothing is assigned if any relation fails to resolve.
    fn resolve(&mut self, record: &Self::Record, links: &Linker<'_>)
    -> Result<(), RevgraphError>;
}

impl EntityKind {
    /// The relation table declared by the concrete type.
    #[must_use]
    pub fn declared_relations(&self) -> &'static [RelationDecl] {
        match self {
            EntityKind::Project => Project::RELATIONS,
            EntityKind::Participant => Participant::RELATIONS,
            EntityKind::Task => Task::RELATIONS,
            EntityKind::Comment => Comment::RELATIONS,
            EntityKind::Note => Note::RELATIONS,
            EntityKind::Reply => Reply::RELATIONS,
        }
    }
}

// =============================================================================
// ENTITY SUM TYPE
// =============================================================================

/// Any entity, tagged with its concrete type.
///
/// Equality and hashing are by identifier only.
#[derive(Debug, Clone)]
pub enum Entity {
    Project(Project),
    Participant(Participant),
    Task(Task),
    Comment(Comment),
    Note(Note),
    Reply(Reply),
}

macro_rules! dispatch {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Entity::Project($inner) => $body,
            Entity::Participant($inner) => $body,
            Entity::Task($inner) => $body,
            Entity::Comment($inner) => $body,
            Entity::Note($inner) => $body,
            Entity::Reply($inner) => $body,
        }
    };
}

impl Entity {
    #[must_use]
    pub fn id(&self) -> EntityId {
        dispatch!(self, e => e.id())
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Project(_) => EntityKind::Project,
            Entity::Participant(_) => EntityKind::Participant,
            Entity::Task(_) => EntityKind::Task,
            Entity::Comment(_) => EntityKind::Comment,
            Entity::Note(_) => EntityKind::Note,
            Entity::Reply(_) => EntityKind::Reply,
        }
    }

    #[must_use]
    pub fn container(&self) -> Option<EntityId> {
        dispatch!(self, e => e.container())
    }

    /// Identifiers currently held by the named relation.
    #[must_use]
    pub fn related(&self, relation: &str) -> Option<Vec<EntityId>> {
        dispatch!(self, e => e.related(relation))
    }

    /// Children held by any of this entity's containment lists.
    #[must_use]
    pub fn contained_ids(&self) -> Vec<EntityId> {
        self.kind()
            .declared_relations()
            .iter()
            .filter(|decl| decl.is_containment())
            .filter_map(|decl| self.related(decl.name))
            .flatten()
            .collect()
    }

    /// Mutable access to one of this entity's containment lists.
    pub fn containment_mut(&mut self, relation: &str) -> Option<&mut ContainmentList> {
        dispatch!(self, e => e.containment_mut(relation))
    }

    /// Project into a transfer record.
    #[must_use]
    pub fn to_record(&self) -> TransferRecord {
        match self {
            Entity::Project(e) => e.to_record().into(),
            Entity::Participant(e) => e.to_record().into(),
            Entity::Task(e) => e.to_record().into(),
            Entity::Comment(e) => e.to_record().into(),
            Entity::Note(e) => e.to_record().into(),
            Entity::Reply(e) => e.to_record().into(),
        }
    }

    /// Instantiate the bare entity named by the record's type tag.
    #[must_use]
    pub fn from_record(record: &TransferRecord) -> Self {
        match record {
            TransferRecord::Project(r) => Entity::Project(Project::from_record(r)),
            TransferRecord::Participant(r) => Entity::Participant(Participant::from_record(r)),
            TransferRecord::Task(r) => Entity::Task(Task::from_record(r)),
            TransferRecord::Comment(r) => Entity::Comment(Comment::from_record(r)),
            TransferRecord::Note(r) => Entity::Note(Note::from_record(r)),
            TransferRecord::Reply(r) => Entity::Reply(Reply::from_record(r)),
        }
    }

    /// Populate relations from a record of the same concrete type.
    pub(crate) fn resolve_from(
        &mut self,
        record: &TransferRecord,
        links: &Linker<'_>,
    ) -> Result<(), RevgraphError> {
        match (self, record) {
            (Entity::Project(e), TransferRecord::Project(r)) => e.resolve(r, links),
            (Entity::Participant(e), TransferRecord::Participant(r)) => e.resolve(r, links),
            (Entity::Task(e), TransferRecord::Task(r)) => e.resolve(r, links),
            (Entity::Comment(e), TransferRecord::Comment(r)) => e.resolve(r, links),
            (Entity::Note(e), TransferRecord::Note(r)) => e.resolve(r, links),
            (Entity::Reply(e), TransferRecord::Reply(r)) => e.resolve(r, links),
            (entity, record) => Err(RevgraphError::TypeMismatch {
                id: entity.id(),
                expected: entity.kind(),
                found: record.kind(),
            }),
        }
    }
}

impl Contained for Entity {
    fn id(&self) -> EntityId {
        Entity::id(self)
    }

    fn container(&self) -> Option<EntityId> {
        Entity::container(self)
    }

    fn set_container(&mut self, container: Option<EntityId>) {
        dispatch!(self, e => e.set_container(container));
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl From<Project> for Entity {
    fn from(e: Project) -> Self {
        Entity::Project(e)
    }
}

impl From<Participant> for Entity {
    fn from(e: Participant) -> Self {
        Entity::Participant(e)
    }
}

impl From<Task> for Entity {
    fn from(e: Task) -> Self {
        Entity::Task(e)
    }
}

impl From<Comment> for Entity {
    fn from(e: Comment) -> Self {
        Entity::Comment(e)
    }
}

impl From<Note> for Entity {
    fn from(e: Note) -> Self {
        Entity::Note(e)
    }
}

impl From<Reply> for Entity {
    fn from(e: Reply) -> Self {
        Entity::Reply(e)
    }
}

// =============================================================================
// TESTS
// =============================================================================
