//! # Core Type Definitions
//!
//! This module contains the vocabulary shared by every part of the engine:
//! - Entity identifiers (`EntityId`) and graph-walk budgets (`Depth`, `Tier`)
//! - Type tags (`EntityKind`, `Category`, `TypeRef`)
//! - Relation metadata (`RelationDecl`, `Cardinality`, `Ownership`)
//! - Error types (`RevgraphError`)
//!
//! ## Determinism Guarantees
//!
//! Every tag and identifier implements `Ord` so that arenas, registries and
//! lookup tables can use `BTreeMap`/`BTreeSet` and iterate in a stable order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS & BUDGETS
// =============================================================================

/// Globally unique identifier of an entity.
///
/// Stable for the entity's lifetime. Equality of entities is equality of
/// their identifiers, never of their field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Assign a fresh identifier to a brand-new entity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a caller-supplied identifier (reconstruction from storage).
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an identifier from its 128-bit integer form.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// The 128-bit integer form, used as the storage key.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0.as_u128()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for EntityId {
    type Err = RevgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| RevgraphError::InvalidIdentifier(format!("{}: {}", s, e)))
    }
}

/// Remaining walk budget. Negative budgets select nothing.
pub type Depth = i64;

/// Per-relation marker: a relation of tier `k` is followed only while the
/// remaining budget is at least `k`.
pub type Tier = u32;

// =============================================================================
// TYPE TAGS
// =============================================================================

/// Concrete (instantiable) entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Participant,
    Task,
    Comment,
    Note,
    Reply,
}

impl EntityKind {
    /// Every concrete kind, in declaration order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Project,
        EntityKind::Participant,
        EntityKind::Task,
        EntityKind::Comment,
        EntityKind::Note,
        EntityKind::Reply,
    ];

    /// Stable lowercase name, identical to the serialized tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Participant => "participant",
            EntityKind::Task => "task",
            EntityKind::Comment => "comment",
            EntityKind::Note => "note",
            EntityKind::Reply => "reply",
        }
    }

    /// Abstract categories this kind implements.
    #[must_use]
    pub fn categories(&self) -> &'static [Category] {
        match self {
            EntityKind::Comment | EntityKind::Note => &[Category::Annotation],
            EntityKind::Project
            | EntityKind::Participant
            | EntityKind::Task
            | EntityKind::Reply => &[],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Abstract (non-instantiable) entity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Free-standing review remarks: comments and notes.
    Annotation,
}

impl Category {
    pub const ALL: [Category; 1] = [Category::Annotation];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Category::Annotation => "annotation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared target of a relation: one concrete kind or an abstract category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum TypeRef {
    Concrete(EntityKind),
    Abstract(Category),
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Concrete(kind) => kind.fmt(f),
            TypeRef::Abstract(category) => write!(f, "<{}>", category),
        }
    }
}

impl From<EntityKind> for TypeRef {
    fn from(kind: EntityKind) -> Self {
        TypeRef::Concrete(kind)
    }
}

impl From<Category> for TypeRef {
    fn from(category: Category) -> Self {
        TypeRef::Abstract(category)
    }
}

// =============================================================================
// RELATION METADATA
// =============================================================================

/// Zero-or-one versus unordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Single,
    Multi,
}

/// Whether the relation owns its targets.
///
/// `Containment` relations are backed by a `ContainmentList`; the targets'
/// lifetime is bound to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Reference,
    Containment,
}

/// One row of a type's relation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationDecl {
    pub name: &'static str,
    pub tier: Tier,
    pub cardinality: Cardinality,
    pub target: TypeRef,
    pub ownership: Ownership,
}

impl RelationDecl {
    /// A zero-or-one reference.
    #[must_use]
    pub const fn single(name: &'static str, target: TypeRef, tier: Tier) -> Self {
        Self {
            name,
            tier,
            cardinality: Cardinality::Single,
            target,
            ownership: Ownership::Reference,
        }
    }

    /// A collection of references.
    #[must_use]
    pub const fn multi(name: &'static str, target: TypeRef, tier: Tier) -> Self {
        Self {
            name,
            tier,
            cardinality: Cardinality::Multi,
            target,
            ownership: Ownership::Reference,
        }
    }

    /// A collection the declaring entity owns.
    #[must_use]
    pub const fn contains(name: &'static str, target: TypeRef, tier: Tier) -> Self {
        Self {
            name,
            tier,
            cardinality: Cardinality::Multi,
            target,
            ownership: Ownership::Containment,
        }
    }

    #[must_use]
    pub fn is_containment(&self) -> bool {
        self.ownership == Ownership::Containment
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the engine.
///
/// - No silent failures
/// - Use `Result<T, RevgraphError>` for fallible operations
/// - A missing relation target is not an error; it leaves the relation unset
#[derive(Debug, Error)]
pub enum RevgraphError {
    /// A record was handed to an entity of another type.
    #[error("Type mismatch for {id}: entity is {expected}, record is {found}")]
    TypeMismatch {
        id: EntityId,
        expected: EntityKind,
        found: EntityKind,
    },

    /// A record was handed to an entity with another identifier.
    #[error("Identity mismatch: entity {entity} resolved against record {record}")]
    IdentityMismatch { entity: EntityId, record: EntityId },

    /// A relation points at an entity whose type the relation does not accept.
    #[error("Relation '{relation}' expects {expected}, but {target} is a {found}")]
    RelationTargetMismatch {
        relation: &'static str,
        target: EntityId,
        expected: TypeRef,
        found: EntityKind,
    },

    /// A type was used without being registered.
    #[error("Unregistered entity type: {0}")]
    UnregisteredType(EntityKind),

    /// An abstract category used as a relation target has no registered implementer.
    #[error("Abstract category {0} has no registered implementer")]
    EmptyCategory(Category),

    /// A type declares the same relation name twice.
    #[error("Duplicate relation '{relation}' on {kind}")]
    DuplicateRelation {
        kind: EntityKind,
        relation: &'static str,
    },

    /// Two records in one batch carry the same identifier.
    #[error("Duplicate record in batch: {0}")]
    DuplicateRecord(EntityId),

    /// The named relation is not declared on the type.
    #[error("Unknown relation '{relation}' on {kind}")]
    UnknownRelation { kind: EntityKind, relation: String },

    /// The requested entity is not present.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The named relation exists but is not a containment relation.
    #[error("Relation '{relation}' on {kind} is not a containment relation")]
    NotContainment { kind: EntityKind, relation: String },

    /// Attaching would make an entity (transitively) contain itself.
    #[error("Containment cycle: {child} cannot be contained by {owner}")]
    ContainmentCycle { owner: EntityId, child: EntityId },

    /// A batch exceeds the configured record limit.
    #[error("Batch of {size} records exceeds maximum {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// An identifier could not be parsed.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// TESTS
// =============================================================================
