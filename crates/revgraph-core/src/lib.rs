//! # revgraph-core
//!
//! The entity graph projection and resolution engine for revgraph.
//!
//! Turns an in-memory graph of review entities into a depth-bounded batch of
//! flat transfer records, and reconstructs an equivalent graph from such a
//! batch on the receiving side.
//!
//! ## Components
//!
//! - `registry`: per-type relation tables with tiers, abstract categories
//! - `walker`: depth-bounded, identity-deduplicated traversal
//! - `record` / `projector`: entity -> identifier-only transfer record
//! - `resolver`: record batch -> linked entities, arrival order irrelevant
//! - `containment`: the ownership-bearing relation and its back-reference
//! - `store`: the arena all entities live in
//!
//! ## Architectural Constraints
//!
//! - The registry is built once, explicitly, and passed by reference
//! - Entities refer to each other by identifier only (arena-and-index)
//! - All maps are `BTreeMap`, so every result is deterministic
//! - NO async, NO network dependencies

// =============================================================================
// MODULES
// =============================================================================

pub mod containment;
pub mod formats;
pub mod model;
pub mod primitives;
pub mod projector;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;
pub mod walker;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Cardinality, Category, Depth, EntityId, EntityKind, Ownership, RelationDecl, RevgraphError,
    Tier, TypeRef,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use containment::{Contained, ContainmentList};
pub use model::{Comment, Entity, EntityType, Note, Participant, Project, Reply, Task, TaskStatus};
pub use projector::{Projector, project_batch};
pub use record::{
    CommentRecord, NoteRecord, ParticipantRecord, ProjectRecord, ReplyRecord, TaskRecord,
    TransferRecord,
};
pub use registry::{Registry, build_registry};
pub use resolver::{
    Linker, LookupTable, Resolver, resolve_batch, resolve_batch_against, resolve_into_store,
};
pub use session::{ApplyReport, Session, StorageBackend};
pub use storage::RedbStore;
pub use store::{EntityStore, Removal};
pub use walker::Walker;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{BatchHeader, MAX_PERSISTENCE_PAYLOAD_SIZE, batch_from_bytes, batch_to_bytes};
