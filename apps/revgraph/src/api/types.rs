//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API. Transfer
//! records travel as-is: each is an object keyed by its kind, e.g.
//! `{"task": {"id": "...", "title": "...", "created_comments": [...]}}`.

use axum::http::StatusCode;
use revgraph_core::{
    Cardinality, Category, Depth, EntityId, EntityKind, Ownership, Registry, RelationDecl,
    RevgraphError, Tier, TransferRecord, TypeRef, primitives::DEFAULT_WALK_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// HTTP status for an engine error.
///
/// Batches that are well-formed JSON but do not fit the type declarations are
/// 422; malformed input is 400; an unknown root is 404; storage is 500.
pub fn status_for(error: &RevgraphError) -> StatusCode {
    match error {
        RevgraphError::TypeMismatch { .. }
        | RevgraphError::IdentityMismatch { .. }
        | RevgraphError::RelationTargetMismatch { .. }
        | RevgraphError::UnregisteredType(_)
        | RevgraphError::DuplicateRecord(_)
        | RevgraphError::UnknownRelation { .. }
        | RevgraphError::NotContainment { .. }
        | RevgraphError::ContainmentCycle { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RevgraphError::EntityNotFound(_) => StatusCode::NOT_FOUND,
        RevgraphError::SerializationError(_)
        | RevgraphError::InvalidIdentifier(_)
        | RevgraphError::BatchTooLarge { .. } => StatusCode::BAD_REQUEST,
        RevgraphError::EmptyCategory(_)
        | RevgraphError::DuplicateRelation { .. }
        | RevgraphError::IoError(_)
        | RevgraphError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub entity_count: usize,
    pub persistent: bool,
    /// Entity count per kind name; kinds with no entities are omitted.
    pub kinds: BTreeMap<String, usize>,
}

impl StatusResponse {
    pub fn from_records(records: &[TransferRecord], persistent: bool) -> Self {
        let mut kinds = BTreeMap::new();
        for record in records {
            *kinds.entry(record.kind().name().to_string()).or_insert(0) += 1;
        }
        Self {
            entity_count: records.len(),
            persistent,
            kinds,
        }
    }
}

// =============================================================================
// FETCH REQUEST/RESPONSE
// =============================================================================

/// Depth-scoped projection request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub root: EntityId,
    /// Walk budget; defaults to `DEFAULT_WALK_DEPTH`. Negative selects nothing.
    #[serde(default)]
    pub depth: Option<Depth>,
}

impl FetchRequest {
    /// The requested depth, rejected if deeper than `max_depth`.
    pub fn checked_depth(&self, max_depth: Depth) -> Result<Depth, String> {
        let depth = self.depth.unwrap_or(DEFAULT_WALK_DEPTH);
        if depth > max_depth {
            return Err(format!("Depth {} exceeds maximum {}", depth, max_depth));
        }
        Ok(depth)
    }
}

/// Fetch response: the records the walk selected, in walk order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    pub root: Option<EntityId>,
    pub depth: Depth,
    pub records: Vec<TransferRecord>,
    pub error: Option<String>,
}

impl FetchResponse {
    pub fn success(root: EntityId, depth: Depth, records: Vec<TransferRecord>) -> Self {
        Self {
            success: true,
            root: Some(root),
            depth,
            records,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            root: None,
            depth: 0,
            records: vec![],
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// APPLY REQUEST/RESPONSE
// =============================================================================

/// A batch of records to resolve and merge into the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub records: Vec<TransferRecord>,
}

/// Apply response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub success: bool,
    pub resolved: usize,
    /// Every entity written, including owners whose lists were re-stamped.
    pub changed: Vec<EntityId>,
    pub error: Option<String>,
}

impl ApplyResponse {
    pub fn success(resolved: usize, changed: Vec<EntityId>) -> Self {
        Self {
            success: true,
            resolved,
            changed,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            resolved: 0,
            changed: vec![],
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>, // Base64 encoded batch
    pub record_count: usize,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: &[u8], record_count: usize) -> Self {
        Self {
            success: true,
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                data,
            )),
            record_count,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            record_count: 0,
            error: Some(msg.into()),
        }
    }

    /// Decode the base64 payload back into batch bytes.
    pub fn decode_data(&self) -> Option<Vec<u8>> {
        let data = self.data.as_ref()?;
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, data).ok()
    }
}

// =============================================================================
// REGISTRY RESPONSE
// =============================================================================

/// One relation declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationJson {
    pub name: String,
    pub tier: Tier,
    pub cardinality: Cardinality,
    pub target: TypeRef,
    pub ownership: Ownership,
}

impl From<&RelationDecl> for RelationJson {
    fn from(decl: &RelationDecl) -> Self {
        Self {
            name: decl.name.to_string(),
            tier: decl.tier,
            cardinality: decl.cardinality,
            target: decl.target,
            ownership: decl.ownership,
        }
    }
}

/// One registered concrete type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeJson {
    pub kind: EntityKind,
    pub categories: Vec<Category>,
    pub relations: Vec<RelationJson>,
}

/// One abstract category and its implementers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryJson {
    pub category: Category,
    pub implementers: Vec<EntityKind>,
}

/// The registry's declaration table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub types: Vec<TypeJson>,
    pub categories: Vec<CategoryJson>,
}

impl RegistryResponse {
    pub fn from_registry(registry: &Registry) -> Self {
        let types = registry
            .kinds()
            .map(|kind| TypeJson {
                kind,
                categories: kind.categories().to_vec(),
                relations: registry
                    .relations(kind)
                    .unwrap_or_default()
                    .iter()
                    .map(RelationJson::from)
                    .collect(),
            })
            .collect();

        let categories = Category::ALL
            .into_iter()
            .map(|category| CategoryJson {
                category,
                implementers: registry.implementers(category).to_vec(),
            })
            .collect();

        Self { types, categories }
    }
}
