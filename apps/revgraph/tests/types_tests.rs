//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use revgraph::api::{
    ApplyRequest, ApplyResponse, ExportResponse, FetchRequest, FetchResponse, HealthResponse,
    RegistryResponse, RelationJson, StatusResponse, status_for,
};
use revgraph_core::{
    Cardinality, Category, EntityId, EntityKind, Ownership, Registry, RevgraphError,
    TransferRecord, TypeRef,
};

fn id(n: u128) -> EntityId {
    EntityId::from_u128(n)
}

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "1.0.0");
}

// =============================================================================
// STATUS RESPONSE TESTS
// =============================================================================

#[test]
fn test_status_counts_kinds() {
    let records: Vec<TransferRecord> = serde_json::from_str(&format!(
        r#"[{{"task":{{"id":"{}","title":"A"}}}},{{"task":{{"id":"{}","title":"B"}}}},{{"note":{{"id":"{}","content":"C"}}}}]"#,
        id(1),
        id(2),
        id(3)
    ))
    .unwrap();

    let status = StatusResponse::from_records(&records, true);
    assert_eq!(status.entity_count, 3);
    assert!(status.persistent);
    assert_eq!(status.kinds.get("task"), Some(&2));
    assert_eq!(status.kinds.get("note"), Some(&1));
    assert_eq!(status.kinds.get("comment"), None);
}

// =============================================================================
// FETCH REQUEST/RESPONSE TESTS
// =============================================================================

#[test]
fn test_fetch_request_default_depth() {
    let json = format!(r#"{{"root":"{}"}}"#, id(7));
    let request: FetchRequest = serde_json::from_str(&json).unwrap();

    assert_eq!(request.root, id(7));
    assert_eq!(request.depth, None);
    assert_eq!(request.checked_depth(8), Ok(1));
}

#[test]
fn test_fetch_request_depth_limit() {
    let request = FetchRequest {
        root: id(7),
        depth: Some(9),
    };
    assert!(request.checked_depth(8).is_err());

    let negative = FetchRequest {
        root: id(7),
        depth: Some(-3),
    };
    assert_eq!(negative.checked_depth(8), Ok(-3));
}

#[test]
fn test_fetch_request_rejects_bad_id() {
    let result: Result<FetchRequest, _> = serde_json::from_str(r#"{"root":"42"}"#);
    assert!(result.is_err());
}

#[test]
fn test_fetch_response_error() {
    let response = FetchResponse::error("boom");
    assert!(!response.success);
    assert!(response.root.is_none());
    assert!(response.records.is_empty());
    assert_eq!(response.error.as_deref(), Some("boom"));
}

// =============================================================================
// APPLY REQUEST/RESPONSE TESTS
// =============================================================================

#[test]
fn test_apply_request_tagged_records() {
    let json = format!(
        r#"{{"records":[{{"comment":{{"id":"{}","content":"Hi","created_inside":"{}"}}}}]}}"#,
        id(9),
        id(1)
    );
    let request: ApplyRequest = serde_json::from_str(&json).unwrap();

    assert_eq!(request.records.len(), 1);
    let record = &request.records[0];
    assert_eq!(record.kind(), EntityKind::Comment);
    assert_eq!(record.id(), id(9));
    assert_eq!(record.references(), vec![id(1)]);
    assert_eq!(record.container(), None);
}

#[test]
fn test_apply_response_success() {
    let response = ApplyResponse::success(2, vec![id(1), id(9)]);
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["resolved"], 2);
    assert_eq!(json["changed"].as_array().map(Vec::len), Some(2));
    assert!(json["error"].is_null());
}

// =============================================================================
// EXPORT RESPONSE TESTS
// =============================================================================

#[test]
fn test_export_response_base64() {
    let response = ExportResponse::success(b"RVGR\x01", 0);
    assert_eq!(response.data.as_deref(), Some("UlZHUgE="));
    assert_eq!(response.decode_data(), Some(b"RVGR\x01".to_vec()));
}

#[test]
fn test_export_response_error() {
    let response = ExportResponse::error("nope");
    assert!(!response.success);
    assert!(response.decode_data().is_none());
}

// =============================================================================
// REGISTRY RESPONSE TESTS
// =============================================================================

#[test]
fn test_registry_response_mirrors_registry() {
    let registry = Registry::standard().unwrap();
    let response = RegistryResponse::from_registry(&registry);

    let reply = response
        .types
        .iter()
        .find(|t| t.kind == EntityKind::Reply)
        .unwrap();
    let reply_to = reply.relations.iter().find(|r| r.name == "reply_to").unwrap();
    assert_eq!(
        reply_to,
        &RelationJson {
            name: "reply_to".to_string(),
            tier: 0,
            cardinality: Cardinality::Single,
            target: TypeRef::Abstract(Category::Annotation),
            ownership: Ownership::Reference,
        }
    );

    let comment = response
        .types
        .iter()
        .find(|t| t.kind == EntityKind::Comment)
        .unwrap();
    assert_eq!(comment.categories, vec![Category::Annotation]);
}

#[test]
fn test_registry_response_round_trips_json() {
    let registry = Registry::standard().unwrap();
    let response = RegistryResponse::from_registry(&registry);
    let json = serde_json::to_string(&response).unwrap();
    let back: RegistryResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back.types.len(), response.types.len());
    assert_eq!(back.categories.len(), 1);
}

// =============================================================================
// ERROR MAPPING TESTS
// =============================================================================

#[test]
fn test_status_for_errors() {
    assert_eq!(
        status_for(&RevgraphError::TypeMismatch {
            id: id(1),
            expected: EntityKind::Task,
            found: EntityKind::Note,
        }),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        status_for(&RevgraphError::EntityNotFound(id(1))),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_for(&RevgraphError::SerializationError("bad".to_string())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_for(&RevgraphError::IoError("disk".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
