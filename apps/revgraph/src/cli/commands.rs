//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, RegistryResponse, StatusResponse};
use crate::config::ServerConfig;
use revgraph_core::{
    Depth, EntityId, Registry, RevgraphError, Session, TransferRecord, batch_from_bytes,
    batch_to_bytes, primitives::MAX_BATCH_RECORDS, resolve_into_store,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for import (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), RevgraphError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| RevgraphError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(RevgraphError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and ensure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, RevgraphError> {
    let canonical = path.canonicalize().map_err(|e| {
        RevgraphError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(RevgraphError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize an output path's parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, RevgraphError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        RevgraphError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(RevgraphError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| RevgraphError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &Path,
    backend: &str,
    config: &ServerConfig,
) -> Result<(), RevgraphError> {
    let session = load_or_create_session(db_path, backend)?;
    if !session.is_persistent() {
        tracing::warn!("File backend: changes applied over HTTP are not saved to disk");
    }

    println!("revgraph Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", config.host);
    println!("  Port:      {}", config.port);
    println!("  Backend:   {}", backend);
    println!("  Database:  {:?}", db_path);
    println!("  Max depth: {}", config.max_depth);
    println!();
    println!("Endpoints:");
    println!("  POST /fetch    - Project the walk from a root entity");
    println!("  POST /apply    - Resolve and merge a record batch");
    println!("  GET  /status   - Get store status");
    println!("  GET  /registry - Relation declaration table");
    println!("  POST /export   - Export all records");
    println!("  GET  /health   - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(config, session).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub fn cmd_status(db_path: &Path, backend: &str, json_mode: bool) -> Result<(), RevgraphError> {
    let session = load_or_create_session(db_path, backend)?;
    let status = StatusResponse::from_records(&session.records()?, session.is_persistent());

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "entity_count": status.entity_count,
            "kinds": status.kinds,
        }));
        return Ok(());
    }

    println!("revgraph Store Status");
    println!("=====================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Entities: {}", status.entity_count);
    for (kind, count) in &status.kinds {
        println!("  {:<12} {}", kind, count);
    }

    Ok(())
}

// =============================================================================
// FETCH COMMAND
// =============================================================================

/// Project the walk from `root` and print or write the records as JSON.
pub fn cmd_fetch(
    db_path: &Path,
    backend: &str,
    root: EntityId,
    depth: Depth,
    output: Option<&Path>,
) -> Result<(), RevgraphError> {
    let session = load_or_create_session(db_path, backend)?;
    let records = session.fetch(root, depth)?;

    let data = serde_json::to_vec_pretty(&records)
        .map_err(|e| RevgraphError::SerializationError(e.to_string()))?;

    match output {
        Some(path) => {
            let validated_output = validate_output_path(path)?;
            std::fs::write(&validated_output, &data)
                .map_err(|e| RevgraphError::IoError(format!("Write file: {}", e)))?;
            println!(
                "Wrote {} records (depth {}) to {:?}",
                records.len(),
                depth,
                validated_output
            );
        }
        None => println!("{}", String::from_utf8_lossy(&data)),
    }

    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Resolve a record file and merge it into the store.
pub fn cmd_import(
    db_path: &Path,
    backend: &str,
    json_mode: bool,
    input: &Path,
    format: &str,
) -> Result<(), RevgraphError> {
    tracing::info!("Importing from {:?} (format: {})", input, format);

    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| RevgraphError::IoError(format!("Read file: {}", e)))?;

    let records = parse_records(&contents, format)?;
    if records.len() > MAX_BATCH_RECORDS {
        return Err(RevgraphError::BatchTooLarge {
            size: records.len(),
            max: MAX_BATCH_RECORDS,
        });
    }

    let mut session = load_or_create_session(db_path, backend)?;
    let report = session.apply(&records)?;
    save_session(&session, db_path)?;

    if json_mode {
        print_json(&serde_json::json!({
            "resolved": report.resolved,
            "changed": report.changed,
            "entity_count": session.entity_count()?,
        }));
        return Ok(());
    }

    println!("Resolved {} records", report.resolved);
    println!("Store now has {} entities", session.entity_count()?);

    Ok(())
}

/// Decode a record file in the given format.
pub fn parse_records(contents: &[u8], format: &str) -> Result<Vec<TransferRecord>, RevgraphError> {
    match format {
        "json" => serde_json::from_slice(contents)
            .map_err(|e| RevgraphError::SerializationError(format!("Invalid JSON records: {}", e))),
        "batch" => batch_from_bytes(contents),
        _ => Err(RevgraphError::SerializationError(format!(
            "Unknown format: {}. Use: json, batch",
            format
        ))),
    }
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export every stored record.
pub fn cmd_export(
    db_path: &Path,
    backend: &str,
    output: &Path,
    format: &str,
) -> Result<(), RevgraphError> {
    let validated_output = validate_output_path(output)?;

    let session = load_or_create_session(db_path, backend)?;
    let records = session.records()?;

    let data = match format {
        "batch" => batch_to_bytes(&records)?,
        "json" => serde_json::to_vec_pretty(&records)
            .map_err(|e| RevgraphError::SerializationError(e.to_string()))?,
        _ => {
            return Err(RevgraphError::SerializationError(format!(
                "Unknown format: {}. Use: batch, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| RevgraphError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} records ({} bytes) to {:?}",
        records.len(),
        data.len(),
        validated_output
    );

    Ok(())
}

// =============================================================================
// REGISTRY COMMAND
// =============================================================================

/// Print the relation declaration table.
pub fn cmd_registry(json_mode: bool) -> Result<(), RevgraphError> {
    let registry = Registry::standard()?;
    let table = RegistryResponse::from_registry(&registry);

    if json_mode {
        print_json(&table);
        return Ok(());
    }

    for ty in &table.types {
        println!("{}", ty.kind);
        for relation in &ty.relations {
            println!(
                "  {:<18} tier {}  {:?} -> {} ({:?})",
                relation.name,
                relation.tier,
                relation.cardinality,
                relation.target,
                relation.ownership
            );
        }
    }
    for category in &table.categories {
        let names: Vec<&str> = category.implementers.iter().map(|k| k.name()).collect();
        println!("<{}> = {}", category.category, names.join(" | "));
    }

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(db_path: &Path, backend: &str, force: bool) -> Result<(), RevgraphError> {
    if db_path.exists() && !force {
        return Err(RevgraphError::IoError(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }
    if db_path.exists() {
        std::fs::remove_file(db_path)
            .map_err(|e| RevgraphError::IoError(format!("Remove existing db: {}", e)))?;
    }

    let session = load_or_create_session(db_path, backend)?;
    save_session(&session, db_path)?;
    println!("Initialized new {} database at {:?}", backend, db_path);

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a session from a database path with specified backend.
pub fn load_or_create_session(db_path: &Path, backend: &str) -> Result<Session, RevgraphError> {
    let registry = Registry::standard()?;
    match backend {
        "redb" => Session::with_redb(registry, db_path),
        "file" => {
            if !db_path.exists() {
                return Ok(Session::new(registry));
            }
            validate_file_size(db_path, MAX_IMPORT_FILE_SIZE)?;
            let data = std::fs::read(db_path)
                .map_err(|e| RevgraphError::IoError(format!("Read db: {}", e)))?;
            let records = batch_from_bytes(&data)?;
            let store = resolve_into_store(&registry, &records)?;
            Ok(Session::with_store(registry, store))
        }
        _ => Err(RevgraphError::InvalidConfig(format!(
            "Unknown backend: {}. Use: redb, file",
            backend
        ))),
    }
}

/// Save a session to a database path.
pub fn save_session(session: &Session, db_path: &Path) -> Result<(), RevgraphError> {
    if session.is_persistent() {
        // redb commits on every write.
        return Ok(());
    }
    let data = batch_to_bytes(&session.records()?)?;
    std::fs::write(db_path, &data).map_err(|e| RevgraphError::IoError(format!("Write db: {}", e)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use revgraph_core::{Comment, Task};

    fn id(n: u128) -> EntityId {
        EntityId::from_u128(n)
    }

    fn seeded(session: &mut Session) {
        session.insert(Task::with_id(id(1), "Check mass budget")).expect("task");
        let mut comment = Comment::with_id(id(9), "Over budget");
        comment.created_inside = Some(id(1));
        session.insert(comment).expect("comment");
        session
            .attach(id(1), "created_comments", id(9))
            .expect("attach");
    }

    #[test]
    fn file_backend_round_trips() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("store.rvgr");

        let mut session = load_or_create_session(&path, "file").expect("create");
        seeded(&mut session);
        save_session(&session, &path).expect("save");

        let reloaded = load_or_create_session(&path, "file").expect("reload");
        assert_eq!(reloaded.records().expect("records"), session.records().expect("records"));
    }

    #[test]
    fn redb_backend_persists_without_save() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("store.redb");
        {
            let mut session = load_or_create_session(&path, "redb").expect("create");
            seeded(&mut session);
        }
        let reloaded = load_or_create_session(&path, "redb").expect("reopen");
        assert_eq!(reloaded.entity_count().expect("count"), 2);
    }

    #[test]
    fn unknown_backend_rejected() {
        let temp = tempfile::tempdir().expect("temp dir");
        let result = load_or_create_session(&temp.path().join("x"), "sqlite");
        assert!(matches!(result, Err(RevgraphError::InvalidConfig(_))));
    }

    #[test]
    fn parse_json_and_batch_agree() {
        let mut session = Session::new(Registry::standard().expect("registry"));
        seeded(&mut session);
        let records = session.records().expect("records");

        let json = serde_json::to_vec(&records).expect("json");
        let batch = batch_to_bytes(&records).expect("batch");
        assert_eq!(parse_records(&json, "json").expect("json"), records);
        assert_eq!(parse_records(&batch, "batch").expect("batch"), records);
        assert!(matches!(
            parse_records(&json, "yaml"),
            Err(RevgraphError::SerializationError(_))
        ));
    }

    #[test]
    fn import_then_export_json() {
        let temp = tempfile::tempdir().expect("temp dir");
        let db = temp.path().join("store.redb");
        let input = temp.path().join("records.json");
        let output = temp.path().join("out.json");

        let mut source = Session::new(Registry::standard().expect("registry"));
        seeded(&mut source);
        let records = source.records().expect("records");
        std::fs::write(&input, serde_json::to_vec(&records).expect("json")).expect("write");

        cmd_import(&db, "redb", false, &input, "json").expect("import");
        cmd_export(&db, "redb", &output, "json").expect("export");

        let exported: Vec<TransferRecord> =
            serde_json::from_slice(&std::fs::read(&output).expect("read")).expect("parse");
        assert_eq!(exported, records);
    }

    #[test]
    fn init_refuses_existing_without_force() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("store.rvgr");
        cmd_init(&path, "file", false).expect("init");
        assert!(cmd_init(&path, "file", false).is_err());
        cmd_init(&path, "file", true).expect("force");
    }
}
