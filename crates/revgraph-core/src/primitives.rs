//! # Engine Primitives
//!
//! Hardcoded limits and format constants for the revgraph engine.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! The transport layer may apply tighter limits of its own (see the app's
//! `[server] max_depth` setting) but never looser ones.

/// Magic bytes for the binary record-batch header ("RVGR").
pub const MAGIC_BYTES: &[u8; 4] = b"RVGR";

/// Current batch serialization format version.
///
/// Increment this when making breaking changes to the record layout.
pub const FORMAT_VERSION: u8 = 1;

/// Upper bound on a walk budget.
///
/// Requests for a deeper walk are clamped. Walks are already bounded by
/// identity deduplication; this caps the recursion driven by tiered relations.
pub const MAX_WALK_DEPTH: i64 = 64;

/// Default walk budget when a caller does not name one.
pub const DEFAULT_WALK_DEPTH: i64 = 1;

/// Maximum number of records accepted in a single resolution batch.
pub const MAX_BATCH_RECORDS: usize = 100_000;
