//! # revgraph
//!
//! Transport collaborator for the revgraph engine: HTTP API, CLI and
//! configuration. Exposed as a library so the integration tests can drive
//! the router directly.

pub mod api;
pub mod cli;
pub mod config;
