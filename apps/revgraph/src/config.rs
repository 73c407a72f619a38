//! # Configuration
//!
//! Optional TOML configuration for the binary, with environment overrides.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! max_depth = 8        # deepest walk a request may ask for
//! rate_limit = 100     # requests per second, 0 disables
//! body_limit = 2097152 # bytes
//! cors_origins = "http://localhost:3000"
//! ```
//!
//! ## Environment Overrides
//!
//! - `REVGRAPH_RATE_LIMIT`: Requests per second (0 to disable)
//! - `REVGRAPH_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all

use revgraph_core::{Depth, RevgraphError, primitives::MAX_WALK_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default rate limit: 100 requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Default request body limit (2 MB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Default deepest walk a request may ask for.
pub const DEFAULT_MAX_DEPTH: Depth = 8;

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// CONFIG STRUCTURE
// =============================================================================

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Requests asking for a deeper walk are rejected with 400.
    #[serde(default = "default_max_depth")]
    pub max_depth: Depth,

    /// Requests per second; 0 disables rate limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    #[serde(default = "default_body_limit")]
    pub body_limit: usize,

    /// Comma-separated origins, "*" for all, unset for localhost only.
    #[serde(default)]
    pub cors_origins: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_depth() -> Depth {
    DEFAULT_MAX_DEPTH
}

fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_depth: default_max_depth(),
            rate_limit: default_rate_limit(),
            body_limit: default_body_limit(),
            cors_origins: None,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Load the file at `path` (or defaults when `None`), then apply the
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, RevgraphError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RevgraphError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            RevgraphError::InvalidConfig(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(RevgraphError::InvalidConfig(format!(
                "Config file size {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            RevgraphError::InvalidConfig(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, RevgraphError> {
        let config: Self =
            toml::from_str(content).map_err(|e| RevgraphError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `REVGRAPH_*` overrides read through `lookup`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("REVGRAPH_RATE_LIMIT") {
            match raw.trim().parse() {
                Ok(rate) => self.server.rate_limit = rate,
                Err(e) => tracing::warn!("Ignoring REVGRAPH_RATE_LIMIT='{}': {}", raw, e),
            }
        }
        if let Some(origins) = lookup("REVGRAPH_CORS_ORIGINS") {
            self.server.cors_origins = Some(origins);
        }
    }

    fn validate(&self) -> Result<(), RevgraphError> {
        if !(0..=MAX_WALK_DEPTH).contains(&self.server.max_depth) {
            return Err(RevgraphError::InvalidConfig(format!(
                "server.max_depth {} outside 0..={}",
                self.server.max_depth, MAX_WALK_DEPTH
            )));
        }
        if self.server.body_limit == 0 {
            return Err(RevgraphError::InvalidConfig(
                "server.body_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
