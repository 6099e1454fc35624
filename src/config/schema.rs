//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Gateway settings come from TOML; source descriptors come from JSON
//! fragments in the shape the original deployments use: a prefix mapped to
//! either a bare template string or a detailed descriptor object.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root gateway settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Compiled route cache settings.
    pub route_cache: RouteCacheConfig,

    /// Static viewer assets.
    pub assets: AssetsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteCacheConfig {
    /// Maximum number of live compiled routes.
    pub capacity: usize,
}

impl Default for RouteCacheConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Static assets served at each prefix (and mounted overlay).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory of viewer assets; nothing is served when unset.
    pub dir: Option<PathBuf>,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One prefix's entry as written in a JSON fragment.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceDescriptor {
    /// Bare template string, shorthand for a descriptor with defaults.
    Uri(String),
    Detailed(DetailedSource),
}

/// The detailed descriptor object form.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailedSource {
    /// Source identifier template.
    pub source: String,

    /// Parameters used when a request supplies none, and for overlay
    /// probing.
    #[serde(default, rename = "defaultParams")]
    pub default_params: BTreeMap<String, Value>,

    /// Attach response-time headers to this prefix's responses.
    #[serde(default = "default_true")]
    pub timing: bool,

    /// Attach permissive CORS headers to this prefix's responses.
    #[serde(default = "default_true")]
    pub cors: bool,
}

fn default_true() -> bool {
    true
}

/// Normalized per-prefix source configuration.
///
/// Built at configuration load, immutable thereafter.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub prefix: String,
    pub template: String,
    pub default_params: BTreeMap<String, Value>,
    pub timing: bool,
    pub cors: bool,
}

impl SourceConfig {
    pub fn from_descriptor(prefix: String, descriptor: SourceDescriptor) -> Self {
        match descriptor {
            SourceDescriptor::Uri(template) => Self {
                prefix,
                template,
                default_params: BTreeMap::new(),
                timing: true,
                cors: true,
            },
            SourceDescriptor::Detailed(detailed) => Self {
                prefix,
                template: detailed.source,
                default_params: detailed.default_params,
                timing: detailed.timing,
                cors: detailed.cors,
            },
        }
    }
}
