//! Tilegate, a dynamic-routing tile-serving gateway.
//!
//! Tilegate maps URL prefixes to templated tile-source identifiers. Each
//! request interpolates its query parameters into the prefix's source
//! template, resolves the resulting identifier through a pluggable backend,
//! and serves tiles from the resolved source. Compiled per-parameter-set
//! handlers are kept in a bounded LRU cache with single-flight miss
//! handling, so a given (prefix, parameter-set) combination is resolved at
//! most once concurrently. Sources that report a vector output format
//! additionally get an inspection overlay mounted at `<prefix>/_`.

pub mod cache;
pub mod config;
pub mod gateway;
pub mod observability;
pub mod source;
pub mod template;

pub use cache::{CacheKey, RouteCache};
pub use config::schema::{GatewayConfig, SourceConfig};
pub use gateway::{Gateway, RouteEntry};
pub use template::CompiledTemplate;
