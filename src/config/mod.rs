//! Configuration subsystem.
//!
//! Two layers of configuration feed the gateway:
//! - gateway settings (TOML): listener address, route cache capacity,
//!   assets directory, observability knobs;
//! - source configuration (JSON): a mapping from URL prefix to a templated
//!   source descriptor, loadable from one file or a merged directory of
//!   fragments.
//!
//! The gateway core only consumes the validated, normalized mapping; it
//! never touches the filesystem itself.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, load_sources, ConfigError};
pub use schema::{GatewayConfig, SourceConfig};
