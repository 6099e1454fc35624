//! Tile source boundary contracts.
//!
//! The gateway core never opens a data source itself. It resolves a
//! rendered source identifier into a [`SourceHandle`] through a
//! [`SourceResolver`], probes the handle's metadata, and delegates tile
//! serving to it. Backends implement these traits; everything behind them
//! (connection handling, backend-level caching, rendering) is opaque to the
//! gateway.

pub mod http;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format marker reported by sources whose tiles can be decomposed for
/// inspection; mounts the `<prefix>/_` overlay.
pub const VECTOR_FORMAT: &str = "pbf";

/// Scheme prefix selecting the inspection variant of an identifier.
pub const XRAY_PREFIX: &str = "xray+";

/// Metadata describing one resolved source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
}

impl SourceInfo {
    /// Whether the source emits a structured (vector) tile format.
    pub fn is_vector(&self) -> bool {
        self.format == VECTOR_FORMAT
    }
}

/// Tile address within a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// One tile payload as produced by a source.
#[derive(Debug, Clone)]
pub struct TileData {
    pub content_type: String,
    pub body: Bytes,
}

/// Errors resolving a source identifier into a live handle.
#[derive(Debug, Error)]
pub enum SourceLoadError {
    /// The identifier's scheme is not handled by this backend.
    #[error("unsupported source scheme in {0:?}")]
    UnsupportedScheme(String),

    /// The identifier is malformed.
    #[error("invalid source identifier {uri:?}: {reason}")]
    InvalidIdentifier { uri: String, reason: String },

    /// The backend behind the identifier could not be reached.
    #[error("source backend unreachable for {uri:?}: {reason}")]
    Unreachable { uri: String, reason: String },
}

/// Errors fetching a source's descriptive metadata.
///
/// Probe failures are never fatal to the gateway; they only suppress the
/// inspection overlay for the affected prefix.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to fetch source metadata: {0}")]
    Fetch(String),

    #[error("source metadata is malformed: {0}")]
    Malformed(String),
}

/// Errors serving a single tile from a resolved source.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("tile not found")]
    NotFound,

    #[error("upstream returned status {0}")]
    Upstream(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

/// A live, resolved tile source.
#[async_trait]
pub trait TileSource: Send + Sync + std::fmt::Debug {
    /// The concrete identifier this handle was resolved from.
    fn uri(&self) -> &str;

    /// Fetch descriptive metadata (the format prober contract).
    async fn info(&self) -> Result<SourceInfo, ProbeError>;

    /// Serve one tile.
    async fn tile(&self, coord: TileCoord) -> Result<TileData, ServeError>;
}

pub type SourceHandle = Arc<dyn TileSource>;

/// Resolves concrete source identifiers into live handles.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<SourceHandle, SourceLoadError>;
}

pub type SharedResolver = Arc<dyn SourceResolver>;
