//! Compiled route entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::SourceConfig;
use crate::source::{SharedResolver, SourceHandle, SourceLoadError};
use crate::template::{CompiledTemplate, TemplateError};

/// Why a route entry could not be built.
///
/// Never stored: a failed build leaves the cache untouched so the next
/// request retries resolution.
#[derive(Debug, Error)]
pub enum RouteBuildError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Source(#[from] SourceLoadError),
}

/// A handler bound to one concrete, already-interpolated source identifier,
/// plus the timing/cors flags copied from its prefix's configuration.
///
/// Entries are created lazily on cache miss, owned exclusively by the route
/// cache, and never mutated; a parameter change yields a new cache key and
/// a new entry.
pub struct RouteEntry {
    pub source: SourceHandle,
    pub source_uri: String,
    pub timing: bool,
    pub cors: bool,
}

impl RouteEntry {
    /// Render the template against the effective parameters and resolve the
    /// result into a live source.
    pub async fn build(
        template: Arc<CompiledTemplate>,
        resolver: SharedResolver,
        config: Arc<SourceConfig>,
        params: BTreeMap<String, Value>,
    ) -> Result<Self, RouteBuildError> {
        let source_uri = template.render(&params)?;
        tracing::debug!(prefix = %config.prefix, uri = %source_uri, "resolving tile source");
        let source = resolver.resolve(&source_uri).await?;
        Ok(Self {
            source,
            source_uri,
            timing: config.timing,
            cors: config.cors,
        })
    }
}
