//! Request parsing helpers.
//!
//! # Responsibilities
//! - Decode supplied query parameters (last value wins on repeats)
//! - Merge prefix defaults under supplied values for template rendering
//! - Parse `/{z}/{x}/{y}.{ext}` tile paths
//!
//! # Design Decisions
//! - Only parameters the client actually supplied feed the cache key;
//!   defaults participate in rendering but never in keying
//! - Tile paths are matched structurally, no regex

use std::collections::BTreeMap;

use serde_json::Value;
use url::form_urlencoded;

use crate::source::TileCoord;

/// Decode a raw query string into a name-sorted parameter mapping.
pub fn query_params(query: Option<&str>) -> BTreeMap<String, String> {
    let Some(query) = query else {
        return BTreeMap::new();
    };
    form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

/// Build the effective parameter mapping: defaults first, request values
/// win on name collision.
pub fn effective_params(
    defaults: &BTreeMap<String, Value>,
    supplied: &BTreeMap<String, String>,
) -> BTreeMap<String, Value> {
    let mut params = defaults.clone();
    for (name, value) in supplied {
        params.insert(name.clone(), Value::String(value.clone()));
    }
    params
}

/// Parse a `/{z}/{x}/{y}.{ext}` path into a tile coordinate.
pub fn parse_tile_path(path: &str) -> Option<TileCoord> {
    let mut segments = path.strip_prefix('/')?.split('/');
    let z = segments.next()?.parse().ok()?;
    let x = segments.next()?.parse().ok()?;
    let last = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    let (y, ext) = last.split_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(TileCoord {
        z,
        x,
        y: y.parse().ok()?,
    })
}
