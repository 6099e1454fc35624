//! HTTP-backed tile sources.
//!
//! Resolves templated `http(s)://` XYZ identifiers into sources that proxy
//! tile fetches upstream, and `xray+` identifiers into a passthrough
//! inspection wrapper around the inner source. This is the stock backend
//! wired up by the binary; other backends only need to implement
//! [`SourceResolver`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::source::{
    ProbeError, ServeError, SourceHandle, SourceInfo, SourceLoadError, SourceResolver, TileCoord,
    TileData, TileSource, XRAY_PREFIX,
};

const PLACEHOLDERS: [&str; 3] = ["{z}", "{x}", "{y}"];

/// Resolver for `http(s)://` XYZ templates and their `xray+` variants.
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceResolver for HttpBackend {
    async fn resolve(&self, uri: &str) -> Result<SourceHandle, SourceLoadError> {
        if let Some(inner) = uri.strip_prefix(XRAY_PREFIX) {
            let wrapped = self.resolve(inner).await?;
            return Ok(Arc::new(XraySource {
                uri: uri.to_string(),
                inner: wrapped,
            }));
        }

        let parsed = url::Url::parse(uri).map_err(|e| SourceLoadError::InvalidIdentifier {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => {}
            _ => return Err(SourceLoadError::UnsupportedScheme(uri.to_string())),
        }
        for token in PLACEHOLDERS {
            if !uri.contains(token) {
                return Err(SourceLoadError::InvalidIdentifier {
                    uri: uri.to_string(),
                    reason: format!("missing {token} placeholder"),
                });
            }
        }

        Ok(Arc::new(HttpSource {
            uri: uri.to_string(),
            host: parsed.host_str().map(str::to_string),
            client: self.client.clone(),
        }))
    }
}

/// A source that fetches tiles from a templated upstream URL.
#[derive(Debug)]
struct HttpSource {
    uri: String,
    host: Option<String>,
    client: Client,
}

impl HttpSource {
    fn tile_url(&self, coord: TileCoord) -> String {
        self.uri
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}

#[async_trait]
impl TileSource for HttpSource {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn info(&self) -> Result<SourceInfo, ProbeError> {
        Ok(SourceInfo {
            name: self.host.clone(),
            format: format_from_identifier(&self.uri),
            minzoom: None,
            maxzoom: None,
        })
    }

    async fn tile(&self, coord: TileCoord) -> Result<TileData, ServeError> {
        let url = self.tile_url(coord);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServeError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ServeError::NotFound);
        }
        if !status.is_success() {
            return Err(ServeError::Upstream(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| ServeError::Transport(e.to_string()))?;

        Ok(TileData { content_type, body })
    }
}

/// Passthrough inspection wrapper over an inner source.
#[derive(Debug)]
struct XraySource {
    uri: String,
    inner: SourceHandle,
}

#[async_trait]
impl TileSource for XraySource {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn info(&self) -> Result<SourceInfo, ProbeError> {
        let mut info = self.inner.info().await?;
        let base = info.name.unwrap_or_else(|| self.inner.uri().to_string());
        info.name = Some(format!("{base} (inspection)"));
        Ok(info)
    }

    async fn tile(&self, coord: TileCoord) -> Result<TileData, ServeError> {
        self.inner.tile(coord).await
    }
}

/// Guess an output format from the identifier's path extension.
fn format_from_identifier(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "png".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_rejects_unsupported_scheme() {
        let backend = HttpBackend::new();
        let err = backend
            .resolve("mbtiles://./world.mbtiles")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceLoadError::UnsupportedScheme(_)));
    }

    #[tokio::test]
    async fn test_resolve_requires_xyz_placeholders() {
        let backend = HttpBackend::new();
        let err = backend
            .resolve("https://tiles.test/static.png")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceLoadError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_resolve_builds_templated_source() {
        let backend = HttpBackend::new();
        let source = backend
            .resolve("https://tiles.test/{z}/{x}/{y}.pbf")
            .await
            .unwrap();
        assert_eq!(source.uri(), "https://tiles.test/{z}/{x}/{y}.pbf");
        let info = source.info().await.unwrap();
        assert_eq!(info.format, "pbf");
        assert_eq!(info.name.as_deref(), Some("tiles.test"));
    }

    #[tokio::test]
    async fn test_xray_wraps_inner_source() {
        let backend = HttpBackend::new();
        let source = backend
            .resolve("xray+https://tiles.test/{z}/{x}/{y}.pbf")
            .await
            .unwrap();
        assert_eq!(source.uri(), "xray+https://tiles.test/{z}/{x}/{y}.pbf");
        let info = source.info().await.unwrap();
        assert!(info.is_vector());
        assert_eq!(info.name.as_deref(), Some("tiles.test (inspection)"));
    }

    #[test]
    fn test_tile_url_substitution() {
        let source = HttpSource {
            uri: "https://t.test/{z}/{x}/{y}.png".to_string(),
            host: None,
            client: Client::new(),
        };
        assert_eq!(
            source.tile_url(TileCoord { z: 3, x: 2, y: 1 }),
            "https://t.test/3/2/1.png"
        );
    }

    #[test]
    fn test_format_from_identifier() {
        assert_eq!(format_from_identifier("https://t.test/{z}/{x}/{y}.png"), "png");
        assert_eq!(
            format_from_identifier("https://t.test/{z}/{x}/{y}.pbf?key=abc"),
            "pbf"
        );
        assert_eq!(format_from_identifier("https://t.test/{z}/{x}/{y}"), "png");
    }
}
