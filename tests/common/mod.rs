//! Shared fixtures for gateway integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use tilegate::source::{
    ProbeError, ServeError, SourceHandle, SourceInfo, SourceLoadError, SourceResolver, TileCoord,
    TileData, TileSource,
};
use tilegate::SourceConfig;

/// Scriptable resolver: hands out stub sources with a fixed format and
/// records every identifier it was asked to resolve.
pub struct MockResolver {
    format: String,
    resolved: Mutex<Vec<String>>,
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl MockResolver {
    pub fn new(format: &str) -> Arc<Self> {
        Arc::new(Self {
            format: format.to_string(),
            resolved: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        })
    }

    /// Identifiers resolved so far, in order.
    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    /// Make subsequent resolutions fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent resolutions take this long.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceResolver for MockResolver {
    async fn resolve(&self, uri: &str) -> Result<SourceHandle, SourceLoadError> {
        self.resolved.lock().unwrap().push(uri.to_string());
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceLoadError::Unreachable {
                uri: uri.to_string(),
                reason: "mock backend down".to_string(),
            });
        }
        Ok(Arc::new(StubSource {
            uri: uri.to_string(),
            format: self.format.clone(),
        }))
    }
}

/// Always-succeeding source whose tile bodies echo identifier and coord.
#[derive(Debug)]
pub struct StubSource {
    uri: String,
    format: String,
}

#[async_trait]
impl TileSource for StubSource {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn info(&self) -> Result<SourceInfo, ProbeError> {
        Ok(SourceInfo {
            name: Some("stub".to_string()),
            format: self.format.clone(),
            minzoom: Some(0),
            maxzoom: Some(14),
        })
    }

    async fn tile(&self, coord: TileCoord) -> Result<TileData, ServeError> {
        Ok(TileData {
            content_type: "application/x-stub".to_string(),
            body: Bytes::from(format!("{}|{}", self.uri, coord)),
        })
    }
}

/// Build a normalized source config the way the loader would.
pub fn source_config(prefix: &str, template: &str, defaults: &[(&str, Value)]) -> SourceConfig {
    SourceConfig {
        prefix: prefix.to_string(),
        template: template.to_string(),
        default_params: defaults
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        timing: true,
        cors: true,
    }
}

pub fn source_map(configs: Vec<SourceConfig>) -> BTreeMap<String, SourceConfig> {
    configs
        .into_iter()
        .map(|config| (config.prefix.clone(), config))
        .collect()
}
