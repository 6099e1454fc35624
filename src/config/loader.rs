//! Configuration loading from disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{GatewayConfig, SourceConfig, SourceDescriptor};
use crate::config::validation::{validate_sources, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid source configuration: {}", list_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn list_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Load gateway settings from a TOML file; defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(GatewayConfig::default());
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load, merge, normalize and validate source configuration.
///
/// `path` is either one JSON file or a directory whose `*.json` files are
/// merged in filename order, later fragments overriding earlier ones on
/// prefix collision.
pub fn load_sources(path: &Path) -> Result<BTreeMap<String, SourceConfig>, ConfigError> {
    let mut descriptors: BTreeMap<String, SourceDescriptor> = BTreeMap::new();

    if path.is_dir() {
        let entries = fs::read_dir(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut fragments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let fragment = entry.path();
            if fragment.extension().is_some_and(|ext| ext == "json") {
                fragments.push(fragment);
            }
        }
        fragments.sort();
        for fragment in fragments {
            descriptors.extend(read_fragment(&fragment)?);
        }
    } else {
        descriptors.extend(read_fragment(path)?);
    }

    let sources: BTreeMap<String, SourceConfig> = descriptors
        .into_iter()
        .map(|(prefix, descriptor)| {
            let config = SourceConfig::from_descriptor(prefix.clone(), descriptor);
            (prefix, config)
        })
        .collect();

    validate_sources(&sources).map_err(ConfigError::Validation)?;
    Ok(sources)
}

fn read_fragment(path: &Path) -> Result<BTreeMap<String, SourceDescriptor>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}
