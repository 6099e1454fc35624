//! Source configuration validation.
//!
//! # Responsibilities
//! - Check prefix shape (serde handles syntax)
//! - Compile every source template so malformed templates fail at load,
//!   never on first request
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the normalized mapping

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::schema::SourceConfig;
use crate::template::{CompiledTemplate, TemplateError};

/// One reason a source configuration was rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("prefix {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("prefix {0:?} must not end with '/'")]
    TrailingSlash(String),

    #[error("prefix {prefix:?}: source template is empty")]
    EmptyTemplate { prefix: String },

    #[error("prefix {prefix:?}: {source}")]
    Template {
        prefix: String,
        #[source]
        source: TemplateError,
    },
}

/// Validate every configured source, collecting all errors.
pub fn validate_sources(
    sources: &BTreeMap<String, SourceConfig>,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (prefix, config) in sources {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::MissingLeadingSlash(prefix.clone()));
        } else if prefix.ends_with('/') {
            errors.push(ValidationError::TrailingSlash(prefix.clone()));
        }

        if config.template.trim().is_empty() {
            errors.push(ValidationError::EmptyTemplate {
                prefix: prefix.clone(),
            });
            continue;
        }
        if let Err(source) = CompiledTemplate::compile(&config.template) {
            errors.push(ValidationError::Template {
                prefix: prefix.clone(),
                source,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
