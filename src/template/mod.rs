//! Source identifier templating.
//!
//! # Responsibilities
//! - Compile a prefix's source template once, at configuration load
//! - Render the template against an effective parameter mapping
//! - Escape parameter values destined for embedded query-language literals
//!
//! # Design Decisions
//! - Rendering is pure: same template + same parameters = same output
//! - Missing parameters render as the empty string rather than erroring,
//!   matching the gateway's fail-open parameter merge policy
//! - Escaping is a registered helper (`sqlEscape`), not ad-hoc string
//!   concatenation, because rendered identifiers are interpreted by the
//!   downstream source backend

use std::collections::BTreeMap;

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
};
use serde_json::Value;
use thiserror::Error;

const TEMPLATE_NAME: &str = "source";

/// Errors raised while compiling or rendering a source template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template text does not parse.
    #[error("template syntax error: {0}")]
    Syntax(#[from] handlebars::TemplateError),

    /// Rendering failed inside a helper.
    #[error("template render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// A source template compiled for one configured prefix.
///
/// Each compiled template carries its own registry with the escaping
/// helpers pre-registered, so rendering needs no shared state.
pub struct CompiledTemplate {
    registry: Handlebars<'static>,
}

impl CompiledTemplate {
    /// Compile a template string, failing on malformed placeholder syntax.
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_helper("sqlEscape", Box::new(SqlEscapeHelper));
        registry.register_template_string(TEMPLATE_NAME, template)?;
        Ok(Self { registry })
    }

    /// Render the template against a parameter mapping.
    ///
    /// Parameters the template references but the mapping lacks render as
    /// the empty string.
    pub fn render(&self, params: &BTreeMap<String, Value>) -> Result<String, TemplateError> {
        Ok(self.registry.render(TEMPLATE_NAME, params)?)
    }
}

/// `{{sqlEscape value}}`: renders the value as a quoted query-language
/// string literal with reserved characters backslash-escaped.
struct SqlEscapeHelper;

impl HelperDef for SqlEscapeHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let raw = match h.param(0).map(|p| p.value()) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        out.write(&quote_literal(&raw))?;
        Ok(())
    }
}

fn quote_literal(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('\'');
    for ch in raw.chars() {
        match ch {
            '\0' => quoted.push_str("\\0"),
            '\x08' => quoted.push_str("\\b"),
            '\t' => quoted.push_str("\\t"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\x1a' => quoted.push_str("\\Z"),
            '\'' => quoted.push_str("\\'"),
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('\'');
    quoted
}
