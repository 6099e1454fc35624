//! Inspection overlay mounting.
//!
//! At configuration load the gateway probes each prefix's
//! default-parameter rendering in the background. Sources reporting a
//! vector format get an overlay entry published into the prefix's slot,
//! which makes `<prefix>/_` servable. Render, resolution or probe failures
//! only suppress the overlay for that prefix; the primary route is
//! servable immediately and stays unaffected.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::gateway::server::PrefixState;
use crate::observability::metrics;
use crate::source::{SourceHandle, SourceInfo, XRAY_PREFIX};

/// Overlay route state bound to the inspection variant of a source.
pub struct OverlayEntry {
    pub source: SourceHandle,
    pub source_uri: String,
    pub info: SourceInfo,
}

/// Per-prefix slot the prober publishes into; empty means no overlay.
pub type OverlaySlot = Arc<ArcSwapOption<OverlayEntry>>;

/// Probe one prefix's default rendering and mount its overlay when the
/// source reports a vector format.
pub async fn mount(state: PrefixState) {
    let prefix = state.config.prefix.as_str();

    let rendered = match state.template.render(&state.config.default_params) {
        Ok(rendered) => rendered,
        Err(error) => {
            tracing::warn!(prefix, %error, "overlay render failed, skipping");
            return;
        }
    };
    let source = match state.resolver.resolve(&rendered).await {
        Ok(source) => source,
        Err(error) => {
            tracing::warn!(prefix, uri = %rendered, %error, "overlay resolution failed, skipping");
            return;
        }
    };
    let info = match source.info().await {
        Ok(info) => info,
        Err(error) => {
            tracing::warn!(prefix, uri = %rendered, %error, "source probe failed, skipping overlay");
            return;
        }
    };
    if !info.is_vector() {
        tracing::debug!(prefix, format = %info.format, "source is not vector, no overlay");
        return;
    }

    let source_uri = format!("{XRAY_PREFIX}{rendered}");
    let source = match state.resolver.resolve(&source_uri).await {
        Ok(source) => source,
        Err(error) => {
            tracing::warn!(prefix, uri = %source_uri, %error, "overlay resolution failed, skipping");
            return;
        }
    };

    state.overlay.store(Some(Arc::new(OverlayEntry {
        source,
        source_uri,
        info,
    })));
    metrics::record_overlay_mounted();
    tracing::info!(prefix, "mounted inspection overlay");
}
